//! Result maps: how rows become mapped objects.

use crate::property::RecordType;
use crate::types::{ScalarType, TypeRef};

/// The shape a statement's rows are mapped into.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultType {
    /// No concrete result type was declared.
    Void,
    /// The first column, converted to a scalar.
    Scalar(ScalarType),
    /// A map of every column.
    Map,
    /// A registered record type.
    Record(RecordType),
}

/// One explicit property mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultMapping {
    /// Copy a column into a property.
    Column { property: String, column: String },
    /// Fill a property by running another statement with a column value as
    /// its parameter.
    NestedSelect {
        property: String,
        column: String,
        select: String,
        target: TypeRef,
    },
}

impl ResultMapping {
    pub fn property(&self) -> &str {
        match self {
            ResultMapping::Column { property, .. } | ResultMapping::NestedSelect { property, .. } => {
                property
            }
        }
    }

    pub fn column(&self) -> &str {
        match self {
            ResultMapping::Column { column, .. } | ResultMapping::NestedSelect { column, .. } => {
                column
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultMap {
    id: String,
    result_type: ResultType,
    mappings: Vec<ResultMapping>,
    auto_mapping: bool,
}

impl ResultMap {
    pub fn new(id: impl Into<String>, result_type: ResultType) -> Self {
        Self {
            id: id.into(),
            result_type,
            mappings: Vec::new(),
            auto_mapping: true,
        }
    }

    pub fn scalar(id: impl Into<String>, scalar: ScalarType) -> Self {
        Self::new(id, ResultType::Scalar(scalar))
    }

    pub fn map(id: impl Into<String>) -> Self {
        Self::new(id, ResultType::Map)
    }

    pub fn record(id: impl Into<String>, record: RecordType) -> Self {
        Self::new(id, ResultType::Record(record))
    }

    /// Map a column onto a property explicitly.
    pub fn column(mut self, property: impl Into<String>, column: impl Into<String>) -> Self {
        self.mappings.push(ResultMapping::Column {
            property: property.into(),
            column: column.into(),
        });
        self
    }

    /// Fill a property from a nested select keyed by a column value.
    pub fn nested_select(
        mut self,
        property: impl Into<String>,
        column: impl Into<String>,
        select: impl Into<String>,
        target: TypeRef,
    ) -> Self {
        self.mappings.push(ResultMapping::NestedSelect {
            property: property.into(),
            column: column.into(),
            select: select.into(),
            target,
        });
        self
    }

    /// Enable or disable automatic column-to-property mapping.
    pub fn auto_mapping(mut self, enabled: bool) -> Self {
        self.auto_mapping = enabled;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn result_type(&self) -> &ResultType {
        &self.result_type
    }

    pub fn mappings(&self) -> &[ResultMapping] {
        &self.mappings
    }

    pub fn is_auto_mapping(&self) -> bool {
        self.auto_mapping
    }

    pub fn is_void(&self) -> bool {
        matches!(self.result_type, ResultType::Void)
    }

    pub fn has_nested_selects(&self) -> bool {
        self.mappings
            .iter()
            .any(|m| matches!(m, ResultMapping::NestedSelect { .. }))
    }

    /// Is this column copied by an explicit column mapping? Columns that
    /// only feed nested selects stay eligible for auto-mapping.
    pub fn is_mapped_column(&self, column: &str) -> bool {
        self.mappings.iter().any(|m| {
            matches!(m, ResultMapping::Column { column: c, .. } if c.eq_ignore_ascii_case(column))
        })
    }
}
