//! Turning backend rows into mapped results.

use crate::strategy::StatementContext;
use sqlmapper_core::{
    Configuration, Error, ExecutorErrorKind, MappedStatement, ObjectFactory, ResultContext,
    ResultHandler, ResultMap, ResultMapping, ResultObject, ResultType, Result, Row, RowBounds,
    TypeRef, Value, set_property,
};
use std::sync::Arc;

/// Maps one row at a time according to a statement's result map.
///
/// Nested selects are not resolved here; see [`ResultSetHandler`].
#[derive(Clone)]
pub struct RowMapper {
    result_map: Option<Arc<ResultMap>>,
    factory: Arc<dyn ObjectFactory>,
    camel_case: bool,
}

impl RowMapper {
    pub fn new(configuration: &Configuration, ms: &MappedStatement) -> Self {
        Self {
            result_map: ms.result_map().cloned(),
            factory: configuration.object_factory(),
            camel_case: configuration.settings().map_underscore_to_camel_case,
        }
    }

    pub fn result_map(&self) -> Option<&ResultMap> {
        self.result_map.as_deref()
    }

    pub fn map_row(&self, row: &Row) -> Result<Value> {
        let Some(result_map) = self.result_map.as_deref() else {
            return Ok(row_to_map(row));
        };
        match result_map.result_type() {
            ResultType::Void | ResultType::Map => {
                let mut value = row_to_map(row);
                apply_column_mappings(result_map, row, &mut value)?;
                Ok(value)
            }
            ResultType::Scalar(scalar) => {
                let first = row.get(0).cloned().unwrap_or(Value::Null);
                scalar.coerce(first)
            }
            ResultType::Record(record) => {
                let mut value = self.factory.create(&TypeRef::record(record.name.clone()));
                if result_map.is_auto_mapping() {
                    for (column, column_value) in row.iter() {
                        if result_map.is_mapped_column(column) {
                            continue;
                        }
                        let property = if record.properties.is_empty() {
                            Some(self.property_name(column))
                        } else {
                            self.find_declared(&record.properties, column)
                        };
                        match property {
                            Some(property) => {
                                set_property(&mut value, &property, column_value.clone())?;
                            }
                            None => {
                                tracing::trace!(column, record = %record.name, "No property for column");
                            }
                        }
                    }
                }
                apply_column_mappings(result_map, row, &mut value)?;
                Ok(value)
            }
        }
    }

    fn find_declared(&self, properties: &[String], column: &str) -> Option<String> {
        let wanted = if self.camel_case {
            column.replace('_', "")
        } else {
            column.to_string()
        };
        properties
            .iter()
            .find(|p| p.eq_ignore_ascii_case(&wanted))
            .cloned()
    }

    fn property_name(&self, column: &str) -> String {
        if self.camel_case {
            underscore_to_camel_case(column)
        } else {
            column.to_string()
        }
    }
}

fn row_to_map(row: &Row) -> Value {
    Value::Map(
        row.iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect(),
    )
}

fn apply_column_mappings(result_map: &ResultMap, row: &Row, target: &mut Value) -> Result<()> {
    for mapping in result_map.mappings() {
        if let ResultMapping::Column { property, column } = mapping {
            let value = row.get_by_name(column).cloned().unwrap_or(Value::Null);
            set_property(target, property, value)?;
        }
    }
    Ok(())
}

/// `user_name` -> `userName`.
pub fn underscore_to_camel_case(column: &str) -> String {
    let mut out = String::with_capacity(column.len());
    let mut upper = false;
    for ch in column.chars() {
        if ch == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.extend(ch.to_lowercase());
        }
    }
    out
}

/// Adapt a nested query's rows to the target property's declared type.
///
/// Collection targets receive every row. Other targets take the single row,
/// NULL when there is none, and fail when there are several.
pub fn extract_object_from_list(
    rows: Vec<Value>,
    target: &TypeRef,
    factory: &dyn ObjectFactory,
) -> Result<Value> {
    if factory.is_collection(target) {
        return Ok(match factory.create(target) {
            Value::Array(mut items) => {
                items.extend(rows);
                Value::Array(items)
            }
            _ => Value::Array(rows),
        });
    }
    let mut rows = rows.into_iter();
    match (rows.next(), rows.next()) {
        (None, _) => Ok(Value::Null),
        (Some(row), None) => Ok(row),
        (Some(_), Some(_)) => Err(Error::executor(
            ExecutorErrorKind::TooManyResults,
            "Statement returned more than one row, where no more than one was expected.",
        )),
    }
}

/// Applies bounds, nested selects and an optional result handler to a
/// query's rows.
pub struct ResultSetHandler<'a, 'c> {
    ctx: &'a StatementContext<'c>,
    mapper: RowMapper,
    bounds: RowBounds,
}

impl<'a, 'c> ResultSetHandler<'a, 'c> {
    pub fn new(ctx: &'a StatementContext<'c>, ms: &MappedStatement, bounds: RowBounds) -> Self {
        Self {
            ctx,
            mapper: RowMapper::new(ctx.configuration, ms),
            bounds,
        }
    }

    /// Map rows into results. With a handler, rows are delivered to it and
    /// the returned list is empty.
    pub fn handle_rows(
        &self,
        rows: Vec<Row>,
        mut handler: Option<&mut dyn ResultHandler>,
    ) -> Result<Vec<ResultObject>> {
        let mut results = Vec::new();
        let mut delivered = 0;
        for row in rows
            .into_iter()
            .skip(self.bounds.offset)
            .take(self.bounds.limit)
        {
            let object = ResultObject::new(self.mapper.map_row(&row)?);
            self.apply_nested_selects(&row, &object)?;
            match handler.as_deref_mut() {
                Some(handler) => {
                    delivered += 1;
                    let mut context = ResultContext::new(object.snapshot(), delivered);
                    handler.handle_result(&mut context);
                    if context.is_stopped() {
                        tracing::debug!(delivered, "Result handler stopped delivery");
                        break;
                    }
                }
                None => results.push(object),
            }
        }
        tracing::trace!(rows = results.len(), "Mapped result set");
        Ok(results)
    }

    fn apply_nested_selects(&self, row: &Row, owner: &ResultObject) -> Result<()> {
        let Some(result_map) = self.mapper.result_map() else {
            return Ok(());
        };
        for mapping in result_map.mappings() {
            let ResultMapping::NestedSelect {
                property,
                column,
                select,
                target,
            } = mapping
            else {
                continue;
            };
            let parameter = match row.get_by_name(column) {
                Some(value) if !value.is_null() => value.clone(),
                _ => continue,
            };
            let executor = self.ctx.executor;
            let nested = self.ctx.configuration.mapped_statement(select)?;
            let bound_sql = nested.bound_sql(&parameter);
            let key =
                executor.create_cache_key(&nested, &parameter, RowBounds::DEFAULT, &bound_sql)?;
            if executor.is_cached(&nested, &key) {
                tracing::debug!(statement = %select, property, "Deferring nested select");
                executor.defer_load(&nested, owner, property, &key, target)?;
            } else {
                let mut parameter = parameter;
                let rows = executor.query_with_key(
                    &nested,
                    &mut parameter,
                    RowBounds::DEFAULT,
                    None,
                    &key,
                    &bound_sql,
                )?;
                let rows = rows.iter().map(ResultObject::snapshot).collect();
                let factory = self.ctx.configuration.object_factory();
                let value = extract_object_from_list(rows, target, factory.as_ref())?;
                owner.set_property(property, value)?;
            }
        }
        Ok(())
    }
}
