//! Parsing for the `Mapped` derive.

use proc_macro2::Span;
use syn::{Attribute, Data, DeriveInput, Error, Field, Fields, Generics, Ident, Lit, Result};

/// A struct deriving `Mapped`.
#[derive(Debug)]
pub struct RecordDef {
    pub name: Ident,
    /// Record name used in result maps. Defaults to the struct name.
    pub type_name: String,
    pub fields: Vec<FieldDef>,
    pub generics: Generics,
}

impl RecordDef {
    /// Fields that map to a property.
    pub fn mapped_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| !f.skip)
    }
}

#[derive(Debug)]
pub struct FieldDef {
    pub name: Ident,
    /// Property name. Defaults to the field name.
    pub property: String,
    /// Not mapped; filled with `Default::default()` when reading.
    pub skip: bool,
}

pub fn parse_record(input: &DeriveInput) -> Result<RecordDef> {
    let name = input.ident.clone();
    let type_name = parse_struct_attrs(&input.attrs)?.unwrap_or_else(|| name.to_string());

    let fields = match &input.data {
        Data::Struct(data) => parse_fields(&data.fields)?,
        Data::Enum(_) => {
            return Err(Error::new_spanned(
                input,
                "Mapped can only be derived for structs, not enums",
            ));
        }
        Data::Union(_) => {
            return Err(Error::new_spanned(
                input,
                "Mapped can only be derived for structs, not unions",
            ));
        }
    };

    let mut seen = std::collections::HashSet::new();
    for field in fields.iter().filter(|f| !f.skip) {
        if !seen.insert(field.property.as_str()) {
            return Err(Error::new_spanned(
                &field.name,
                format!("duplicate mapped property: {}", field.property),
            ));
        }
    }

    Ok(RecordDef {
        name,
        type_name,
        fields,
        generics: input.generics.clone(),
    })
}

/// Parse struct-level `#[mapped(type_name = "...")]`.
fn parse_struct_attrs(attrs: &[Attribute]) -> Result<Option<String>> {
    let mut type_name = None;
    for attr in attrs {
        if !attr.path().is_ident("mapped") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("type_name") {
                if type_name.is_some() {
                    return Err(Error::new_spanned(
                        meta.path,
                        "duplicate mapped attribute: type_name",
                    ));
                }
                type_name = Some(string_value(&meta)?);
                Ok(())
            } else {
                Err(meta.error("unknown mapped attribute; expected `type_name`"))
            }
        })?;
    }
    Ok(type_name)
}

fn parse_fields(fields: &Fields) -> Result<Vec<FieldDef>> {
    match fields {
        Fields::Named(named) => named.named.iter().map(parse_field).collect(),
        Fields::Unnamed(_) => Err(Error::new(
            Span::call_site(),
            "Mapped requires a struct with named fields, not a tuple struct",
        )),
        Fields::Unit => Err(Error::new(
            Span::call_site(),
            "Mapped requires a struct with fields, not a unit struct",
        )),
    }
}

fn parse_field(field: &Field) -> Result<FieldDef> {
    let name = field
        .ident
        .clone()
        .ok_or_else(|| Error::new_spanned(field, "expected named field"))?;

    let mut property = None;
    let mut skip = false;
    for attr in &field.attrs {
        if !attr.path().is_ident("mapped") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                if property.is_some() {
                    return Err(Error::new_spanned(meta.path, "duplicate mapped attribute: name"));
                }
                property = Some(string_value(&meta)?);
                Ok(())
            } else if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else {
                Err(meta.error("unknown mapped attribute; expected `name` or `skip`"))
            }
        })?;
    }

    if skip && property.is_some() {
        return Err(Error::new_spanned(
            &name,
            "a skipped field cannot also be renamed",
        ));
    }

    Ok(FieldDef {
        property: property.unwrap_or_else(|| name.to_string()),
        name,
        skip,
    })
}

fn string_value(meta: &syn::meta::ParseNestedMeta<'_>) -> Result<String> {
    let value: Lit = meta.value()?.parse()?;
    match value {
        Lit::Str(lit) if !lit.value().is_empty() => Ok(lit.value()),
        Lit::Str(lit) => Err(Error::new_spanned(lit, "name must not be empty")),
        other => Err(Error::new_spanned(other, "expected string literal")),
    }
}
