//! Procedural macros for SQLMapper Rust.
//!
//! `#[derive(Mapped)]` lets a plain struct travel through the mapper as a
//! property map: it generates `Mapped`, `ToValue` and `FromValue`
//! implementations so result maps can target the struct by name and mapper
//! results can be read back into it.

use proc_macro::TokenStream;
use quote::quote;

mod parse;

use parse::{RecordDef, parse_record};

/// Derive macro for the `Mapped` trait.
///
/// # Attributes
///
/// - `#[mapped(type_name = "name")]` - Record name used in result maps
///   (defaults to the struct name)
/// - `#[mapped(name = "prop")]` - Override the property name of a field
/// - `#[mapped(skip)]` - Leave the field out; it is filled with
///   `Default::default()` when reading
///
/// Properties missing from the source map read as NULL, so `Option` fields
/// tolerate absent columns and other fields report a type error.
///
/// # Example
///
/// ```ignore
/// use sqlmapper::Mapped;
///
/// #[derive(Mapped)]
/// #[mapped(type_name = "User")]
/// struct User {
///     id: i64,
///     #[mapped(name = "userName")]
///     user_name: String,
///     email: Option<String>,
/// }
/// ```
#[proc_macro_derive(Mapped, attributes(mapped))]
pub fn derive_mapped(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);

    let record = match parse_record(&input) {
        Ok(r) => r,
        Err(e) => return e.to_compile_error().into(),
    };

    generate_mapped_impl(&record).into()
}

fn generate_mapped_impl(record: &RecordDef) -> proc_macro2::TokenStream {
    let name = &record.name;
    let type_name = &record.type_name;
    let (impl_generics, ty_generics, where_clause) = record.generics.split_for_impl();

    let property_names: Vec<&str> = record
        .mapped_fields()
        .map(|f| f.property.as_str())
        .collect();

    let to_entries = record.mapped_fields().map(|f| {
        let field = &f.name;
        let property = &f.property;
        quote! {
            fields.insert(
                #property.to_string(),
                sqlmapper_core::ToValue::to_value(&self.#field),
            );
        }
    });

    let from_fields = record.fields.iter().map(|f| {
        let field = &f.name;
        if f.skip {
            quote! { #field: Default::default() }
        } else {
            let property = &f.property;
            quote! { #field: sqlmapper_core::read_property(fields, #property)? }
        }
    });

    quote! {
        impl #impl_generics sqlmapper_core::Mapped for #name #ty_generics #where_clause {
            const TYPE_NAME: &'static str = #type_name;

            fn property_names() -> &'static [&'static str] {
                &[#(#property_names),*]
            }
        }

        impl #impl_generics sqlmapper_core::ToValue for #name #ty_generics #where_clause {
            #[allow(unused_mut)]
            fn to_value(&self) -> sqlmapper_core::Value {
                let mut fields = ::std::collections::BTreeMap::new();
                #(#to_entries)*
                sqlmapper_core::Value::Map(fields)
            }
        }

        impl #impl_generics sqlmapper_core::FromValue for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn from_value(value: &sqlmapper_core::Value) -> sqlmapper_core::Result<Self> {
                let fields = sqlmapper_core::record_fields(value, #type_name)?;
                Ok(Self {
                    #(#from_fields),*
                })
            }
        }
    }
}
