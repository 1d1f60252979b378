//! Derive macro for table-mapped entity types.
//!
//! This crate provides the `#[derive(Entity)]` macro, which implements
//! `tablemap_core::Entity` and generates a typed column accessor per field.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Expr, Fields, GenericArgument, Ident, Lit,
    Meta, PathArguments, Type,
};

/// Derives the `Entity` trait for a struct.
///
/// # Attributes
///
/// - `#[entity(table = "table_name")]` - Specifies the SQL table name
///   (optional, defaults to snake_case of struct name)
/// - `#[entity(schema = "schema_name")]` - Pins the table to a schema,
///   overriding the registry's default schema
///
/// # Field Attributes
///
/// - `#[column(identity)]` - Marks the identity (generated key) column.
///   `primary_key` is accepted as an alias.
/// - `#[column(name = "column_name")]` - Specifies the SQL column name
///   (optional, defaults to field name)
/// - `#[column(nullable)]` - Marks the column as nullable; implied for
///   `Option<T>` fields
/// - `#[column(skip)]` - Leaves the field unmapped, e.g. a child collection
///   filled by nested hydration. The field must implement `Default`.
///
/// # Generated Items
///
/// For a struct `Blog`, this macro generates:
///
/// - `impl tablemap_core::Entity for Blog`, with one `Property` per mapped
///   field in declaration order
/// - `Blog::title() -> Col<Blog>` and friends, one per mapped field
#[proc_macro_derive(Entity, attributes(entity, column))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_entity_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn derive_entity_impl(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let entity_attrs = parse_entity_attrs(&input.attrs)?;
    let table_name = entity_attrs
        .table
        .unwrap_or_else(|| to_snake_case(&struct_name.to_string()));

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity derive does not support generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Entity derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Entity derive only supports structs",
            ));
        }
    };

    let mut columns: Vec<ColumnInfo> = Vec::new();
    for field in fields {
        let Some(field_name) = field.ident.clone() else {
            continue;
        };
        let attrs = parse_column_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        if attrs.identity && columns.iter().any(|c| c.identity) {
            return Err(syn::Error::new_spanned(
                field,
                "Entity derive supports a single identity column",
            ));
        }
        columns.push(ColumnInfo {
            column_name: attrs.name.unwrap_or_else(|| field_name.to_string()),
            nullable: attrs.nullable || option_inner(&field.ty).is_some(),
            identity: attrs.identity,
            field_type: field.ty.clone(),
            field_name,
        });
    }

    let properties: Vec<TokenStream2> = columns.iter().map(property_tokens).collect();

    let accessors: Vec<TokenStream2> = columns
        .iter()
        .map(|info| {
            let method_name = &info.field_name;
            let column_name = &info.column_name;
            quote! {
                /// Returns the column handle for predicates and ordering.
                #[inline]
                #[must_use]
                pub fn #method_name() -> ::tablemap_core::Col<Self> {
                    ::tablemap_core::Col::new(#column_name)
                }
            }
        })
        .collect();

    let schema = match &entity_attrs.schema {
        Some(schema) => quote! { ::core::option::Option::Some(#schema) },
        None => quote! { ::core::option::Option::None },
    };
    let name = struct_name.to_string();

    let expanded = quote! {
        impl ::tablemap_core::Entity for #struct_name {
            const NAME: &'static str = #name;
            const TABLE: &'static str = #table_name;
            const SCHEMA: ::core::option::Option<&'static str> = #schema;

            fn properties() -> ::std::vec::Vec<::tablemap_core::Property<Self>> {
                ::std::vec![
                    #(#properties),*
                ]
            }
        }

        impl #struct_name {
            #(#accessors)*
        }
    };

    Ok(expanded)
}

fn property_tokens(info: &ColumnInfo) -> TokenStream2 {
    let field_name = &info.field_name;
    let field_type = &info.field_type;
    let column_name = &info.column_name;
    let rust_type = quote!(#field_type).to_string().replace(' ', "");
    let nullable = info.nullable;
    let identity = info.identity;

    quote! {
        ::tablemap_core::Property {
            name: #column_name,
            rust_type: #rust_type,
            nullable: #nullable,
            identity: #identity,
            get: |entity: &Self| -> ::tablemap_core::SqlValue {
                ::tablemap_core::ToSqlValue::to_sql_value(
                    ::core::clone::Clone::clone(&entity.#field_name),
                )
            },
            set: |entity: &mut Self,
                  value: ::tablemap_core::SqlValue|
                  -> ::core::result::Result<(), ::tablemap_core::ValueError> {
                entity.#field_name =
                    <#field_type as ::tablemap_core::FromSqlValue>::from_sql_value(value)?;
                ::core::result::Result::Ok(())
            },
        }
    }
}

struct ColumnInfo {
    field_name: Ident,
    field_type: Type,
    column_name: String,
    identity: bool,
    nullable: bool,
}

#[derive(Default)]
struct EntityAttrs {
    table: Option<String>,
    schema: Option<String>,
}

#[derive(Default)]
struct ColumnAttrs {
    name: Option<String>,
    identity: bool,
    nullable: bool,
    skip: bool,
}

fn string_value(meta: &syn::meta::ParseNestedMeta<'_>) -> syn::Result<String> {
    let value: Expr = meta.value()?.parse()?;
    if let Expr::Lit(lit) = &value {
        if let Lit::Str(s) = &lit.lit {
            return Ok(s.value());
        }
    }
    Err(syn::Error::new_spanned(value, "expected a string literal"))
}

fn parse_entity_attrs(attrs: &[Attribute]) -> syn::Result<EntityAttrs> {
    let mut result = EntityAttrs::default();
    for attr in attrs {
        if attr.path().is_ident("entity") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    result.table = Some(string_value(&meta)?);
                } else if meta.path.is_ident("schema") {
                    result.schema = Some(string_value(&meta)?);
                } else {
                    return Err(meta.error("unknown entity attribute"));
                }
                Ok(())
            })?;
        }
    }
    Ok(result)
}

fn parse_column_attrs(attrs: &[Attribute]) -> syn::Result<ColumnAttrs> {
    let mut result = ColumnAttrs::default();

    for attr in attrs {
        if attr.path().is_ident("column") {
            // Handle empty attribute like #[column]
            if matches!(attr.meta, Meta::Path(_)) {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("identity") || meta.path.is_ident("primary_key") {
                    result.identity = true;
                } else if meta.path.is_ident("nullable") {
                    result.nullable = true;
                } else if meta.path.is_ident("skip") {
                    result.skip = true;
                } else if meta.path.is_ident("name") {
                    result.name = Some(string_value(&meta)?);
                } else {
                    return Err(meta.error("unknown column attribute"));
                }
                Ok(())
            })?;
        }
    }

    Ok(result)
}

/// Returns `T` for a field typed `Option<T>`.
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}
