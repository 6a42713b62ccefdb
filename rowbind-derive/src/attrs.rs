//! `#[rowbind(...)]` attribute parsing

use syn::{
    spanned::Spanned, Attribute, Error, Field, GenericArgument, Ident, PathArguments, Result, Type,
};

/// How a field takes part in mapping.
pub enum FieldRole {
    /// Decoded from one column
    Leaf,
    /// A record with its own fields
    Record {
        flatten: bool,
        /// The record type behind any `Option`/`Box`
        inner: Type,
        optional: bool,
    },
}

pub struct FieldConfig {
    pub ident: Ident,
    pub rename: Option<String>,
    pub skip: bool,
    pub role: FieldRole,
}

#[derive(Default)]
pub struct StructConfig {
    pub direct: bool,
}

fn unknown(meta: &syn::meta::ParseNestedMeta<'_>) -> Error {
    meta.error(format!(
        "unknown rowbind attribute `{}`",
        meta.path
            .get_ident()
            .map(|i| i.to_string())
            .unwrap_or_default()
    ))
}

pub fn parse_struct_config(attrs: &[Attribute]) -> Result<StructConfig> {
    let mut config = StructConfig::default();
    for attr in attrs {
        if attr.path().is_ident("rowbind") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("direct") {
                    config.direct = true;
                    Ok(())
                } else {
                    Err(unknown(&meta))
                }
            })?;
        }
    }
    Ok(config)
}

pub fn parse_field_config(field: &Field) -> Result<FieldConfig> {
    let ident = field
        .ident
        .clone()
        .ok_or_else(|| Error::new(field.span(), "tuple structs are not supported"))?;

    let mut rename = None;
    let mut skip = false;
    let mut nested = false;
    let mut flatten = false;

    for attr in &field.attrs {
        if attr.path().is_ident("rowbind") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let value = meta.value()?;
                    let lit: syn::LitStr = value.parse()?;
                    rename = Some(lit.value());
                } else if meta.path.is_ident("skip") {
                    skip = true;
                } else if meta.path.is_ident("nested") {
                    nested = true;
                } else if meta.path.is_ident("flatten") {
                    flatten = true;
                } else {
                    return Err(unknown(&meta));
                }
                Ok(())
            })?;
        }
    }

    if nested && flatten {
        return Err(Error::new(
            field.span(),
            "`nested` and `flatten` cannot be combined",
        ));
    }

    let role = if nested || flatten {
        let (inner, optional) = record_inner_type(&field.ty);
        FieldRole::Record {
            flatten,
            inner,
            optional,
        }
    } else {
        FieldRole::Leaf
    };

    Ok(FieldConfig {
        ident,
        rename,
        skip,
        role,
    })
}

/// The single generic argument of `wrapper<T>`, if `ty` is that wrapper.
fn unwrap_generic<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first() {
        Some(GenericArgument::Type(inner)) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}

/// Strip `Option` and `Box` from a record field type: `T`, `Box<T>`,
/// `Option<T>` and `Option<Box<T>>` all yield `T`.
fn record_inner_type(ty: &Type) -> (Type, bool) {
    let (ty, optional) = match unwrap_generic(ty, "Option") {
        Some(inner) => (inner, true),
        None => (ty, false),
    };
    let ty = unwrap_generic(ty, "Box").unwrap_or(ty);
    (ty.clone(), optional)
}
