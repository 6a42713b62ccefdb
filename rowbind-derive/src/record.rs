//! Record derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::{spanned::Spanned, Data, DeriveInput, Error, Fields, Result};

use crate::attrs::{parse_field_config, parse_struct_config, FieldConfig, FieldRole};

pub fn derive_record_impl(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let name_str = name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let struct_config = parse_struct_config(&input.attrs)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => return Err(Error::new(input.span(), "only named fields are supported")),
        },
        _ => return Err(Error::new(input.span(), "only structs are supported")),
    };

    let configs: Vec<FieldConfig> = fields
        .iter()
        .map(parse_field_config)
        .collect::<Result<Vec<_>>>()?;

    // Skipped fields get no descriptor; the rest are numbered in order.
    let mapped: Vec<&FieldConfig> = configs.iter().filter(|c| !c.skip).collect();

    let mut descriptors = Vec::with_capacity(mapped.len());
    let mut setters = Vec::with_capacity(mapped.len());
    let mut getters = Vec::with_capacity(mapped.len());

    for (index, config) in mapped.iter().enumerate() {
        let ident = &config.ident;
        let ident_str = ident.to_string();
        let rename = match &config.rename {
            Some(rename) => quote! { ::std::option::Option::Some(#rename) },
            None => quote! { ::std::option::Option::None },
        };

        match &config.role {
            FieldRole::Leaf => {
                descriptors.push(quote! {
                    rowbind::FieldDescriptor::value(#ident_str, #rename)
                });
                setters.push(quote! {
                    [#index] => {
                        self.#ident = rowbind::FromValue::from_value(value)?;
                        ::std::result::Result::Ok(())
                    }
                });
                getters.push(quote! {
                    [#index] => ::std::result::Result::Ok(rowbind::ToValue::to_value(&self.#ident))
                });
            }
            FieldRole::Record {
                flatten,
                inner,
                optional,
            } => {
                descriptors.push(quote! {
                    rowbind::FieldDescriptor::record(
                        #ident_str,
                        #rename,
                        <#inner as rowbind::Record>::record_ref(),
                        #flatten,
                    )
                });
                if *optional {
                    setters.push(quote! {
                        [#index, rest @ ..] => self
                            .#ident
                            .get_or_insert_with(::std::default::Default::default)
                            .set_field(rest, value)
                    });
                    getters.push(quote! {
                        [#index, rest @ ..] => match &self.#ident {
                            ::std::option::Option::Some(inner) => inner.field_value(rest),
                            ::std::option::Option::None => {
                                ::std::result::Result::Ok(rowbind::Value::Null)
                            }
                        }
                    });
                } else {
                    setters.push(quote! {
                        [#index, rest @ ..] => self.#ident.set_field(rest, value)
                    });
                    getters.push(quote! {
                        [#index, rest @ ..] => self.#ident.field_value(rest)
                    });
                }
            }
        }
    }

    let direct = struct_config.direct;
    let from_column = if direct {
        quote! { <Self as rowbind::FromValue>::from_value(value) }
    } else {
        quote! {
            ::std::result::Result::Err(rowbind::Error::TypeConversion {
                expected: ::std::any::type_name::<Self>(),
                actual: value.type_name().to_string(),
            })
        }
    };

    let expanded = quote! {
        impl #impl_generics rowbind::Record for #name #ty_generics #where_clause {
            fn record_type() -> rowbind::RecordType {
                rowbind::RecordType {
                    name: #name_str,
                    type_id: ::std::any::TypeId::of::<Self>(),
                    direct: #direct,
                    fields: ::std::vec![#(#descriptors),*],
                }
            }

            #[allow(unused_imports, unused_variables)]
            fn set_field(
                &mut self,
                path: &[usize],
                value: rowbind::Value,
            ) -> rowbind::Result<()> {
                use rowbind::Record as _;
                match path {
                    #(#setters,)*
                    _ => ::std::result::Result::Err(rowbind::invalid_path::<Self>(path)),
                }
            }

            #[allow(unused_imports)]
            fn field_value(&self, path: &[usize]) -> rowbind::Result<rowbind::Value> {
                use rowbind::Record as _;
                match path {
                    #(#getters,)*
                    _ => ::std::result::Result::Err(rowbind::invalid_path::<Self>(path)),
                }
            }
        }

        impl #impl_generics rowbind::FromRow for #name #ty_generics #where_clause {
            fn record() -> ::std::option::Option<rowbind::RecordRef> {
                ::std::option::Option::Some(<Self as rowbind::Record>::record_ref())
            }

            fn from_column(value: rowbind::Value) -> rowbind::Result<Self> {
                #from_column
            }

            fn from_fields(
                values: &mut [rowbind::Value],
                fields: &[rowbind::FieldPath],
            ) -> rowbind::Result<Self> {
                rowbind::decode_record::<Self>(values, fields)
            }
        }

        impl #impl_generics rowbind::NamedArgs for #name #ty_generics #where_clause {
            fn named_value(
                &self,
                name: &str,
                mapper: &rowbind::Mapper,
            ) -> rowbind::Result<::std::option::Option<rowbind::Value>> {
                rowbind::record_args(self, name, mapper)
            }
        }
    };

    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generates_all_three_impls() {
        let input: DeriveInput = syn::parse_quote! {
            struct User {
                id: i64,
                #[rowbind(rename = "user_name")]
                name: String,
                #[rowbind(nested)]
                address: Option<Box<Address>>,
                #[rowbind(skip)]
                cache: Vec<u8>,
            }
        };
        let out = derive_record_impl(input).unwrap().to_string();
        assert!(out.contains("rowbind :: Record for User"));
        assert!(out.contains("rowbind :: FromRow for User"));
        assert!(out.contains("rowbind :: NamedArgs for User"));
        assert!(out.contains("\"user_name\""));
        assert!(out.contains("Address as rowbind :: Record"));
        assert!(!out.contains("cache"));
    }

    #[test]
    fn test_rejects_enums_and_tuple_structs() {
        let input: DeriveInput = syn::parse_quote! { enum E { A } };
        assert!(derive_record_impl(input).is_err());
        let input: DeriveInput = syn::parse_quote! { struct T(i64); };
        assert!(derive_record_impl(input).is_err());
    }
}
