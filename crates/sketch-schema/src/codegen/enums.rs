use crate::catalog::{CatalogEntry, EnumType, Literal};
use crate::error::{Result, SchemaError};
use proc_macro2::TokenStream;
use quote::quote;

use super::CodeGenerator;
use super::names::enum_variant_names;
use super::utils::{generate_doc_comment, make_ident};

impl<'c> CodeGenerator<'c> {
    /// Generate an enum for a fixed literal set
    pub(super) fn generate_enum(
        &self,
        entry: &CatalogEntry,
        enum_type: &EnumType,
    ) -> Result<TokenStream> {
        if enum_type.values.is_empty() {
            return Err(SchemaError::emit(entry.name.as_str(), "enum has no values"));
        }

        let all_strings = enum_type
            .values
            .iter()
            .all(|v| matches!(v, Literal::String(_)));
        let body = if all_strings {
            self.generate_string_enum(entry, enum_type)
        } else {
            self.generate_literal_enum(entry, enum_type)
        };
        let binding_impl = self.generate_binding_impl(&entry.name);

        Ok(quote! {
            #body
            #binding_impl
        })
    }

    fn generate_string_enum(&self, entry: &CatalogEntry, enum_type: &EnumType) -> TokenStream {
        let ident = make_ident(&entry.name);
        let doc = generate_doc_comment(entry.description.as_deref());

        let mut variants = Vec::new();
        let mut as_str_arms = Vec::new();
        let mut decode_arms = Vec::new();
        for (value, name) in enum_type.values.iter().zip(enum_variant_names(enum_type)) {
            let variant_ident = make_ident(&name);
            let value_str = value.as_str().unwrap_or_default();
            variants.push(quote! {
                #[serde(rename = #value_str)]
                #variant_ident
            });
            as_str_arms.push(quote! {
                Self::#variant_ident => #value_str
            });
            decode_arms.push(quote! {
                #value_str => Ok(Self::#variant_ident)
            });
        }

        let runtime = &self.runtime_crate;
        let unknown = unknown_value(runtime, &entry.name);
        let decode_impl = self.generate_decode_impl(
            &entry.name,
            quote! {
                let s = <smol_str::SmolStr as #runtime::binding::DecodeJson>::decode_at(value, path)?;
                match s.as_str() {
                    #(#decode_arms,)*
                    _ => #unknown,
                }
            },
        );

        quote! {
            #doc
            #[derive(serde::Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub enum #ident {
                #(#variants,)*
            }

            impl #ident {
                pub fn as_str(&self) -> &'static str {
                    match self {
                        #(#as_str_arms,)*
                    }
                }
            }

            #decode_impl
        }
    }

    /// Integer, boolean and mixed enums compare whole JSON values
    fn generate_literal_enum(&self, entry: &CatalogEntry, enum_type: &EnumType) -> TokenStream {
        let ident = make_ident(&entry.name);
        let doc = generate_doc_comment(entry.description.as_deref());

        let mut variants = Vec::new();
        let mut to_value_arms = Vec::new();
        let mut from_value_checks = Vec::new();
        for (value, name) in enum_type.values.iter().zip(enum_variant_names(enum_type)) {
            let variant_ident = make_ident(&name);
            let json = literal_tokens(value);
            variants.push(quote! { #variant_ident });
            to_value_arms.push(quote! {
                Self::#variant_ident => #json
            });
            from_value_checks.push(quote! {
                if *value == #json {
                    return Ok(Self::#variant_ident);
                }
            });
        }

        let integer_helpers = enum_type
            .values
            .iter()
            .map(|v| match v {
                Literal::Integer(i) => Some(*i),
                _ => None,
            })
            .collect::<Option<Vec<i64>>>()
            .map(|ints| {
                let arms = enum_type
                    .values
                    .iter()
                    .zip(enum_variant_names(enum_type))
                    .zip(ints)
                    .map(|((_, name), i)| {
                        let variant_ident = make_ident(&name);
                        quote! { Self::#variant_ident => #i }
                    });
                quote! {
                    impl #ident {
                        pub fn as_i64(&self) -> i64 {
                            match self {
                                #(#arms,)*
                            }
                        }
                    }
                }
            });

        let unknown = unknown_value(&self.runtime_crate, &entry.name);
        let decode_impl = self.generate_decode_impl(
            &entry.name,
            quote! {
                #(#from_value_checks)*
                #unknown
            },
        );

        quote! {
            #doc
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub enum #ident {
                #(#variants,)*
            }

            impl #ident {
                pub fn to_value(&self) -> serde_json::Value {
                    match self {
                        #(#to_value_arms,)*
                    }
                }
            }

            #integer_helpers

            impl serde::Serialize for #ident {
                fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
                where
                    S: serde::Serializer,
                {
                    serde::Serialize::serialize(&self.to_value(), serializer)
                }
            }

            #decode_impl
        }
    }
}

/// `Err(UnknownEnumValue)` for the current `value` and `path`
fn unknown_value(runtime: &syn::Path, type_name: &str) -> TokenStream {
    quote! {
        Err(#runtime::binding::DecodeError::UnknownEnumValue {
            path: path.to_string(),
            type_name: smol_str::SmolStr::new_static(#type_name),
            value: value.to_string(),
        })
    }
}

/// A literal as a `serde_json::Value` expression
pub(super) fn literal_tokens(literal: &Literal) -> TokenStream {
    match literal {
        Literal::String(s) => {
            let s = s.as_str();
            quote! { serde_json::Value::from(#s) }
        }
        Literal::Integer(i) => quote! { serde_json::Value::from(#i) },
        Literal::Boolean(b) => quote! { serde_json::Value::Bool(#b) },
        Literal::Null(()) => quote! { serde_json::Value::Null },
    }
}
