use crate::catalog::{CatalogEntry, Shape, UnionType};
use crate::error::{Result, SchemaError};
use proc_macro2::TokenStream;
use quote::quote;

use super::CodeGenerator;
use super::enums::literal_tokens;
use super::names::union_variant_name;
use super::utils::{dedupe_names, generate_doc_comment, make_ident};

impl<'c> CodeGenerator<'c> {
    /// Generate an enum over a union's variants
    ///
    /// Decoding picks the variant by tag or shape before the payload is decoded.
    pub(super) fn generate_union(
        &self,
        entry: &CatalogEntry,
        union: &UnionType,
    ) -> Result<TokenStream> {
        if union.variants.is_empty() {
            return Err(SchemaError::emit(entry.name.as_str(), "union has no variants"));
        }

        let ident = make_ident(&entry.name);
        let type_name = entry.name.as_str();
        let doc = generate_doc_comment(entry.description.as_deref());

        let names = dedupe_names(
            union
                .variants
                .iter()
                .map(|v| union_variant_name(&v.ty))
                .collect(),
        );
        let variant_idents: Vec<_> = names.iter().map(|n| make_ident(n)).collect();

        let mut variants = Vec::new();
        let mut serialize_arms = Vec::new();
        let runtime = &self.runtime_crate;
        let mut constructors = Vec::new();
        for (variant, variant_ident) in union.variants.iter().zip(&variant_idents) {
            let payload = self.rust_type(&variant.ty);
            let boxed = variant.ty.as_named().is_some();
            variants.push(if boxed {
                quote! { #variant_ident(Box<#payload>) }
            } else {
                quote! { #variant_ident(#payload) }
            });
            serialize_arms.push(quote! {
                Self::#variant_ident(inner) => serde::Serialize::serialize(inner, serializer)
            });
            constructors.push(if boxed {
                quote! {
                    <#payload as #runtime::binding::DecodeJson>::decode_at(value, path)
                        .map(|inner| Self::#variant_ident(Box::new(inner)))
                }
            } else {
                quote! {
                    <#payload as #runtime::binding::DecodeJson>::decode_at(value, path)
                        .map(Self::#variant_ident)
                }
            });
        }

        let dispatch = match &union.discriminant {
            Some(discriminant) => {
                let disc = discriminant.as_str();
                let checks = union
                    .variants
                    .iter()
                    .zip(&constructors)
                    .filter_map(|(variant, construct)| {
                        let tag = literal_tokens(variant.tag.as_ref()?);
                        Some(quote! {
                            if *tag == #tag {
                                return #construct;
                            }
                        })
                    });
                quote! {
                    let tag = #runtime::binding::union_tag(value, #disc, path)?;
                    #(#checks)*
                    Err(#runtime::binding::DecodeError::UnknownTag {
                        path: path.to_string(),
                        type_name: smol_str::SmolStr::new_static(#type_name),
                        discriminant: smol_str::SmolStr::new_static(#disc),
                        tag: tag.to_string(),
                    })
                }
            }
            None => {
                let mut checks = Vec::new();
                let mut exhaustive = false;
                for (variant, construct) in union.variants.iter().zip(&constructors) {
                    if variant.shape == Shape::Any {
                        checks.push(quote! { #construct });
                        exhaustive = true;
                        break;
                    }
                    let condition = shape_condition(&variant.shape);
                    checks.push(quote! {
                        if #condition {
                            return #construct;
                        }
                    });
                }
                let fallback = (!exhaustive).then(|| {
                    quote! {
                        Err(#runtime::binding::DecodeError::NoMatchingVariant {
                            path: path.to_string(),
                            type_name: smol_str::SmolStr::new_static(#type_name),
                        })
                    }
                });
                quote! {
                    #(#checks)*
                    #fallback
                }
            }
        };

        let decode_impl = self.generate_decode_impl(&entry.name, dispatch);
        let binding_impl = self.generate_binding_impl(&entry.name);

        Ok(quote! {
            #doc
            #[derive(Debug, Clone, PartialEq)]
            pub enum #ident {
                #(#variants,)*
            }

            impl serde::Serialize for #ident {
                fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
                where
                    S: serde::Serializer,
                {
                    match self {
                        #(#serialize_arms,)*
                    }
                }
            }

            #decode_impl
            #binding_impl
        })
    }
}

/// Boolean expression testing `value` against a variant shape
fn shape_condition(shape: &Shape) -> TokenStream {
    match shape {
        Shape::Object { required } if required.is_empty() => quote! { value.is_object() },
        Shape::Object { required } => {
            let keys = required.iter().map(|k| k.as_str());
            quote! {
                value
                    .as_object()
                    .is_some_and(|map| true #(&& map.contains_key(#keys))*)
            }
        }
        Shape::Array => quote! { value.is_array() },
        Shape::String => quote! { value.is_string() },
        Shape::Integer => quote! { value.is_i64() || value.is_u64() },
        Shape::Number => quote! { value.is_number() },
        Shape::Boolean => quote! { value.is_boolean() },
        Shape::Null => quote! { value.is_null() },
        Shape::Any => quote! { true },
    }
}

