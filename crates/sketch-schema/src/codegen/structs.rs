use crate::catalog::{CatalogEntry, RecordType, TypeRef};
use crate::error::Result;
use proc_macro2::TokenStream;
use quote::quote;

use super::CodeGenerator;
use super::enums::literal_tokens;
use super::names::field_names;
use super::utils::{generate_doc_comment, make_ident};

impl<'c> CodeGenerator<'c> {
    /// Generate a struct for a record type
    pub(super) fn generate_record(
        &self,
        entry: &CatalogEntry,
        record: &RecordType,
    ) -> Result<TokenStream> {
        let ident = make_ident(&entry.name);
        let doc = generate_doc_comment(entry.description.as_deref());

        let names = field_names(&record.fields);
        let mut fields = Vec::with_capacity(record.fields.len());
        let mut reads = Vec::with_capacity(record.fields.len());
        for (field, rust_name) in record.fields.iter().zip(&names) {
            let field_ident = make_ident(rust_name);
            let json_name = field.name.as_str();
            let field_doc = generate_doc_comment(field.description.as_deref());
            let field_type = self.field_type(&entry.name, &field.ty);

            let read = match (&field.ty, field.optional) {
                (TypeRef::Literal(literal), false) => {
                    let expected = literal_tokens(literal);
                    quote! { reader.required_literal(#json_name, &#expected)? }
                }
                (TypeRef::Literal(literal), true) => {
                    let expected = literal_tokens(literal);
                    quote! { reader.optional_literal(#json_name, &#expected)? }
                }
                (_, false) => quote! { reader.required(#json_name)? },
                (_, true) => quote! { reader.optional(#json_name)? },
            };
            reads.push(quote! { #field_ident: #read });

            fields.push(if field.optional {
                quote! {
                    #field_doc
                    #[serde(rename = #json_name, skip_serializing_if = "Option::is_none")]
                    pub #field_ident: Option<#field_type>,
                }
            } else {
                quote! {
                    #field_doc
                    #[serde(rename = #json_name)]
                    pub #field_ident: #field_type,
                }
            });
        }

        let runtime = &self.runtime_crate;
        let mutability = (!reads.is_empty()).then(|| quote! { mut });
        let decode_impl = self.generate_decode_impl(
            &entry.name,
            quote! {
                let #mutability reader = #runtime::binding::RecordReader::new(value, path)?;
                Ok(Self {
                    #(#reads,)*
                    extra_data: reader.finish(),
                })
            },
        );
        let binding_impl = self.generate_binding_impl(&entry.name);

        Ok(quote! {
            #doc
            #[derive(serde::Serialize, Debug, Clone, PartialEq)]
            pub struct #ident {
                #(#fields)*
                /// Fields not described by the schema, preserved verbatim
                #[serde(flatten)]
                pub extra_data: std::collections::BTreeMap<smol_str::SmolStr, serde_json::Value>,
            }

            #decode_impl
            #binding_impl
        })
    }
}
