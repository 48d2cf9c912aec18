use crate::catalog::{Primitive, TypeRef};
use proc_macro2::TokenStream;
use quote::quote;

use super::CodeGenerator;
use super::utils::make_ident;

impl<'c> CodeGenerator<'c> {
    /// Convert a type expression to a Rust type
    pub(super) fn rust_type(&self, ty: &TypeRef) -> TokenStream {
        match ty {
            TypeRef::Named(name) => {
                let ident = make_ident(name);
                quote! { #ident }
            }
            TypeRef::Primitive(p) => primitive_type(*p),
            // The value itself is checked by the enclosing union or by the document author
            TypeRef::Literal(literal) => primitive_type(literal.primitive()),
            TypeRef::Array(inner) => {
                let inner = self.rust_type(inner);
                quote! { Vec<#inner> }
            }
            TypeRef::Map(inner) => {
                let inner = self.rust_type(inner);
                quote! { std::collections::BTreeMap<smol_str::SmolStr, #inner> }
            }
        }
    }

    /// Field type inside `owner`, boxed when it leads straight back to `owner`
    ///
    /// Only direct named references need a box; `Vec` and `BTreeMap` already
    /// put their contents on the heap.
    pub(super) fn field_type(&self, owner: &str, ty: &TypeRef) -> TokenStream {
        let rust_type = self.rust_type(ty);
        match ty {
            TypeRef::Named(name) if name == owner || self.catalog.reaches(name, owner) => {
                quote! { Box<#rust_type> }
            }
            _ => rust_type,
        }
    }
}

fn primitive_type(p: Primitive) -> TokenStream {
    match p {
        Primitive::String => quote! { smol_str::SmolStr },
        Primitive::Integer => quote! { i64 },
        Primitive::Number => quote! { serde_json::Number },
        Primitive::Boolean => quote! { bool },
        Primitive::Null => quote! { () },
        Primitive::Any => quote! { serde_json::Value },
    }
}
