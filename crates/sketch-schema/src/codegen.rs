use crate::catalog::{CatalogEntry, ResolvedType, TypeCatalog};
use crate::error::{Result, SchemaError};
use proc_macro2::TokenStream;
use quote::quote;

mod enums;
mod names;
mod output;
mod structs;
mod types;
mod unions;
mod utils;

pub use output::format_tokens;

/// Renders a [`TypeCatalog`] into Rust source
pub struct CodeGenerator<'c> {
    catalog: &'c TypeCatalog,
    /// Path of the crate providing the `Binding` trait in emitted code
    runtime_crate: syn::Path,
}

impl<'c> CodeGenerator<'c> {
    /// Create a new code generator
    pub fn new(catalog: &'c TypeCatalog) -> Self {
        Self {
            catalog,
            runtime_crate: syn::parse_quote!(::sketch_schema),
        }
    }

    /// Refer to the runtime crate by a different path, e.g. `crate` when the
    /// output is compiled inside `sketch-schema` itself
    pub fn with_runtime_crate(mut self, path: &str) -> Result<Self> {
        self.runtime_crate = syn::parse_str(path).map_err(|e| SchemaError::Emit {
            type_name: "<config>".to_string(),
            message: format!("invalid runtime crate path `{}`", path),
            source: Some(e),
        })?;
        Ok(self)
    }

    /// Generate every catalog entry, in catalog order
    pub fn generate(&self) -> Result<TokenStream> {
        let _span = tracing::debug_span!("generate_bindings", types = self.catalog.len()).entered();
        let mut items = Vec::with_capacity(self.catalog.len());
        for entry in self.catalog {
            items.push(self.generate_entry(entry)?);
        }
        Ok(quote! { #(#items)* })
    }

    /// Generate a single catalog entry
    pub fn generate_entry(&self, entry: &CatalogEntry) -> Result<TokenStream> {
        let ident = utils::make_ident(&entry.name);
        let doc = utils::generate_doc_comment(entry.description.as_deref());

        match &entry.ty {
            ResolvedType::Record(record) => self.generate_record(entry, record),
            ResolvedType::Enum(enum_type) => self.generate_enum(entry, enum_type),
            ResolvedType::Union(union) => self.generate_union(entry, union),
            ResolvedType::Array { element } => {
                let item_type = self.rust_type(element);
                Ok(quote! {
                    #doc
                    pub type #ident = Vec<#item_type>;
                })
            }
            ResolvedType::Alias { target } => {
                let rust_type = self.rust_type(target);
                Ok(quote! {
                    #doc
                    pub type #ident = #rust_type;
                })
            }
        }
    }

    /// `impl DecodeJson` around `body`, plus a `Deserialize` impl going through it
    ///
    /// `body` sees `value: &serde_json::Value` and `path: &mut FieldPath`.
    fn generate_decode_impl(&self, type_name: &str, body: TokenStream) -> TokenStream {
        let ident = utils::make_ident(type_name);
        let runtime = &self.runtime_crate;
        quote! {
            impl #runtime::binding::DecodeJson for #ident {
                fn decode_at(
                    value: &serde_json::Value,
                    path: &mut #runtime::binding::FieldPath,
                ) -> Result<Self, #runtime::binding::DecodeError> {
                    #body
                }
            }

            impl<'de> serde::Deserialize<'de> for #ident {
                fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
                where
                    D: serde::Deserializer<'de>,
                {
                    #runtime::binding::deserialize_json(deserializer)
                }
            }
        }
    }

    /// `impl Binding` for a nominal type
    fn generate_binding_impl(&self, type_name: &str) -> TokenStream {
        let ident = utils::make_ident(type_name);
        let runtime = &self.runtime_crate;
        quote! {
            impl #runtime::binding::Binding for #ident {
                const TYPE_NAME: &'static str = #type_name;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::SchemaBundle;
    use crate::compiler::compile;
    use crate::graph::SchemaGraph;

    fn catalog(docs: &[(&str, &str)]) -> TypeCatalog {
        let bundle: SchemaBundle = docs.iter().copied().collect();
        compile(&SchemaGraph::load(&bundle).expect("load")).expect("compile")
    }

    fn fixture_catalog() -> TypeCatalog {
        let bundle = SchemaBundle::load_from_dir("tests/fixtures/bundle").expect("load bundle");
        compile(&SchemaGraph::load(&bundle).expect("load")).expect("compile")
    }

    #[test]
    fn test_generate_record() {
        let catalog = fixture_catalog();
        let codegen = CodeGenerator::new(&catalog);
        let formatted = codegen.emit().expect("emit");

        assert!(formatted.contains("pub struct Rect"));
        assert!(formatted.contains("#[serde(rename = \"_class\")]"));
        assert!(formatted.contains("pub class: smol_str::SmolStr"));
        assert!(formatted.contains("pub constrain_proportions: Option<bool>"));
        assert!(formatted.contains("#[serde(flatten)]"));
        assert!(formatted.contains(
            "pub extra_data: std::collections::BTreeMap<smol_str::SmolStr, serde_json::Value>"
        ));
        assert!(formatted.contains("impl ::sketch_schema::binding::Binding for Rect"));
        assert!(formatted.contains("impl ::sketch_schema::binding::DecodeJson for Rect"));
        assert!(formatted.contains("pub width: serde_json::Number"));
        assert!(!formatted.contains("f64"));
    }

    #[test]
    fn test_record_decoders_check_literals_and_keep_extra_data() {
        let catalog = fixture_catalog();
        let formatted = CodeGenerator::new(&catalog).emit().expect("emit");

        assert!(formatted.contains("binding::RecordReader::new(value, path)?"));
        assert!(formatted.contains("reader.required_literal(\"_class\""));
        assert!(formatted.contains("&serde_json::Value::from(\"rect\")"));
        assert!(formatted.contains("reader.optional(\"constrainProportions\")?"));
        assert!(formatted.contains("extra_data: reader.finish()"));
        assert!(formatted.contains("binding::deserialize_json(deserializer)"));
    }

    #[test]
    fn test_generate_union() {
        let catalog = fixture_catalog();
        let formatted = CodeGenerator::new(&catalog).emit().expect("emit");

        assert!(formatted.contains("pub enum AnyLayer"));
        assert!(formatted.contains("Group(Box<Group>)"));
        assert!(formatted.contains("Bitmap(Box<Bitmap>)"));
        assert!(formatted.contains("Text(Box<Text>)"));
        assert!(formatted.contains("impl<'de> serde::Deserialize<'de> for AnyLayer"));
        assert!(formatted.contains("\"_class\""));
        assert!(formatted.contains("binding::union_tag(value, \"_class\", path)?"));
        assert!(formatted.contains("::sketch_schema::binding::DecodeError::UnknownTag"));
    }

    #[test]
    fn test_generate_enums() {
        let catalog = fixture_catalog();
        let formatted = CodeGenerator::new(&catalog).emit().expect("emit");

        // String enum named from descriptions
        assert!(formatted.contains("pub enum BundleId"));
        assert!(formatted.contains("#[serde(rename = \"com.bohemiancoding.sketch3\")]"));
        // Integer enum with hand-written serde
        assert!(formatted.contains("pub enum BooleanOperation"));
        assert!(formatted.contains("pub fn as_i64(&self) -> i64"));
        assert!(formatted.contains("Subtract"));
        assert!(formatted.contains("::sketch_schema::binding::DecodeError::UnknownEnumValue"));
        assert!(formatted.contains("impl ::sketch_schema::binding::DecodeJson for BundleId"));
    }

    #[test]
    fn test_recursive_fields_are_boxed() {
        let catalog = catalog(&[(
            "tree.json",
            r##"{"title":"Node","type":"object","properties":{
                "parent":{"$ref":"#"},
                "children":{"type":"array","items":{"$ref":"#"}}
            }}"##,
        )]);
        let formatted = CodeGenerator::new(&catalog).emit().expect("emit");

        assert!(formatted.contains("pub parent: Option<Box<Node>>"));
        assert!(formatted.contains("pub children: Option<Vec<Node>>"));
    }

    #[test]
    fn test_custom_runtime_crate() {
        let catalog = fixture_catalog();
        let codegen = CodeGenerator::new(&catalog)
            .with_runtime_crate("crate")
            .expect("valid path");
        let formatted = codegen.emit().expect("emit");
        assert!(formatted.contains("impl crate::binding::Binding for Rect"));
        assert!(CodeGenerator::new(&catalog).with_runtime_crate("not a path").is_err());
    }

    #[test]
    fn test_emitted_text_is_stable() {
        let first = CodeGenerator::new(&fixture_catalog()).emit().expect("emit");
        let second = CodeGenerator::new(&fixture_catalog()).emit().expect("emit");
        assert_eq!(first, second);
        assert!(first.starts_with("// @generated by sketch-codegen. DO NOT EDIT."));
    }
}
