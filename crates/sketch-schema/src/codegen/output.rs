use crate::error::{Result, SchemaError};
use proc_macro2::TokenStream;
use std::path::Path;

use super::CodeGenerator;

const HEADER: &str = "// @generated by sketch-codegen. DO NOT EDIT.\n//\n// This file was automatically generated from the Sketch file format schemas.\n// Any manual changes will be overwritten on the next regeneration.\n\n";

impl<'c> CodeGenerator<'c> {
    /// Generate and format the whole catalog as one Rust source file
    pub fn emit(&self) -> Result<String> {
        let tokens = self.generate()?;
        format_tokens(tokens)
    }

    /// Write the formatted bindings to `path`, creating parent directories
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let formatted = self.emit()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, formatted)?;
        tracing::info!(path = %path.display(), "wrote bindings");
        Ok(())
    }
}

/// Pretty-print generated tokens with the `@generated` header
pub fn format_tokens(tokens: TokenStream) -> Result<String> {
    let file: syn::File = syn::parse2(tokens).map_err(|e| SchemaError::Emit {
        type_name: "<output>".to_string(),
        message: "generated tokens do not form a valid Rust file".to_string(),
        source: Some(e),
    })?;
    let formatted = prettyplease::unparse(&file);

    // Blank line after each top-level item
    let lines: Vec<&str> = formatted.lines().collect();
    let mut result_lines = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        result_lines.push(*line);
        if *line == "}" && i + 1 < lines.len() && !lines[i + 1].is_empty() {
            result_lines.push("");
        }
    }

    let mut output = String::with_capacity(HEADER.len() + formatted.len());
    output.push_str(HEADER);
    output.push_str(&result_lines.join("\n"));
    output.push('\n');
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::quote;

    #[test]
    fn test_format_tokens_separates_items() {
        let tokens = quote! {
            pub struct A { pub x: i64 }
            pub struct B { pub y: i64 }
        };
        let formatted = format_tokens(tokens).expect("format");
        assert!(formatted.starts_with("// @generated by sketch-codegen. DO NOT EDIT."));
        assert!(formatted.contains("}\n\npub struct B"));
    }

    #[test]
    fn test_invalid_tokens_are_an_emit_error() {
        let tokens = quote! { pub struct };
        assert!(matches!(format_tokens(tokens), Err(SchemaError::Emit { .. })));
    }

    #[test]
    fn test_write_to_creates_directories() {
        let catalog = crate::catalog::TypeCatalog::new();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/bindings.rs");
        CodeGenerator::new(&catalog).write_to(&path).expect("write");
        let text = std::fs::read_to_string(&path).expect("read");
        assert!(text.starts_with("// @generated"));
    }
}
