//! KDL configuration for `sketch-codegen`
//!
//! ```kdl
//! codegen {
//!     schemas "schemas"
//!     output "src/generated.rs"
//!     catalog "target/catalog.json"
//!     runtime-crate "sketch_schema"
//! }
//! ```
//!
//! Relative paths are resolved against the directory containing the config
//! file.

use crate::error::{Result, SchemaError};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenConfig {
    /// Directory holding the schema bundle
    pub schemas: PathBuf,
    /// Rust file the bindings are written to
    pub output: PathBuf,
    /// Optional JSON dump of the compiled catalog
    pub catalog: Option<PathBuf>,
    /// Path of the runtime crate used in emitted `impl Binding` blocks
    pub runtime_crate: Option<String>,
}

impl CodegenConfig {
    /// Read and parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_kdl(&text, path)?;

        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.schemas = base.join(&config.schemas);
            config.output = base.join(&config.output);
            config.catalog = config.catalog.map(|c| base.join(c));
        }
        Ok(config)
    }

    /// Parse config text; `path` is only used in error messages
    pub fn from_kdl(text: &str, path: &Path) -> Result<Self> {
        let error = |message: String| SchemaError::Config {
            path: path.to_path_buf(),
            message,
        };

        let doc = text
            .parse::<kdl::KdlDocument>()
            .map_err(|e| error(format!("failed to parse KDL: {}", e)))?;

        let mut block = None;
        for node in doc.nodes() {
            match node.name().value() {
                "codegen" => {
                    if block.is_some() {
                        return Err(error("multiple codegen blocks found".into()));
                    }
                    block = Some(node);
                }
                other => return Err(error(format!("unknown config node: {}", other))),
            }
        }

        let children = block
            .ok_or_else(|| error("missing codegen block".into()))?
            .children()
            .ok_or_else(|| error("codegen block has no children".into()))?;

        let mut schemas = None;
        let mut output = None;
        let mut catalog = None;
        let mut runtime_crate = None;

        for child in children.nodes() {
            let name = child.name().value();
            let value = child
                .entries()
                .first()
                .and_then(|e| e.value().as_string())
                .ok_or_else(|| error(format!("{} expects a string value", name)))?;
            match name {
                "schemas" => schemas = Some(PathBuf::from(value)),
                "output" => output = Some(PathBuf::from(value)),
                "catalog" => catalog = Some(PathBuf::from(value)),
                "runtime-crate" => runtime_crate = Some(value.to_string()),
                other => return Err(error(format!("unknown codegen field: {}", other))),
            }
        }

        Ok(Self {
            schemas: schemas.ok_or_else(|| error("missing schemas directory".into()))?,
            output: output.ok_or_else(|| error("missing output file".into()))?,
            catalog,
            runtime_crate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let text = r#"
            codegen {
                schemas "schemas"
                output "src/generated.rs"
                runtime-crate "crate"
            }
        "#;
        let config = CodegenConfig::from_kdl(text, Path::new("sketch.kdl")).expect("parse");
        assert_eq!(config.schemas, PathBuf::from("schemas"));
        assert_eq!(config.output, PathBuf::from("src/generated.rs"));
        assert_eq!(config.catalog, None);
        assert_eq!(config.runtime_crate.as_deref(), Some("crate"));
    }

    #[test]
    fn test_missing_output_is_reported() {
        let text = r#"codegen { schemas "schemas"; }"#;
        let err = CodegenConfig::from_kdl(text, Path::new("sketch.kdl")).unwrap_err();
        assert!(matches!(err, SchemaError::Config { ref message, .. } if message.contains("output")));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let text = r#"codegen { schemas "a"; output "b"; colour "red"; }"#;
        assert!(CodegenConfig::from_kdl(text, Path::new("sketch.kdl")).is_err());
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sketch.kdl");
        std::fs::write(
            &path,
            "codegen {\n    schemas \"schemas\"\n    output \"out/bindings.rs\"\n}\n",
        )
        .expect("write");
        let config = CodegenConfig::load(&path).expect("load");
        assert_eq!(config.schemas, dir.path().join("schemas"));
        assert_eq!(config.output, dir.path().join("out/bindings.rs"));
    }
}
