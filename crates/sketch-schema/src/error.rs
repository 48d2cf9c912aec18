use miette::{Diagnostic, SourceSpan};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, compiling or emitting a schema bundle
#[derive(Debug, Error, Diagnostic)]
pub enum SchemaError {
    /// IO error when reading schema files
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Failed to parse a schema document
    #[error("Failed to parse schema document {document}: {message}")]
    #[diagnostic(
        code(schema::parse_error),
        help("Check that the document is valid JSON and that every schema position holds an object")
    )]
    Parse {
        /// Name of the bundle document that failed to parse
        document: String,
        /// What went wrong
        message: String,
        /// Source text that failed to parse
        #[source_code]
        src: Option<String>,
        /// Location of the error in the source
        #[label("parse error here")]
        span: Option<SourceSpan>,
    },

    /// A `$ref` or catalog name that points at nothing
    #[error("Unresolved reference {reference} in {node}")]
    #[diagnostic(
        code(schema::unresolved_ref),
        help("Add the referenced document to the bundle or fix the JSON pointer")
    )]
    UnresolvedReference {
        /// The reference string that couldn't be resolved
        reference: String,
        /// Qualified identifier of the node holding the reference
        node: String,
    },

    /// Two `allOf` branches disagree about a field
    #[error("Conflicting definitions of field `{field}` while merging {node}")]
    #[diagnostic(
        code(schema::composition_conflict),
        help("Fields merged through allOf must have the same type in every branch")
    )]
    CompositionConflict {
        /// The field defined incompatibly
        field: String,
        /// Qualified identifier of the composed node
        node: String,
        /// Rendered type from the first branch
        left: String,
        /// Rendered type from the conflicting branch
        right: String,
    },

    /// A union with no discriminant whose variants cannot be told apart
    #[error("Ambiguous union {node}: variant {variant} can never be selected")]
    #[diagnostic(
        code(schema::ambiguous_union),
        help("Give every branch a distinct literal property, or distinct required fields")
    )]
    AmbiguousUnion {
        /// Qualified identifier of the union node
        node: String,
        /// Index of the shadowed branch
        variant: usize,
    },

    /// Circular reference that never passes through a named record or union
    #[error("Circular reference detected at {node}")]
    #[diagnostic(
        code(schema::circular_ref),
        help("Cycles are only allowed through named object or union types")
    )]
    CircularReference {
        /// Qualified identifier or type name where the cycle was found
        node: String,
        /// The cycle path
        cycle: Vec<String>,
    },

    /// Unsupported schema feature
    #[error("Unsupported feature: {feature}")]
    #[diagnostic(
        code(schema::unsupported),
        help("This schema feature is not yet supported by the compiler")
    )]
    Unsupported {
        /// Description of the unsupported feature
        feature: String,
        /// Qualified identifier of the node using it
        node: String,
    },

    /// The catalog could not be rendered into bindings
    #[error("Failed to emit bindings for {type_name}: {message}")]
    #[diagnostic(code(schema::emit_error))]
    Emit {
        /// Catalog entry being emitted
        type_name: String,
        message: String,
        /// Optional source error
        #[source]
        source: Option<syn::Error>,
    },

    /// Invalid codegen configuration
    #[error("Invalid configuration in {}: {message}", path.display())]
    #[diagnostic(code(schema::config))]
    Config {
        path: PathBuf,
        message: String,
    },
}

impl SchemaError {
    /// Create a parse error with source text
    pub fn parse_error_with_source(
        source: serde_json::Error,
        document: impl Into<String>,
        src: String,
    ) -> Self {
        // serde_json reports 1-based line/column; walk the text to find the byte offset
        let span = source.line().checked_sub(1).map(|line| {
            let line_start: usize = src
                .split_inclusive('\n')
                .take(line)
                .map(str::len)
                .sum();
            let offset = (line_start + source.column().saturating_sub(1)).min(src.len());
            SourceSpan::from((offset, 1))
        });

        Self::Parse {
            document: document.into(),
            message: source.to_string(),
            src: Some(src),
            span,
        }
    }

    /// Create a parse error without source context
    pub fn parse(document: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            document: document.into(),
            message: message.into(),
            src: None,
            span: None,
        }
    }

    /// Create an unresolved reference error
    pub fn unresolved(reference: impl Into<String>, node: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            reference: reference.into(),
            node: node.into(),
        }
    }

    /// Create an unsupported feature error
    pub fn unsupported(feature: impl Into<String>, node: impl Into<String>) -> Self {
        Self::Unsupported {
            feature: feature.into(),
            node: node.into(),
        }
    }

    /// Create an emit error
    pub fn emit(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Emit {
            type_name: type_name.into(),
            message: message.into(),
            source: None,
        }
    }
}

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;
