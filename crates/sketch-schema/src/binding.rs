//! Catalog-driven JSON bindings
//!
//! [`Bindings`] decodes JSON into [`Data`] and encodes it back using nothing
//! but a [`TypeCatalog`], so a catalog shipped as an artifact is enough to
//! read and write documents. Emitted Rust types implement [`Binding`]
//! instead, decoding through [`DecodeJson`] and encoding through serde.
//!
//! Decoding is strict about structure (missing required fields, type
//! mismatches, unknown enum values and union tags are errors) and permissive
//! about unknown object fields, which land in the record's `extra_data` and
//! are written back out unchanged.

mod data;
mod decode;
mod encode;
mod typed;

pub use data::{Data, Record, Union};
pub use typed::{DecodeJson, RecordReader, deserialize_json, union_tag};

use crate::catalog::{Literal, ResolvedType, TypeCatalog, TypeRef};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use smol_str::SmolStr;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Property used to route documents to their type
pub const CLASS_FIELD: &str = "_class";

/// Error produced when JSON does not fit the expected type
///
/// Every variant carries the field path the problem was found at, e.g.
/// `$.layers[2].frame`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
pub enum DecodeError {
    #[error("missing required field at {path}")]
    MissingField { path: String },

    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: &'static str,
    },

    #[error("unknown value {value} at {path} for enum {type_name}")]
    #[diagnostic(help("The document may come from a newer format version"))]
    UnknownEnumValue {
        path: String,
        type_name: SmolStr,
        value: String,
    },

    #[error("unknown `{discriminant}` value {tag} at {path} for union {type_name}")]
    UnknownTag {
        path: String,
        type_name: SmolStr,
        discriminant: SmolStr,
        tag: String,
    },

    #[error("no variant of {type_name} matches the value at {path}")]
    NoMatchingVariant { path: String, type_name: SmolStr },

    #[error("unknown type {type_name} requested at {path}")]
    UnknownType { path: String, type_name: SmolStr },

    #[error("{message} at {path}")]
    Custom { path: String, message: String },
}

impl DecodeError {
    /// Field path the error was found at
    pub fn path(&self) -> &str {
        match self {
            Self::MissingField { path }
            | Self::TypeMismatch { path, .. }
            | Self::UnknownEnumValue { path, .. }
            | Self::UnknownTag { path, .. }
            | Self::NoMatchingVariant { path, .. }
            | Self::UnknownType { path, .. }
            | Self::Custom { path, .. } => path,
        }
    }

    /// Wrap an arbitrary error reported for the whole value
    pub fn custom(message: impl fmt::Display) -> Self {
        Self::Custom {
            path: "$".to_string(),
            message: message.to_string(),
        }
    }
}

/// Error produced when a [`Data`] value does not fit the type it is encoded as
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
#[error("cannot encode value at {path}: {expected}")]
pub struct EncodeError {
    pub path: String,
    /// The violated expectation
    pub expected: String,
}

impl EncodeError {
    pub(crate) fn new(path: &FieldPath, expected: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            expected: expected.into(),
        }
    }

    /// Wrap an arbitrary error reported for the whole value
    pub fn custom(message: impl fmt::Display) -> Self {
        Self {
            path: "$".to_string(),
            expected: message.to_string(),
        }
    }
}

/// Implemented by every emitted binding type
///
/// Decoding goes through [`DecodeJson`] so errors keep their field path;
/// encoding goes through serde.
pub trait Binding: Serialize + DeserializeOwned + DecodeJson {
    /// Catalog name of the type
    const TYPE_NAME: &'static str;

    fn decode(value: &Value) -> Result<Self, DecodeError> {
        Self::decode_at(value, &mut FieldPath::default())
    }

    fn encode(&self) -> Result<Value, EncodeError> {
        serde_json::to_value(self).map_err(EncodeError::custom)
    }
}

/// Runtime bindings for every type in a catalog
#[derive(Debug, Clone)]
pub struct Bindings {
    catalog: Arc<TypeCatalog>,
    class_field: SmolStr,
    classes: BTreeMap<SmolStr, SmolStr>,
}

impl Bindings {
    /// Bindings routing on the `_class` property
    pub fn new(catalog: TypeCatalog) -> Self {
        Self::with_class_field(catalog, CLASS_FIELD)
    }

    /// Bindings routing on a custom tag property
    pub fn with_class_field(catalog: TypeCatalog, class_field: impl Into<SmolStr>) -> Self {
        let class_field = class_field.into();
        let mut classes = BTreeMap::new();
        for entry in catalog.iter() {
            let ResolvedType::Record(record) = &entry.ty else {
                continue;
            };
            let Some(TypeRef::Literal(Literal::String(class))) =
                record.field(&class_field).map(|f| &f.ty)
            else {
                continue;
            };
            match classes.get(class) {
                Some(existing) => tracing::warn!(
                    class = %class,
                    kept = %existing,
                    ignored = %entry.name,
                    "two record types declare the same class"
                ),
                None => {
                    classes.insert(class.clone(), entry.name.clone());
                }
            }
        }
        tracing::debug!(types = catalog.len(), classes = classes.len(), "built bindings");

        Self {
            catalog: Arc::new(catalog),
            class_field,
            classes,
        }
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    /// Name of the routing property
    pub fn class_field(&self) -> &str {
        &self.class_field
    }

    /// Record type declaring the given class tag
    pub fn type_for_class(&self, class: &str) -> Option<&str> {
        self.classes.get(class).map(|s| s.as_str())
    }

    /// The class tag declared by a record type
    pub fn class_of(&self, type_name: &str) -> Option<&str> {
        self.classes
            .iter()
            .find(|(_, ty)| ty.as_str() == type_name)
            .map(|(class, _)| class.as_str())
    }

    /// Decode a JSON value as the named catalog type
    pub fn decode(&self, type_name: &str, value: &Value) -> Result<Data, DecodeError> {
        let mut path = FieldPath::default();
        decode::Decoder::new(&self.catalog).named(type_name, value, &mut path)
    }

    /// Decode a document by its class tag, using `fallback` for untagged values
    ///
    /// Returns the chosen type name along with the value.
    pub fn decode_tagged(
        &self,
        value: &Value,
        fallback: Option<&str>,
    ) -> Result<(SmolStr, Data), DecodeError> {
        let class = value.get(self.class_field.as_str()).and_then(Value::as_str);
        let type_name = match (class, fallback) {
            (Some(class), _) => self.type_for_class(class).ok_or_else(|| DecodeError::UnknownTag {
                path: "$".to_string(),
                type_name: SmolStr::new_static("document"),
                discriminant: self.class_field.clone(),
                tag: format!("{:?}", class),
            })?,
            (None, Some(fallback)) => fallback,
            (None, None) => {
                return Err(DecodeError::MissingField {
                    path: format!("$.{}", self.class_field),
                });
            }
        };
        let data = self.decode(type_name, value)?;
        Ok((SmolStr::new(type_name), data))
    }

    /// Encode a value as the named catalog type
    pub fn encode(&self, type_name: &str, data: &Data) -> Result<Value, EncodeError> {
        let mut path = FieldPath::default();
        encode::Encoder::new(&self.catalog).named(type_name, data, &mut path)
    }
}

/// Location inside a JSON value, rendered as `$.field[index]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<Segment>);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Field(SmolStr),
    Index(usize),
}

impl FieldPath {
    pub fn push_field(&mut self, name: &str) {
        self.0.push(Segment::Field(SmolStr::new(name)));
    }

    pub fn push_index(&mut self, index: usize) {
        self.0.push(Segment::Index(index));
    }

    pub fn pop(&mut self) {
        self.0.pop();
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.0 {
            match segment {
                Segment::Field(name) => write!(f, ".{}", name)?,
                Segment::Index(i) => write!(f, "[{}]", i)?,
            }
        }
        Ok(())
    }
}
