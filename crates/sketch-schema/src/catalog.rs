//! The compiled type catalog
//!
//! A [`TypeCatalog`] is the artifact passed from the compiler to the emitter
//! and to the runtime bindings. Entries refer to each other by name only, so
//! recursive and mutually recursive types need no special representation.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// JSON primitive types a field can have
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Primitive {
    String,
    Integer,
    Number,
    Boolean,
    Null,
    /// Unconstrained JSON
    Any,
}

/// A literal value usable as an enum member, const field or union tag
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Boolean(bool),
    Integer(i64),
    String(SmolStr),
    Null(()),
}

impl Literal {
    /// Convert a JSON value to a literal, if it is representable as one
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(Self::Null(())),
            serde_json::Value::Bool(b) => Some(Self::Boolean(*b)),
            serde_json::Value::Number(n) => n.as_i64().map(Self::Integer),
            serde_json::Value::String(s) => Some(Self::String(SmolStr::new(s))),
            _ => None,
        }
    }

    /// The literal as a JSON value
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null(()) => serde_json::Value::Null,
            Self::Boolean(b) => serde_json::Value::Bool(*b),
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::String(s) => serde_json::Value::String(s.to_string()),
        }
    }

    /// Whether a JSON value equals this literal
    pub fn matches(&self, value: &serde_json::Value) -> bool {
        Self::from_json(value).as_ref() == Some(self)
    }

    /// The string payload, for string literals
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Primitive type this literal belongs to
    pub fn primitive(&self) -> Primitive {
        match self {
            Self::Null(()) => Primitive::Null,
            Self::Boolean(_) => Primitive::Boolean,
            Self::Integer(_) => Primitive::Integer,
            Self::String(_) => Primitive::String,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null(()) => f.write_str("null"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::String(s) => write!(f, "{:?}", s.as_str()),
        }
    }
}

/// A type expression used for fields, elements and variants
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "of", rename_all = "camelCase")]
pub enum TypeRef {
    /// Another catalog entry, by name
    Named(SmolStr),
    Primitive(Primitive),
    /// A value fixed to exactly one literal
    Literal(Literal),
    Array(Box<TypeRef>),
    /// Object with arbitrary keys and uniformly typed values
    Map(Box<TypeRef>),
}

impl TypeRef {
    /// The catalog name this reference points at, if any
    pub fn as_named(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Every catalog name mentioned anywhere in this expression
    pub fn named_refs(&self) -> Vec<&SmolStr> {
        match self {
            Self::Named(name) => vec![name],
            Self::Array(inner) | Self::Map(inner) => inner.named_refs(),
            Self::Primitive(_) | Self::Literal(_) => Vec::new(),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Self::Primitive(Primitive::Any))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Primitive(p) => write!(f, "{:?}", p),
            Self::Literal(l) => write!(f, "const {}", l),
            Self::Array(inner) => write!(f, "[{}]", inner),
            Self::Map(inner) => write!(f, "{{string: {}}}", inner),
        }
    }
}

/// One field of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Property name as it appears in JSON
    pub name: SmolStr,
    pub ty: TypeRef,
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordType {
    /// Fields ordered by JSON name
    pub fields: Vec<Field>,
}

impl RecordType {
    /// Look up a field by JSON name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields whose type is fixed to a single literal
    pub fn literal_fields(&self) -> impl Iterator<Item = (&SmolStr, &Literal)> {
        self.fields.iter().filter_map(|f| match &f.ty {
            TypeRef::Literal(l) => Some((&f.name, l)),
            _ => None,
        })
    }

    /// Names of required fields
    pub fn required(&self) -> BTreeSet<SmolStr> {
        self.fields
            .iter()
            .filter(|f| !f.optional)
            .map(|f| f.name.clone())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumType {
    pub values: Vec<Literal>,
    /// Human names for the values, parallel to `values` when present
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub descriptions: Vec<SmolStr>,
}

/// Structural signature used to pick a union variant when there is no discriminant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Shape {
    Object { required: BTreeSet<SmolStr> },
    Array,
    String,
    Integer,
    Number,
    Boolean,
    Null,
    Any,
}

impl Shape {
    /// Whether a JSON value has this shape
    pub fn matches(&self, value: &serde_json::Value) -> bool {
        use serde_json::Value;
        match (self, value) {
            (Self::Any, _) => true,
            (Self::Object { required }, Value::Object(map)) => {
                required.iter().all(|k| map.contains_key(k.as_str()))
            }
            (Self::Array, Value::Array(_)) => true,
            (Self::String, Value::String(_)) => true,
            (Self::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (Self::Number, Value::Number(_)) => true,
            (Self::Boolean, Value::Bool(_)) => true,
            (Self::Null, Value::Null) => true,
            _ => false,
        }
    }

    /// Whether every value matching `other` also matches `self`
    ///
    /// A variant is unreachable when an earlier variant subsumes it.
    pub fn subsumes(&self, other: &Shape) -> bool {
        match (self, other) {
            (Self::Any, _) => true,
            (Self::Object { required: a }, Self::Object { required: b }) => a.is_subset(b),
            (Self::Number, Self::Integer) => true,
            (a, b) => a == b,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnionVariant {
    /// Discriminant value selecting this variant, for discriminated unions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<Literal>,
    pub ty: TypeRef,
    pub shape: Shape,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnionType {
    /// Property whose literal value selects the variant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminant: Option<SmolStr>,
    /// Variants in declaration order
    pub variants: Vec<UnionVariant>,
}

impl UnionType {
    /// Find the variant selected by a discriminant value
    pub fn variant_for_tag(&self, tag: &Literal) -> Option<(usize, &UnionVariant)> {
        self.variants
            .iter()
            .enumerate()
            .find(|(_, v)| v.tag.as_ref() == Some(tag))
    }
}

/// The compiler's output unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ResolvedType {
    Record(RecordType),
    Enum(EnumType),
    Union(UnionType),
    Array { element: TypeRef },
    Alias { target: TypeRef },
}

impl ResolvedType {
    /// Every catalog name this type refers to
    pub fn named_refs(&self) -> Vec<&SmolStr> {
        match self {
            Self::Record(record) => record.fields.iter().flat_map(|f| f.ty.named_refs()).collect(),
            Self::Enum(_) => Vec::new(),
            Self::Union(union) => union.variants.iter().flat_map(|v| v.ty.named_refs()).collect(),
            Self::Array { element } => element.named_refs(),
            Self::Alias { target } => target.named_refs(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Record(_) => "record",
            Self::Enum(_) => "enum",
            Self::Union(_) => "union",
            Self::Array { .. } => "array",
            Self::Alias { .. } => "alias",
        }
    }
}

/// A named catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: SmolStr,
    /// Qualified identifier of the schema node this entry was compiled from
    pub origin: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub ty: ResolvedType,
}

/// Mapping of type name to resolved type
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeCatalog {
    entries: BTreeMap<SmolStr, CatalogEntry>,
}

impl TypeCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, entry: CatalogEntry) {
        self.entries.insert(entry.name.clone(), entry);
    }

    /// Get an entry by type name
    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name)
    }

    /// Whether a type name exists
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Iterate over entries in name order
    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    /// Type names in catalog order
    pub fn names(&self) -> impl Iterator<Item = &SmolStr> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Follow alias entries until reaching a non-alias type
    ///
    /// Returns the final entry name along with its type. `None` if the name is
    /// dangling or the alias chain does not end in a named entry.
    pub fn resolve_alias<'a>(&'a self, name: &str) -> Option<(&'a str, &'a ResolvedType)> {
        let mut current = name;
        for _ in 0..=self.entries.len() {
            let entry = self.entries.get(current)?;
            match &entry.ty {
                ResolvedType::Alias {
                    target: TypeRef::Named(next),
                } => current = next.as_str(),
                ty => return Some((entry.name.as_str(), ty)),
            }
        }
        None
    }

    /// Whether `to` can be reached from `from` by following type references
    pub fn reaches(&self, from: &str, to: &str) -> bool {
        let mut stack: Vec<&str> = vec![from];
        let mut seen = BTreeSet::new();
        while let Some(name) = stack.pop() {
            if !seen.insert(name) {
                continue;
            }
            let Some(entry) = self.entries.get(name) else {
                continue;
            };
            for next in entry.ty.named_refs() {
                if next == to {
                    return true;
                }
                stack.push(next.as_str());
            }
        }
        false
    }
}

impl<'a> IntoIterator for &'a TypeCatalog {
    type Item = &'a CatalogEntry;
    type IntoIter = std::collections::btree_map::Values<'a, SmolStr, CatalogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shape_subsumption() {
        let base = Shape::Object {
            required: ["a".into()].into_iter().collect(),
        };
        let wider = Shape::Object {
            required: ["a".into(), "b".into()].into_iter().collect(),
        };
        assert!(base.subsumes(&wider));
        assert!(!wider.subsumes(&base));
        assert!(Shape::Number.subsumes(&Shape::Integer));
        assert!(!Shape::Integer.subsumes(&Shape::Number));
        assert!(Shape::Any.subsumes(&Shape::Null));
    }

    #[test]
    fn test_shape_matches() {
        let shape = Shape::Object {
            required: ["x".into()].into_iter().collect(),
        };
        assert!(shape.matches(&json!({"x": 1, "y": 2})));
        assert!(!shape.matches(&json!({"y": 2})));
        assert!(Shape::Integer.matches(&json!(3)));
        assert!(!Shape::Integer.matches(&json!(3.5)));
    }

    #[test]
    fn test_literal_json_conversion() {
        assert_eq!(Literal::from_json(&json!("page")), Some(Literal::String("page".into())));
        assert_eq!(Literal::from_json(&json!(2)), Some(Literal::Integer(2)));
        assert_eq!(Literal::from_json(&json!(2.5)), None);
        assert!(Literal::Boolean(true).matches(&json!(true)));
    }

    #[test]
    fn test_catalog_serializes_as_map() {
        let mut catalog = TypeCatalog::new();
        catalog.insert(CatalogEntry {
            name: "Name".into(),
            origin: "a.json#".into(),
            description: None,
            ty: ResolvedType::Alias {
                target: TypeRef::Primitive(Primitive::String),
            },
        });
        let json = serde_json::to_value(&catalog).unwrap();
        assert_eq!(json["Name"]["ty"]["kind"], "alias");

        let back: TypeCatalog = serde_json::from_value(json).unwrap();
        assert_eq!(back, catalog);
    }
}
