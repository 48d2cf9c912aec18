use crate::catalog::Literal;
use serde_json::Value;
use smol_str::SmolStr;
use std::collections::BTreeMap;

/// A decoded value, typed against a [`TypeCatalog`](crate::catalog::TypeCatalog)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Data {
    Null,
    Boolean(bool),
    Integer(i64),
    /// Any JSON number, kept exactly as read
    Number(serde_json::Number),
    String(SmolStr),
    Array(Vec<Data>),
    /// String-keyed map with uniformly typed values
    Map(BTreeMap<SmolStr, Data>),
    Record(Record),
    Enum {
        type_name: SmolStr,
        value: Literal,
    },
    Union(Union),
    /// Unconstrained JSON
    Unknown(Value),
}

/// An object decoded against a record type
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    pub type_name: SmolStr,
    /// Declared fields that were present
    pub fields: BTreeMap<SmolStr, Data>,
    /// Fields the schema does not know about, preserved verbatim
    pub extra_data: BTreeMap<SmolStr, Value>,
}

/// A value decoded against a union type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Union {
    pub type_name: SmolStr,
    /// Discriminant value, for discriminated unions
    pub tag: Option<Literal>,
    /// Index of the selected variant
    pub variant: usize,
    pub value: Box<Data>,
}

impl Record {
    /// Create an empty record of the given type
    pub fn new(type_name: impl Into<SmolStr>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
            extra_data: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Data> {
        self.fields.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Data> {
        self.fields.get_mut(name)
    }

    /// Set a declared field, returning the previous value
    pub fn insert(&mut self, name: impl Into<SmolStr>, value: Data) -> Option<Data> {
        self.fields.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Data> {
        self.fields.remove(name)
    }

    /// String value of a declared field
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Data::as_str)
    }

    /// Unknown fields carried through from the source document
    pub fn extra_data(&self) -> &BTreeMap<SmolStr, Value> {
        &self.extra_data
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, name: impl Into<SmolStr>, value: Data) -> Self {
        self.insert(name, value);
        self
    }
}

impl Data {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Data::String(s) => Some(s.as_str()),
            Data::Enum { value, .. } => value.as_str(),
            Data::Union(u) => u.value.as_str(),
            Data::Unknown(Value::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Data::Integer(i) => Some(*i),
            Data::Number(n) => n.as_i64(),
            Data::Enum {
                value: Literal::Integer(i),
                ..
            } => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Data::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// The record inside this value, looking through union wrappers
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Data::Record(record) => Some(record),
            Data::Union(u) => u.value.as_record(),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Data::Record(record) => Some(record),
            Data::Union(u) => u.value.as_record_mut(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Data]> {
        match self {
            Data::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Data>> {
        match self {
            Data::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Catalog type of this value, for records, enums and unions
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Data::Record(record) => Some(record.type_name.as_str()),
            Data::Enum { type_name, .. } => Some(type_name.as_str()),
            Data::Union(u) => Some(u.type_name.as_str()),
            _ => None,
        }
    }

    /// Short description of the value's kind, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Data::Null => "null",
            Data::Boolean(_) => "boolean",
            Data::Integer(_) => "integer",
            Data::Number(_) => "number",
            Data::String(_) => "string",
            Data::Array(_) => "array",
            Data::Map(_) => "map",
            Data::Record(_) => "record",
            Data::Enum { .. } => "enum",
            Data::Union(_) => "union",
            Data::Unknown(_) => "unknown",
        }
    }

    /// Plain JSON for this value, without consulting the catalog
    ///
    /// Record fields and overflow entries are merged into one object; declared
    /// fields win on a key collision.
    pub fn to_json(&self) -> Value {
        match self {
            Data::Null => Value::Null,
            Data::Boolean(b) => Value::Bool(*b),
            Data::Integer(i) => Value::from(*i),
            Data::Number(n) => Value::Number(n.clone()),
            Data::String(s) => Value::String(s.to_string()),
            Data::Array(items) => Value::Array(items.iter().map(Data::to_json).collect()),
            Data::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
            Data::Record(record) => {
                let mut obj: serde_json::Map<String, Value> = record
                    .extra_data
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect();
                for (k, v) in &record.fields {
                    obj.insert(k.to_string(), v.to_json());
                }
                Value::Object(obj)
            }
            Data::Enum { value, .. } => value.to_json(),
            Data::Union(u) => u.value.to_json(),
            Data::Unknown(value) => value.clone(),
        }
    }
}

impl From<&str> for Data {
    fn from(s: &str) -> Self {
        Data::String(SmolStr::new(s))
    }
}

impl From<SmolStr> for Data {
    fn from(s: SmolStr) -> Self {
        Data::String(s)
    }
}

impl From<i64> for Data {
    fn from(i: i64) -> Self {
        Data::Integer(i)
    }
}

impl From<bool> for Data {
    fn from(b: bool) -> Self {
        Data::Boolean(b)
    }
}

impl From<Record> for Data {
    fn from(record: Record) -> Self {
        Data::Record(record)
    }
}

impl From<Vec<Data>> for Data {
    fn from(items: Vec<Data>) -> Self {
        Data::Array(items)
    }
}
