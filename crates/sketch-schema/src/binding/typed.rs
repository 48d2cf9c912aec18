//! Decoding for emitted binding types
//!
//! Emitted records, enums and unions implement [`DecodeJson`] field by field,
//! so errors carry the same `$.layers[0].frame` paths as the runtime
//! [`Bindings`](super::Bindings). Their `serde::Deserialize` impls go through
//! [`deserialize_json`].

use super::{DecodeError, FieldPath};
use crate::graph::json_kind;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Number, Value};
use smol_str::SmolStr;
use std::collections::{BTreeMap, BTreeSet};

/// Decode a value from JSON, reporting failures at `path`
pub trait DecodeJson: Sized {
    fn decode_at(value: &Value, path: &mut FieldPath) -> Result<Self, DecodeError>;
}

/// `serde::Deserialize` body shared by every emitted type
pub fn deserialize_json<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DecodeJson,
{
    let value = Value::deserialize(deserializer)?;
    T::decode_at(&value, &mut FieldPath::default()).map_err(D::Error::custom)
}

pub(crate) fn mismatch(expected: &str, value: &Value, path: &FieldPath) -> DecodeError {
    DecodeError::TypeMismatch {
        path: path.to_string(),
        expected: expected.to_string(),
        found: json_kind(value),
    }
}

/// The discriminant property of a tagged union value
pub fn union_tag<'v>(
    value: &'v Value,
    discriminant: &str,
    path: &mut FieldPath,
) -> Result<&'v Value, DecodeError> {
    let obj = value.as_object().ok_or_else(|| mismatch("object", value, path))?;
    match obj.get(discriminant) {
        Some(tag) => Ok(tag),
        None => {
            path.push_field(discriminant);
            let err = DecodeError::MissingField {
                path: path.to_string(),
            };
            path.pop();
            Err(err)
        }
    }
}

impl DecodeJson for SmolStr {
    fn decode_at(value: &Value, path: &mut FieldPath) -> Result<Self, DecodeError> {
        value
            .as_str()
            .map(SmolStr::new)
            .ok_or_else(|| mismatch("string", value, path))
    }
}

impl DecodeJson for i64 {
    fn decode_at(value: &Value, path: &mut FieldPath) -> Result<Self, DecodeError> {
        value.as_i64().ok_or_else(|| mismatch("integer", value, path))
    }
}

impl DecodeJson for Number {
    fn decode_at(value: &Value, path: &mut FieldPath) -> Result<Self, DecodeError> {
        match value {
            Value::Number(n) => Ok(n.clone()),
            other => Err(mismatch("number", other, path)),
        }
    }
}

impl DecodeJson for bool {
    fn decode_at(value: &Value, path: &mut FieldPath) -> Result<Self, DecodeError> {
        value.as_bool().ok_or_else(|| mismatch("boolean", value, path))
    }
}

impl DecodeJson for () {
    fn decode_at(value: &Value, path: &mut FieldPath) -> Result<Self, DecodeError> {
        value.as_null().ok_or_else(|| mismatch("null", value, path))
    }
}

impl DecodeJson for Value {
    fn decode_at(value: &Value, _path: &mut FieldPath) -> Result<Self, DecodeError> {
        Ok(value.clone())
    }
}

impl<T: DecodeJson> DecodeJson for Box<T> {
    fn decode_at(value: &Value, path: &mut FieldPath) -> Result<Self, DecodeError> {
        T::decode_at(value, path).map(Box::new)
    }
}

impl<T: DecodeJson> DecodeJson for Vec<T> {
    fn decode_at(value: &Value, path: &mut FieldPath) -> Result<Self, DecodeError> {
        let items = value.as_array().ok_or_else(|| mismatch("array", value, path))?;
        let mut decoded = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            path.push_index(i);
            decoded.push(T::decode_at(item, path)?);
            path.pop();
        }
        Ok(decoded)
    }
}

impl<T: DecodeJson> DecodeJson for BTreeMap<SmolStr, T> {
    fn decode_at(value: &Value, path: &mut FieldPath) -> Result<Self, DecodeError> {
        let obj = value.as_object().ok_or_else(|| mismatch("object", value, path))?;
        let mut decoded = BTreeMap::new();
        for (key, item) in obj {
            path.push_field(key);
            decoded.insert(SmolStr::new(key), T::decode_at(item, path)?);
            path.pop();
        }
        Ok(decoded)
    }
}

/// Field-by-field reader used by emitted record decoders
///
/// Every property the record declares is marked as seen; whatever is left
/// over goes to the record's `extra_data`.
pub struct RecordReader<'v, 'p> {
    obj: &'v Map<String, Value>,
    path: &'p mut FieldPath,
    declared: BTreeSet<&'static str>,
}

impl<'v, 'p> RecordReader<'v, 'p> {
    pub fn new(value: &'v Value, path: &'p mut FieldPath) -> Result<Self, DecodeError> {
        let obj = value.as_object().ok_or_else(|| mismatch("object", value, path))?;
        Ok(Self {
            obj,
            path,
            declared: BTreeSet::new(),
        })
    }

    pub fn required<T: DecodeJson>(&mut self, name: &'static str) -> Result<T, DecodeError> {
        self.declared.insert(name);
        self.path.push_field(name);
        let result = match self.obj.get(name) {
            Some(value) => T::decode_at(value, self.path),
            None => Err(DecodeError::MissingField {
                path: self.path.to_string(),
            }),
        };
        self.path.pop();
        result
    }

    pub fn optional<T: DecodeJson>(&mut self, name: &'static str) -> Result<Option<T>, DecodeError> {
        if self.obj.contains_key(name) {
            self.required(name).map(Some)
        } else {
            self.declared.insert(name);
            Ok(None)
        }
    }

    /// A required property fixed to a single value
    pub fn required_literal<T: DecodeJson>(
        &mut self,
        name: &'static str,
        expected: &Value,
    ) -> Result<T, DecodeError> {
        let obj = self.obj;
        if let Some(value) = obj.get(name) {
            self.check_literal(name, value, expected)?;
        }
        self.required(name)
    }

    /// An optional property fixed to a single value when present
    pub fn optional_literal<T: DecodeJson>(
        &mut self,
        name: &'static str,
        expected: &Value,
    ) -> Result<Option<T>, DecodeError> {
        let obj = self.obj;
        if let Some(value) = obj.get(name) {
            self.check_literal(name, value, expected)?;
        }
        self.optional(name)
    }

    fn check_literal(&mut self, name: &str, value: &Value, expected: &Value) -> Result<(), DecodeError> {
        if value == expected {
            return Ok(());
        }
        self.path.push_field(name);
        let err = DecodeError::TypeMismatch {
            path: self.path.to_string(),
            expected: format!("literal {}", expected),
            found: json_kind(value),
        };
        self.path.pop();
        Err(err)
    }

    /// Properties the record does not declare
    pub fn finish(self) -> BTreeMap<SmolStr, Value> {
        self.obj
            .iter()
            .filter(|(key, _)| !self.declared.contains(key.as_str()))
            .map(|(key, value)| (SmolStr::new(key), value.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_container_errors_carry_paths() {
        let value = json!({"a": [1, 2, "x"]});
        let err = BTreeMap::<SmolStr, Vec<i64>>::decode_at(&value, &mut FieldPath::default())
            .unwrap_err();
        assert_eq!(err.path(), "$.a[2]");
    }

    #[test]
    fn test_union_tag() {
        let mut path = FieldPath::default();
        path.push_field("layers");
        path.push_index(1);
        let value = json!({"_class": "group"});
        assert_eq!(union_tag(&value, "_class", &mut path), Ok(&json!("group")));

        let err = union_tag(&json!({}), "_class", &mut path).unwrap_err();
        assert_eq!(err.path(), "$.layers[1]._class");
        let err = union_tag(&json!(3), "_class", &mut path).unwrap_err();
        assert!(matches!(err, DecodeError::TypeMismatch { .. }));
        assert_eq!(path.to_string(), "$.layers[1]");
    }

    #[test]
    fn test_numbers_keep_their_representation() {
        let n = Number::decode_at(&json!(0), &mut FieldPath::default()).expect("number");
        assert_eq!(serde_json::to_value(n).expect("encode"), json!(0));
    }

    #[test]
    fn test_record_reader() {
        let value = json!({"_class": "rect", "width": 3, "note": "kept"});
        let mut path = FieldPath::default();
        let mut reader = RecordReader::new(&value, &mut path).expect("object");

        let class: SmolStr = reader
            .required_literal("_class", &json!("rect"))
            .expect("class");
        let width: Option<i64> = reader.optional("width").expect("width");
        let height: Option<i64> = reader.optional("height").expect("height");
        assert_eq!(class, "rect");
        assert_eq!(width, Some(3));
        assert_eq!(height, None);
        let extra = reader.finish();
        assert_eq!(extra.len(), 1);
        assert_eq!(extra.get("note"), Some(&json!("kept")));
    }

    #[test]
    fn test_record_reader_rejects_wrong_literal_and_missing_fields() {
        let value = json!({"_class": "text"});
        let mut path = FieldPath::default();
        let mut reader = RecordReader::new(&value, &mut path).expect("object");

        let err = reader
            .required_literal::<SmolStr>("_class", &json!("rect"))
            .unwrap_err();
        assert!(matches!(err, DecodeError::TypeMismatch { .. }));
        assert_eq!(err.path(), "$._class");

        let err = reader.required::<Number>("width").unwrap_err();
        assert_eq!(err, DecodeError::MissingField { path: "$.width".into() });
    }
}
