use super::typed::mismatch;
use super::{Data, DecodeError, FieldPath, Record, Union};
use crate::catalog::{
    EnumType, Literal, Primitive, RecordType, ResolvedType, TypeCatalog, TypeRef, UnionType,
};
use crate::graph::json_kind;
use serde_json::Value;
use smol_str::SmolStr;
use std::collections::BTreeMap;

pub(super) struct Decoder<'a> {
    catalog: &'a TypeCatalog,
}

impl<'a> Decoder<'a> {
    pub(super) fn new(catalog: &'a TypeCatalog) -> Self {
        Self { catalog }
    }

    pub(super) fn named(
        &self,
        name: &str,
        value: &Value,
        path: &mut FieldPath,
    ) -> Result<Data, DecodeError> {
        let entry = self.catalog.get(name).ok_or_else(|| DecodeError::UnknownType {
            path: path.to_string(),
            type_name: SmolStr::new(name),
        })?;

        match &entry.ty {
            ResolvedType::Record(record) => self.record(&entry.name, record, value, path),
            ResolvedType::Enum(enum_type) => enumeration(&entry.name, enum_type, value, path),
            ResolvedType::Union(union) => self.union(&entry.name, union, value, path),
            ResolvedType::Array { element } => self.array(element, value, path),
            ResolvedType::Alias { target } => self.type_ref(target, value, path),
        }
    }

    fn type_ref(&self, ty: &TypeRef, value: &Value, path: &mut FieldPath) -> Result<Data, DecodeError> {
        match ty {
            TypeRef::Named(name) => self.named(name, value, path),
            TypeRef::Primitive(p) => primitive(*p, value, path),
            TypeRef::Literal(literal) => {
                if !literal.matches(value) {
                    return Err(DecodeError::TypeMismatch {
                        path: path.to_string(),
                        expected: format!("literal {}", literal),
                        found: json_kind(value),
                    });
                }
                primitive(literal.primitive(), value, path)
            }
            TypeRef::Array(element) => self.array(element, value, path),
            TypeRef::Map(inner) => {
                let obj = expect_object(value, path)?;
                let mut map = BTreeMap::new();
                for (key, item) in obj {
                    path.push_field(key);
                    let decoded = self.type_ref(inner, item, path)?;
                    path.pop();
                    map.insert(SmolStr::new(key), decoded);
                }
                Ok(Data::Map(map))
            }
        }
    }

    fn array(&self, element: &TypeRef, value: &Value, path: &mut FieldPath) -> Result<Data, DecodeError> {
        let items = value.as_array().ok_or_else(|| mismatch("array", value, path))?;
        let mut decoded = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            path.push_index(i);
            decoded.push(self.type_ref(element, item, path)?);
            path.pop();
        }
        Ok(Data::Array(decoded))
    }

    fn record(
        &self,
        type_name: &SmolStr,
        record: &RecordType,
        value: &Value,
        path: &mut FieldPath,
    ) -> Result<Data, DecodeError> {
        let obj = expect_object(value, path)?;
        let mut decoded = Record::new(type_name.clone());

        for field in &record.fields {
            path.push_field(&field.name);
            match obj.get(field.name.as_str()) {
                Some(field_value) => {
                    let data = self.type_ref(&field.ty, field_value, path)?;
                    decoded.fields.insert(field.name.clone(), data);
                }
                None if field.optional => {}
                None => {
                    return Err(DecodeError::MissingField {
                        path: path.to_string(),
                    });
                }
            }
            path.pop();
        }

        for (key, extra) in obj {
            if record.field(key).is_none() {
                decoded.extra_data.insert(SmolStr::new(key), extra.clone());
            }
        }
        Ok(Data::Record(decoded))
    }

    fn union(
        &self,
        type_name: &SmolStr,
        union: &UnionType,
        value: &Value,
        path: &mut FieldPath,
    ) -> Result<Data, DecodeError> {
        let (variant, tag) = match &union.discriminant {
            Some(field) => {
                let obj = expect_object(value, path)?;
                let raw_tag = obj.get(field.as_str()).ok_or_else(|| {
                    path.push_field(field);
                    let err = DecodeError::MissingField {
                        path: path.to_string(),
                    };
                    path.pop();
                    err
                })?;
                let unknown = || DecodeError::UnknownTag {
                    path: path.to_string(),
                    type_name: type_name.clone(),
                    discriminant: field.clone(),
                    tag: raw_tag.to_string(),
                };
                let tag = Literal::from_json(raw_tag).ok_or_else(unknown)?;
                let (index, _) = union.variant_for_tag(&tag).ok_or_else(unknown)?;
                (index, Some(tag))
            }
            // First variant whose shape fits wins; it is then decoded strictly
            None => {
                let index = union
                    .variants
                    .iter()
                    .position(|v| v.shape.matches(value))
                    .ok_or_else(|| DecodeError::NoMatchingVariant {
                        path: path.to_string(),
                        type_name: type_name.clone(),
                    })?;
                (index, None)
            }
        };

        let inner = self.type_ref(&union.variants[variant].ty, value, path)?;
        Ok(Data::Union(Union {
            type_name: type_name.clone(),
            tag,
            variant,
            value: Box::new(inner),
        }))
    }
}

fn enumeration(
    type_name: &SmolStr,
    enum_type: &EnumType,
    value: &Value,
    path: &FieldPath,
) -> Result<Data, DecodeError> {
    let literal = Literal::from_json(value).ok_or_else(|| mismatch("enum literal", value, path))?;
    if enum_type.values.contains(&literal) {
        return Ok(Data::Enum {
            type_name: type_name.clone(),
            value: literal,
        });
    }
    // A value of the wrong kind is a mismatch; a value of the right kind is an unknown member
    let same_kind = enum_type
        .values
        .first()
        .is_none_or(|first| first.primitive() == literal.primitive());
    if !same_kind {
        return Err(mismatch("enum literal", value, path));
    }
    Err(DecodeError::UnknownEnumValue {
        path: path.to_string(),
        type_name: type_name.clone(),
        value: literal.to_string(),
    })
}

fn primitive(p: Primitive, value: &Value, path: &FieldPath) -> Result<Data, DecodeError> {
    let data = match (p, value) {
        (Primitive::Any, v) => Data::Unknown(v.clone()),
        (Primitive::String, Value::String(s)) => Data::String(SmolStr::new(s)),
        (Primitive::Integer, Value::Number(n)) if n.is_i64() => {
            Data::Integer(n.as_i64().unwrap_or_default())
        }
        (Primitive::Number, Value::Number(n)) => Data::Number(n.clone()),
        (Primitive::Boolean, Value::Bool(b)) => Data::Boolean(*b),
        (Primitive::Null, Value::Null) => Data::Null,
        (p, v) => {
            return Err(mismatch(&format!("{:?}", p).to_lowercase(), v, path));
        }
    };
    Ok(data)
}

fn expect_object<'v>(
    value: &'v Value,
    path: &FieldPath,
) -> Result<&'v serde_json::Map<String, Value>, DecodeError> {
    value.as_object().ok_or_else(|| mismatch("object", value, path))
}
