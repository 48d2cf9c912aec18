use super::{Data, EncodeError, FieldPath};
use crate::catalog::{Literal, Primitive, RecordType, ResolvedType, TypeCatalog, TypeRef, UnionType};
use serde_json::{Map, Value};

pub(super) struct Encoder<'a> {
    catalog: &'a TypeCatalog,
}

impl<'a> Encoder<'a> {
    pub(super) fn new(catalog: &'a TypeCatalog) -> Self {
        Self { catalog }
    }

    pub(super) fn named(&self, name: &str, data: &Data, path: &mut FieldPath) -> Result<Value, EncodeError> {
        let entry = self
            .catalog
            .get(name)
            .ok_or_else(|| EncodeError::new(path, format!("unknown type {}", name)))?;

        match &entry.ty {
            ResolvedType::Record(record) => self.record(&entry.name, record, data, path),
            ResolvedType::Enum(enum_type) => match data {
                Data::Enum { value, .. } if enum_type.values.contains(value) => Ok(value.to_json()),
                Data::Enum { value, .. } => Err(EncodeError::new(
                    path,
                    format!("{} is not a member of enum {}", value, entry.name),
                )),
                other => Err(wrong_kind(&entry.name, other, path)),
            },
            ResolvedType::Union(union) => self.union(&entry.name, union, data, path),
            ResolvedType::Array { element } => self.array(element, data, path),
            ResolvedType::Alias { target } => self.type_ref(target, data, path),
        }
    }

    fn type_ref(&self, ty: &TypeRef, data: &Data, path: &mut FieldPath) -> Result<Value, EncodeError> {
        match ty {
            TypeRef::Named(name) => self.named(name, data, path),
            TypeRef::Primitive(p) => primitive(*p, data, path),
            TypeRef::Literal(literal) => {
                let value = primitive(literal.primitive(), data, path)?;
                if !literal.matches(&value) {
                    return Err(EncodeError::new(path, format!("literal {}, found {}", literal, value)));
                }
                Ok(value)
            }
            TypeRef::Array(element) => self.array(element, data, path),
            TypeRef::Map(inner) => {
                let Data::Map(map) = data else {
                    return Err(wrong_kind("map", data, path));
                };
                let mut obj = Map::new();
                for (key, item) in map {
                    path.push_field(key);
                    obj.insert(key.to_string(), self.type_ref(inner, item, path)?);
                    path.pop();
                }
                Ok(Value::Object(obj))
            }
        }
    }

    fn array(&self, element: &TypeRef, data: &Data, path: &mut FieldPath) -> Result<Value, EncodeError> {
        let Data::Array(items) = data else {
            return Err(wrong_kind("array", data, path));
        };
        let mut encoded = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            path.push_index(i);
            encoded.push(self.type_ref(element, item, path)?);
            path.pop();
        }
        Ok(Value::Array(encoded))
    }

    fn record(
        &self,
        type_name: &str,
        record: &RecordType,
        data: &Data,
        path: &mut FieldPath,
    ) -> Result<Value, EncodeError> {
        let Data::Record(value) = data else {
            return Err(wrong_kind(type_name, data, path));
        };
        if value.type_name != type_name {
            return Err(EncodeError::new(
                path,
                format!("record {}, found record {}", type_name, value.type_name),
            ));
        }
        if let Some(unknown) = value.fields.keys().find(|k| record.field(k).is_none()) {
            return Err(EncodeError::new(
                path,
                format!("`{}` is not a field of {}; put unknown fields in extra_data", unknown, type_name),
            ));
        }

        let mut obj: Map<String, Value> = value
            .extra_data
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        for field in &record.fields {
            path.push_field(&field.name);
            match value.fields.get(&field.name) {
                Some(field_value) => {
                    obj.insert(field.name.to_string(), self.type_ref(&field.ty, field_value, path)?);
                }
                None if field.optional => {}
                None => return Err(EncodeError::new(path, "required field is missing")),
            }
            path.pop();
        }
        Ok(Value::Object(obj))
    }

    fn union(
        &self,
        type_name: &str,
        union: &UnionType,
        data: &Data,
        path: &mut FieldPath,
    ) -> Result<Value, EncodeError> {
        let (index, inner) = match data {
            Data::Union(u) => (u.variant, u.value.as_ref()),
            // A bare record or enum is accepted when exactly one variant names its type
            other => {
                let index = other
                    .type_name()
                    .and_then(|name| self.variant_named(union, name))
                    .ok_or_else(|| wrong_kind(type_name, other, path))?;
                (index, other)
            }
        };
        let variant = union.variants.get(index).ok_or_else(|| {
            EncodeError::new(path, format!("{} has no variant {}", type_name, index))
        })?;
        self.type_ref(&variant.ty, inner, path)
    }

    fn variant_named(&self, union: &UnionType, name: &str) -> Option<usize> {
        let mut matching = union.variants.iter().enumerate().filter(|(_, v)| {
            v.ty.as_named()
                .and_then(|n| self.catalog.resolve_alias(n))
                .is_some_and(|(resolved, _)| resolved == name)
        });
        match (matching.next(), matching.next()) {
            (Some((i, _)), None) => Some(i),
            _ => None,
        }
    }
}

fn primitive(p: Primitive, data: &Data, path: &FieldPath) -> Result<Value, EncodeError> {
    let value = match (p, data) {
        (Primitive::Any, other) => other.to_json(),
        (Primitive::String, Data::String(s)) => Value::String(s.to_string()),
        (Primitive::Integer, Data::Integer(i)) => Value::from(*i),
        (Primitive::Number, Data::Number(n)) => Value::Number(n.clone()),
        (Primitive::Number, Data::Integer(i)) => Value::from(*i),
        (Primitive::Boolean, Data::Boolean(b)) => Value::Bool(*b),
        (Primitive::Null, Data::Null) => Value::Null,
        (p, Data::Unknown(v)) if literal_kind_matches(p, v) => v.clone(),
        (p, other) => return Err(wrong_kind(&format!("{:?}", p).to_lowercase(), other, path)),
    };
    Ok(value)
}

/// Untyped JSON is accepted where its kind fits
fn literal_kind_matches(p: Primitive, value: &Value) -> bool {
    match Literal::from_json(value) {
        Some(literal) => literal.primitive() == p,
        None => p == Primitive::Number && value.is_number(),
    }
}

fn wrong_kind(expected: &str, data: &Data, path: &FieldPath) -> EncodeError {
    EncodeError::new(path, format!("{}, found {}", expected, data.kind()))
}
