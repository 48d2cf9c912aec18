use super::utils::{dedupe_names, value_to_variant_name};
use crate::catalog::{EnumType, Field, Literal, TypeRef};
use heck::{ToPascalCase, ToSnakeCase};

/// Rust field names for a record's fields, in field order
///
/// `extra_data` is reserved for the overflow bag.
pub(super) fn field_names(fields: &[Field]) -> Vec<String> {
    let names = fields
        .iter()
        .map(|f| {
            let snake = f.name.to_snake_case();
            if snake == "extra_data" {
                "extra_data_field".to_string()
            } else {
                snake
            }
        })
        .collect();
    dedupe_names(names)
}

/// Variant names for an enum, taken from descriptions when every value has one
pub(super) fn enum_variant_names(enum_type: &EnumType) -> Vec<String> {
    let names = if enum_type.descriptions.len() == enum_type.values.len() {
        enum_type
            .descriptions
            .iter()
            .map(|d| value_to_variant_name(d))
            .collect()
    } else {
        enum_type.values.iter().map(literal_variant_name).collect()
    };
    dedupe_names(names)
}

fn literal_variant_name(literal: &Literal) -> String {
    match literal {
        Literal::String(s) => value_to_variant_name(s),
        Literal::Integer(i) if *i < 0 => format!("ValueMinus{}", i.unsigned_abs()),
        Literal::Integer(i) => format!("Value{}", i),
        Literal::Boolean(true) => "True".to_string(),
        Literal::Boolean(false) => "False".to_string(),
        Literal::Null(()) => "Null".to_string(),
    }
}

/// Variant name for a union branch
pub(super) fn union_variant_name(ty: &TypeRef) -> String {
    match ty {
        TypeRef::Named(name) => name.to_string(),
        TypeRef::Primitive(p) => format!("{:?}", p),
        TypeRef::Literal(literal) => literal_variant_name(literal).to_pascal_case(),
        TypeRef::Array(inner) => format!("{}Array", union_variant_name(inner)),
        TypeRef::Map(inner) => format!("{}Map", union_variant_name(inner)),
    }
}
