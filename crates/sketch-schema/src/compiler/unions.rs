use super::Compiler;
use crate::catalog::{
    CatalogEntry, Literal, Primitive, RecordType, ResolvedType, Shape, TypeRef, UnionType,
    UnionVariant,
};
use crate::error::{Result, SchemaError};
use crate::graph::NodeIndex;
use heck::ToPascalCase;
use smol_str::SmolStr;
use std::collections::{BTreeMap, BTreeSet};

/// A `oneOf`/`anyOf` whose variant types are known but not yet classified
pub(super) struct PendingUnion {
    name: SmolStr,
    node: NodeIndex,
    branches: Vec<TypeRef>,
}

impl<'g> Compiler<'g> {
    /// Compile the branch types of a union and queue it for resolution
    pub(super) fn defer_union(&mut self, idx: NodeIndex, name: SmolStr) -> Result<()> {
        let graph = self.graph;
        let node = graph.node(idx);
        let branch_nodes = if node.one_of.is_empty() {
            &node.any_of
        } else {
            &node.one_of
        };

        let mut branches = Vec::with_capacity(branch_nodes.len());
        for (i, &branch) in branch_nodes.iter().enumerate() {
            let hint = match &graph.node(branch).title {
                Some(title) => title.to_pascal_case(),
                None => format!("{}Variant{}", name, i),
            };
            branches.push(self.type_ref(branch, &hint)?);
        }

        self.pending_unions.push(PendingUnion {
            name,
            node: idx,
            branches,
        });
        Ok(())
    }

    /// Pick discriminants (or check structural distinguishability) for every queued union
    pub(super) fn finish_unions(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending_unions);
        let nested: BTreeMap<SmolStr, Vec<TypeRef>> = pending
            .iter()
            .map(|union| (union.name.clone(), union.branches.clone()))
            .collect();
        for union in pending {
            let node = self.graph.node(union.node);
            let ty = self.resolve_union(&union, &nested)?;
            match &ty.discriminant {
                Some(field) => {
                    tracing::debug!(union = %union.name, discriminant = %field, "discriminated union")
                }
                None => tracing::debug!(union = %union.name, "structural union"),
            }
            self.catalog.insert(CatalogEntry {
                name: union.name,
                origin: node.id.clone(),
                description: node.description.clone(),
                ty: ResolvedType::Union(ty),
            });
        }
        Ok(())
    }

    fn resolve_union(
        &self,
        union: &PendingUnion,
        nested: &BTreeMap<SmolStr, Vec<TypeRef>>,
    ) -> Result<UnionType> {
        // Branches that are unions themselves are tried inline first
        let mut seen = BTreeSet::from([union.name.clone()]);
        let mut flattened = Vec::new();
        flatten_branches(&union.branches, nested, &mut seen, &mut flattened);
        if flattened != union.branches {
            if let Some(ty) = self.discriminated(&flattened) {
                return Ok(ty);
            }
        }
        if let Some(ty) = self.discriminated(&union.branches) {
            return Ok(ty);
        }

        let shapes: Vec<Shape> = union.branches.iter().map(|ty| self.shape_of(ty)).collect();

        // Without a discriminant the first matching shape wins, so a variant
        // whose shape an earlier one subsumes is unreachable.
        for (j, later) in shapes.iter().enumerate() {
            if shapes[..j].iter().any(|earlier| earlier.subsumes(later)) {
                return Err(SchemaError::AmbiguousUnion {
                    node: self.graph.node(union.node).id.to_string(),
                    variant: j,
                });
            }
        }

        let variants = union
            .branches
            .iter()
            .zip(shapes)
            .map(|(ty, shape)| UnionVariant {
                tag: None,
                ty: ty.clone(),
                shape,
            })
            .collect();
        Ok(UnionType {
            discriminant: None,
            variants,
        })
    }

    /// A tagged union over `branches`, if every branch is a record with a
    /// shared discriminant
    fn discriminated(&self, branches: &[TypeRef]) -> Option<UnionType> {
        let records: Vec<&RecordType> = branches
            .iter()
            .map(|ty| self.record_of(ty))
            .collect::<Option<_>>()?;
        let (field, tags) = discriminant(&records)?;
        let variants = branches
            .iter()
            .zip(tags)
            .map(|(ty, tag)| UnionVariant {
                tag: Some(tag),
                ty: ty.clone(),
                shape: self.shape_of(ty),
            })
            .collect();
        Some(UnionType {
            discriminant: Some(field),
            variants,
        })
    }

    fn record_of(&self, ty: &TypeRef) -> Option<&RecordType> {
        match self.catalog.resolve_alias(ty.as_named()?)? {
            (_, ResolvedType::Record(record)) => Some(record),
            _ => None,
        }
    }

    fn shape_of(&self, ty: &TypeRef) -> Shape {
        match ty {
            TypeRef::Named(name) => match self.catalog.resolve_alias(name) {
                Some((_, ResolvedType::Record(record))) => Shape::Object {
                    required: record.required(),
                },
                Some((_, ResolvedType::Enum(e))) => {
                    let kinds: BTreeSet<Primitive> = e.values.iter().map(Literal::primitive).collect();
                    match kinds.into_iter().collect::<Vec<_>>().as_slice() {
                        [single] => primitive_shape(*single),
                        _ => Shape::Any,
                    }
                }
                Some((_, ResolvedType::Array { .. })) => Shape::Array,
                Some((_, ResolvedType::Alias { target })) => self.shape_of(target),
                Some((_, ResolvedType::Union(_))) | None => Shape::Any,
            },
            TypeRef::Primitive(p) => primitive_shape(*p),
            TypeRef::Literal(lit) => primitive_shape(lit.primitive()),
            TypeRef::Array(_) => Shape::Array,
            TypeRef::Map(_) => Shape::Object {
                required: BTreeSet::new(),
            },
        }
    }
}

/// Replace branches naming another pending union by that union's branches,
/// dropping duplicates
fn flatten_branches(
    branches: &[TypeRef],
    nested: &BTreeMap<SmolStr, Vec<TypeRef>>,
    seen: &mut BTreeSet<SmolStr>,
    out: &mut Vec<TypeRef>,
) {
    for ty in branches {
        match ty.as_named().and_then(|name| nested.get_key_value(name)) {
            Some((name, inner)) => {
                if seen.insert(name.clone()) {
                    flatten_branches(inner, nested, seen, out);
                }
            }
            None if !out.contains(ty) => out.push(ty.clone()),
            None => {}
        }
    }
}

fn primitive_shape(primitive: Primitive) -> Shape {
    match primitive {
        Primitive::String => Shape::String,
        Primitive::Integer => Shape::Integer,
        Primitive::Number => Shape::Number,
        Primitive::Boolean => Shape::Boolean,
        Primitive::Null => Shape::Null,
        Primitive::Any => Shape::Any,
    }
}

/// The lexicographically first property that every variant fixes to a distinct literal
fn discriminant(records: &[&RecordType]) -> Option<(SmolStr, Vec<Literal>)> {
    let first = records.first()?;
    for (candidate, _) in first.literal_fields() {
        let tags: Option<Vec<Literal>> = records
            .iter()
            .map(|record| match record.field(candidate).map(|f| &f.ty) {
                Some(TypeRef::Literal(lit)) => Some(lit.clone()),
                _ => None,
            })
            .collect();
        let Some(tags) = tags else { continue };
        let distinct: BTreeSet<&Literal> = tags.iter().collect();
        if distinct.len() == tags.len() {
            return Some((candidate.clone(), tags));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Field;

    fn record(fields: &[(&str, TypeRef)]) -> RecordType {
        RecordType {
            fields: fields
                .iter()
                .map(|(name, ty)| Field {
                    name: SmolStr::new(name),
                    ty: ty.clone(),
                    optional: false,
                    description: None,
                })
                .collect(),
        }
    }

    fn lit(s: &str) -> TypeRef {
        TypeRef::Literal(Literal::String(s.into()))
    }

    #[test]
    fn test_discriminant_prefers_first_distinct_literal() {
        let a = record(&[("_class", lit("group")), ("kind", lit("layer"))]);
        let b = record(&[("_class", lit("text")), ("kind", lit("layer"))]);
        let (field, tags) = discriminant(&[&a, &b]).expect("discriminant");
        assert_eq!(field, "_class");
        assert_eq!(tags, vec![Literal::String("group".into()), Literal::String("text".into())]);
    }

    #[test]
    fn test_discriminant_skips_shared_values() {
        let a = record(&[("a", lit("same")), ("b", lit("x"))]);
        let b = record(&[("a", lit("same")), ("b", lit("y"))]);
        let (field, _) = discriminant(&[&a, &b]).expect("discriminant");
        assert_eq!(field, "b");
    }

    #[test]
    fn test_flatten_branches_inlines_nested_unions() {
        let named = |n: &str| TypeRef::Named(n.into());
        let nested = BTreeMap::from([
            (SmolStr::new("Outer"), vec![named("Shape"), named("Text")]),
            (SmolStr::new("Shape"), vec![named("Rect"), named("Oval"), named("Outer")]),
        ]);
        let mut seen = BTreeSet::from([SmolStr::new("Outer")]);
        let mut out = Vec::new();
        flatten_branches(&nested["Outer"], &nested, &mut seen, &mut out);
        assert_eq!(out, [named("Rect"), named("Oval"), named("Text")]);
    }

    #[test]
    fn test_no_discriminant_when_a_variant_lacks_the_literal() {
        let a = record(&[("_class", lit("group"))]);
        let b = record(&[("_class", TypeRef::Primitive(Primitive::String))]);
        assert!(discriminant(&[&a, &b]).is_none());
    }
}
