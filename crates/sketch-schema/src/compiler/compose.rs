use super::Compiler;
use crate::catalog::{Field, Primitive, RecordType, TypeRef};
use crate::error::{Result, SchemaError};
use crate::graph::{NodeIndex, NodeKind};
use heck::ToPascalCase;
use smol_str::SmolStr;
use std::collections::{BTreeMap, BTreeSet};

/// Fields gathered from every branch of an `allOf`
#[derive(Default)]
struct MergedFields {
    fields: BTreeMap<SmolStr, Field>,
    required: BTreeSet<SmolStr>,
}

impl<'g> Compiler<'g> {
    /// Flatten an `allOf` node and all of its branches into one record
    pub(super) fn merge_all_of(&mut self, idx: NodeIndex, owner: &str) -> Result<RecordType> {
        let mut merged = MergedFields::default();
        let mut visiting = Vec::new();
        self.collect_fields(idx, idx, owner, &mut merged, &mut visiting)?;

        let MergedFields { fields, required } = merged;
        let fields = fields
            .into_values()
            .map(|mut field| {
                field.optional = !required.contains(&field.name);
                field
            })
            .collect();
        Ok(RecordType { fields })
    }

    fn collect_fields(
        &mut self,
        root: NodeIndex,
        idx: NodeIndex,
        owner: &str,
        merged: &mut MergedFields,
        visiting: &mut Vec<NodeIndex>,
    ) -> Result<()> {
        let graph = self.graph;
        if visiting.contains(&idx) {
            let mut cycle: Vec<String> = visiting
                .iter()
                .map(|&i| graph.node(i).id.to_string())
                .collect();
            cycle.push(graph.node(idx).id.to_string());
            return Err(SchemaError::CircularReference {
                node: graph.node(root).id.to_string(),
                cycle,
            });
        }
        visiting.push(idx);

        let node = graph.node(idx);
        merged.required.extend(node.required.iter().cloned());
        match node.kind {
            NodeKind::Ref => {
                let target = self.ref_target(idx)?;
                self.collect_fields(root, target, owner, merged, visiting)?;
            }
            NodeKind::Composition => {
                if !node.one_of.is_empty() || !node.any_of.is_empty() {
                    return Err(SchemaError::unsupported(
                        "oneOf/anyOf inside allOf",
                        node.id.as_str(),
                    ));
                }
                self.merge_properties(root, idx, owner, merged)?;
                for &branch in &node.all_of {
                    self.collect_fields(root, branch, owner, merged, visiting)?;
                }
            }
            NodeKind::Object => self.merge_properties(root, idx, owner, merged)?,
            NodeKind::Any => {}
            other => {
                return Err(SchemaError::unsupported(
                    format!("allOf branch of kind {:?}", other),
                    node.id.as_str(),
                ));
            }
        }

        visiting.pop();
        Ok(())
    }

    fn merge_properties(
        &mut self,
        root: NodeIndex,
        idx: NodeIndex,
        owner: &str,
        merged: &mut MergedFields,
    ) -> Result<()> {
        let graph = self.graph;
        for (name, &prop) in &graph.node(idx).properties {
            let hint = format!("{}{}", owner, name.to_pascal_case());
            let ty = self.type_ref(prop, &hint)?;
            let description = graph.node(prop).description.clone();

            match merged.fields.get_mut(name) {
                None => {
                    merged.fields.insert(
                        name.clone(),
                        Field {
                            name: name.clone(),
                            ty,
                            optional: true,
                            description,
                        },
                    );
                }
                Some(existing) => {
                    existing.ty = unify(&existing.ty, &ty).ok_or_else(|| {
                        SchemaError::CompositionConflict {
                            field: name.to_string(),
                            node: graph.node(root).id.to_string(),
                            left: existing.ty.to_string(),
                            right: ty.to_string(),
                        }
                    })?;
                    if existing.description.is_none() {
                        existing.description = description;
                    }
                }
            }
        }
        Ok(())
    }
}

/// The narrower of two compatible field types
///
/// Types are compatible when equal, when either side is unconstrained, or
/// when one is a literal (or integer) narrowing of the other's primitive.
pub(super) fn unify(left: &TypeRef, right: &TypeRef) -> Option<TypeRef> {
    if left == right {
        return Some(left.clone());
    }
    match (left, right) {
        (TypeRef::Primitive(Primitive::Any), other) | (other, TypeRef::Primitive(Primitive::Any)) => {
            Some(other.clone())
        }
        (TypeRef::Literal(lit), TypeRef::Primitive(p))
        | (TypeRef::Primitive(p), TypeRef::Literal(lit)) => {
            let narrows = lit.primitive() == *p
                || (*p == Primitive::Number && lit.primitive() == Primitive::Integer);
            narrows.then(|| TypeRef::Literal(lit.clone()))
        }
        (TypeRef::Primitive(Primitive::Number), TypeRef::Primitive(Primitive::Integer))
        | (TypeRef::Primitive(Primitive::Integer), TypeRef::Primitive(Primitive::Number)) => {
            Some(TypeRef::Primitive(Primitive::Integer))
        }
        (TypeRef::Array(a), TypeRef::Array(b)) => unify(a, b).map(|t| TypeRef::Array(Box::new(t))),
        (TypeRef::Map(a), TypeRef::Map(b)) => unify(a, b).map(|t| TypeRef::Map(Box::new(t))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Literal;

    #[test]
    fn test_unify_compatible_types() {
        let string = TypeRef::Primitive(Primitive::String);
        let any = TypeRef::Primitive(Primitive::Any);
        let page = TypeRef::Literal(Literal::String("page".into()));

        assert_eq!(unify(&string, &string), Some(string.clone()));
        assert_eq!(unify(&any, &string), Some(string.clone()));
        assert_eq!(unify(&string, &page), Some(page.clone()));
        assert_eq!(
            unify(
                &TypeRef::Primitive(Primitive::Number),
                &TypeRef::Primitive(Primitive::Integer)
            ),
            Some(TypeRef::Primitive(Primitive::Integer))
        );
    }

    #[test]
    fn test_unify_conflicts() {
        let string = TypeRef::Primitive(Primitive::String);
        let integer = TypeRef::Primitive(Primitive::Integer);
        assert_eq!(unify(&string, &integer), None);
        assert_eq!(
            unify(
                &TypeRef::Literal(Literal::String("a".into())),
                &TypeRef::Literal(Literal::String("b".into()))
            ),
            None
        );
        assert_eq!(
            unify(&TypeRef::Named("A".into()), &TypeRef::Named("B".into())),
            None
        );
    }
}
