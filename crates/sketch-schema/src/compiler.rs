//! Schema graph → type catalog compilation
//!
//! The compiler runs in three passes over the [`SchemaGraph`]:
//!
//! 1. Reserve a catalog name for every named node (document roots,
//!    `definitions`/`$defs` entries and every `$ref` target), visiting nodes
//!    in lexicographic order of their qualified identifiers.
//! 2. Compile each named node. References to named nodes become
//!    [`TypeRef::Named`] without looking at the target, which is what makes
//!    recursive schemas compile in a single pass. Anonymous objects, enums and
//!    compositions are hoisted into their own entries.
//! 3. Resolve `oneOf`/`anyOf` unions once every record exists, then validate
//!    the catalog as a whole.

mod compose;
mod names;
mod unions;

use crate::catalog::{
    CatalogEntry, EnumType, Field, Literal, Primitive, RecordType, ResolvedType, TypeCatalog,
    TypeRef,
};
use crate::error::{Result, SchemaError};
use crate::graph::{NodeIndex, NodeKind, PrimitiveKind, SchemaGraph};
use heck::ToPascalCase;
use smol_str::SmolStr;
use std::collections::{BTreeMap, BTreeSet};

/// Compile a loaded schema graph into a type catalog
pub fn compile(graph: &SchemaGraph) -> Result<TypeCatalog> {
    Compiler::new(graph).run()
}

/// State for one compilation run
pub struct Compiler<'g> {
    graph: &'g SchemaGraph,
    /// Catalog name assigned to each named or hoisted node
    names: BTreeMap<NodeIndex, SmolStr>,
    taken: BTreeSet<SmolStr>,
    catalog: TypeCatalog,
    pending_unions: Vec<unions::PendingUnion>,
}

impl<'g> Compiler<'g> {
    pub fn new(graph: &'g SchemaGraph) -> Self {
        Self {
            graph,
            names: BTreeMap::new(),
            taken: BTreeSet::new(),
            catalog: TypeCatalog::new(),
            pending_unions: Vec::new(),
        }
    }

    /// Run all passes and return the finished catalog
    pub fn run(mut self) -> Result<TypeCatalog> {
        let _span = tracing::debug_span!("compile_catalog", nodes = self.graph.len()).entered();

        let reserved = self.reserve_names();
        tracing::debug!(named = reserved.len(), "reserved catalog names");

        for (idx, name) in reserved {
            self.compile_named(idx, name)?;
        }

        self.finish_unions()?;
        self.validate()?;
        tracing::debug!(types = self.catalog.len(), "compiled type catalog");
        Ok(self.catalog)
    }

    /// Compile a node that owns a catalog entry
    fn compile_named(&mut self, idx: NodeIndex, name: SmolStr) -> Result<()> {
        let graph = self.graph;
        let node = graph.node(idx);
        tracing::trace!(node = %node.id, name = %name, "compiling named type");

        let ty = match node.kind {
            NodeKind::Ref => {
                let target = self.ref_target(idx)?;
                ResolvedType::Alias {
                    target: self.type_ref(target, &name)?,
                }
            }
            NodeKind::Composition => {
                if let Some(single) = self.single_branch(idx) {
                    ResolvedType::Alias {
                        target: self.type_ref(single, &name)?,
                    }
                } else if !node.all_of.is_empty() {
                    if !node.one_of.is_empty() || !node.any_of.is_empty() {
                        return Err(SchemaError::unsupported(
                            "allOf combined with oneOf/anyOf on one node",
                            node.id.as_str(),
                        ));
                    }
                    ResolvedType::Record(self.merge_all_of(idx, &name)?)
                } else {
                    // Unions are finished after every record exists
                    self.defer_union(idx, name)?;
                    return Ok(());
                }
            }
            NodeKind::Object => match (node.properties.is_empty(), node.additional) {
                (true, Some(additional)) => ResolvedType::Alias {
                    target: TypeRef::Map(Box::new(
                        self.type_ref(additional, &format!("{}Value", name))?,
                    )),
                },
                _ => ResolvedType::Record(self.record_fields(idx, &name)?),
            },
            NodeKind::Array => ResolvedType::Array {
                element: self.items_ref(idx, &name)?,
            },
            NodeKind::Enum => ResolvedType::Enum(self.enum_type(idx)?),
            NodeKind::Const => ResolvedType::Alias {
                target: TypeRef::Literal(self.const_literal(idx)?),
            },
            NodeKind::Primitive(p) => ResolvedType::Alias {
                target: TypeRef::Primitive(primitive(p)),
            },
            NodeKind::Any => ResolvedType::Alias {
                target: TypeRef::Primitive(Primitive::Any),
            },
        };

        self.catalog.insert(CatalogEntry {
            name,
            origin: node.id.clone(),
            description: node.description.clone(),
            ty,
        });
        Ok(())
    }

    /// Type expression for a node appearing inside another type
    ///
    /// `hint` is the name a hoisted type would get.
    fn type_ref(&mut self, idx: NodeIndex, hint: &str) -> Result<TypeRef> {
        if let Some(name) = self.names.get(&idx) {
            return Ok(TypeRef::Named(name.clone()));
        }
        if let Some(single) = self.single_branch(idx) {
            return self.type_ref(single, hint);
        }

        let graph = self.graph;
        let node = graph.node(idx);
        match node.kind {
            NodeKind::Ref => {
                let target = self.ref_target(idx)?;
                self.type_ref(target, hint)
            }
            NodeKind::Primitive(p) => Ok(TypeRef::Primitive(primitive(p))),
            NodeKind::Any => Ok(TypeRef::Primitive(Primitive::Any)),
            NodeKind::Const => Ok(TypeRef::Literal(self.const_literal(idx)?)),
            NodeKind::Enum if node.enum_values.as_ref().is_some_and(|v| v.len() == 1) => {
                let enum_type = self.enum_type(idx)?;
                Ok(TypeRef::Literal(enum_type.values[0].clone()))
            }
            NodeKind::Array => Ok(TypeRef::Array(Box::new(self.items_ref(idx, hint)?))),
            NodeKind::Object if node.properties.is_empty() => {
                let value = match node.additional {
                    Some(additional) => self.type_ref(additional, &format!("{}Value", hint))?,
                    None => TypeRef::Primitive(Primitive::Any),
                };
                Ok(TypeRef::Map(Box::new(value)))
            }
            NodeKind::Object | NodeKind::Enum | NodeKind::Composition => {
                let name = self.hoist(idx, hint);
                self.compile_named(idx, name.clone())?;
                Ok(TypeRef::Named(name))
            }
        }
    }

    fn ref_target(&self, idx: NodeIndex) -> Result<NodeIndex> {
        self.graph.ref_target(idx).ok_or_else(|| {
            let node = self.graph.node(idx);
            let raw = node.reference.as_ref().map(|r| r.raw.as_str()).unwrap_or_default();
            SchemaError::unresolved(raw, node.id.as_str())
        })
    }

    fn items_ref(&mut self, idx: NodeIndex, owner: &str) -> Result<TypeRef> {
        let items = self.graph.node(idx).items;
        match items {
            Some(items) => self.type_ref(items, &format!("{}Item", owner)),
            None => Ok(TypeRef::Primitive(Primitive::Any)),
        }
    }

    /// Fields of a plain object node
    fn record_fields(&mut self, idx: NodeIndex, owner: &str) -> Result<RecordType> {
        let graph = self.graph;
        let node = graph.node(idx);
        let mut fields = Vec::with_capacity(node.properties.len());
        for (field_name, &prop) in &node.properties {
            let hint = format!("{}{}", owner, field_name.to_pascal_case());
            let ty = self.type_ref(prop, &hint)?;
            fields.push(Field {
                name: field_name.clone(),
                ty,
                optional: !node.required.contains(field_name),
                description: graph.node(prop).description.clone(),
            });
        }
        Ok(RecordType { fields })
    }

    fn enum_type(&self, idx: NodeIndex) -> Result<EnumType> {
        let node = self.graph.node(idx);
        let raw = node.enum_values.as_deref().unwrap_or_default();
        let mut values = Vec::with_capacity(raw.len());
        let mut seen = BTreeSet::new();
        for value in raw {
            let literal = Literal::from_json(value).ok_or_else(|| {
                SchemaError::unsupported(format!("enum value {}", value), node.id.as_str())
            })?;
            if seen.insert(literal.clone()) {
                values.push(literal);
            }
        }
        let descriptions = if node.enum_descriptions.len() == values.len() {
            node.enum_descriptions.clone()
        } else {
            Vec::new()
        };
        Ok(EnumType {
            values,
            descriptions,
        })
    }

    fn const_literal(&self, idx: NodeIndex) -> Result<Literal> {
        let node = self.graph.node(idx);
        let value = node.constant.as_ref().unwrap_or(&serde_json::Value::Null);
        Literal::from_json(value).ok_or_else(|| {
            SchemaError::unsupported(format!("const value {}", value), node.id.as_str())
        })
    }

    /// A composition that only wraps one branch, e.g. `{"allOf": [{"$ref": ...}]}`
    fn single_branch(&self, idx: NodeIndex) -> Option<NodeIndex> {
        let node = self.graph.node(idx);
        if node.kind != NodeKind::Composition || !node.properties.is_empty() {
            return None;
        }
        match (node.all_of.as_slice(), node.one_of.as_slice(), node.any_of.as_slice()) {
            ([single], [], []) | ([], [single], []) | ([], [], [single]) => Some(*single),
            _ => None,
        }
    }

    /// Final consistency checks: no dangling names, no cycles made only of
    /// arrays and aliases
    fn validate(&self) -> Result<()> {
        for entry in self.catalog.iter() {
            for name in entry.ty.named_refs() {
                if !self.catalog.contains(name) {
                    return Err(SchemaError::unresolved(name.as_str(), entry.origin.as_str()));
                }
            }
        }

        for entry in self.catalog.iter().filter(|e| is_transparent(&e.ty)) {
            if let Some(cycle) = self.transparent_cycle(&entry.name) {
                return Err(SchemaError::CircularReference {
                    node: entry.origin.to_string(),
                    cycle,
                });
            }
        }
        Ok(())
    }

    /// A path from `start` back to itself that never passes through a record
    /// or union
    fn transparent_cycle(&self, start: &SmolStr) -> Option<Vec<String>> {
        let mut path = vec![start.clone()];
        let mut visited = BTreeSet::new();
        self.extend_transparent_path(start, &mut path, &mut visited)
            .then(|| path.iter().map(|name| name.to_string()).collect())
    }

    fn extend_transparent_path(
        &self,
        start: &SmolStr,
        path: &mut Vec<SmolStr>,
        visited: &mut BTreeSet<SmolStr>,
    ) -> bool {
        let Some(current) = path.last().and_then(|name| self.catalog.get(name.as_str())) else {
            return false;
        };
        if !is_transparent(&current.ty) {
            return false;
        }
        for next in current.ty.named_refs() {
            if next == start {
                path.push(next.clone());
                return true;
            }
            if visited.insert(next.clone()) {
                path.push(next.clone());
                if self.extend_transparent_path(start, path, visited) {
                    return true;
                }
                path.pop();
            }
        }
        false
    }
}

/// Entries emitted as `pub type`, which cannot refer to themselves
fn is_transparent(ty: &ResolvedType) -> bool {
    matches!(ty, ResolvedType::Array { .. } | ResolvedType::Alias { .. })
}

fn primitive(kind: PrimitiveKind) -> Primitive {
    match kind {
        PrimitiveKind::String => Primitive::String,
        PrimitiveKind::Integer => Primitive::Integer,
        PrimitiveKind::Number => Primitive::Number,
        PrimitiveKind::Boolean => Primitive::Boolean,
        PrimitiveKind::Null => Primitive::Null,
    }
}
