//! Schema graph loading and `$ref` resolution
//!
//! Every schema position in every bundle document becomes one [`SchemaNode`]
//! in a flat arena. Nodes are addressed by [`NodeIndex`] and carry a qualified
//! identifier of the form `document#/json/pointer`. References are resolved
//! to edges in a second pass; cycles stay as edges and are never expanded.

use crate::bundle::SchemaBundle;
use crate::error::{Result, SchemaError};
use serde_json::{Map, Value};
use smol_str::{SmolStr, ToSmolStr};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Index of a node in the [`SchemaGraph`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Position in the arena
    pub fn index(self) -> usize {
        self.0
    }
}

/// JSON primitive types a schema can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrimitiveKind {
    String,
    Integer,
    Number,
    Boolean,
    Null,
}

impl PrimitiveKind {
    fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "null" => Some(Self::Null),
            _ => None,
        }
    }
}

/// Coarse classification of a schema node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// `type: object`, or any node with `properties`
    Object,
    /// `type: array`
    Array,
    Primitive(PrimitiveKind),
    /// `$ref` to another node
    Ref,
    /// `allOf` / `oneOf` / `anyOf`
    Composition,
    /// Fixed literal set
    Enum,
    /// Single literal
    Const,
    /// Empty schema or `true`
    Any,
}

/// A `$ref` edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// The reference exactly as written
    pub raw: SmolStr,
    /// Resolved target, filled in by the second loading pass
    pub target: Option<NodeIndex>,
}

/// A single schema fragment
#[derive(Debug, Clone)]
pub struct SchemaNode {
    /// Qualified identifier, `document#/json/pointer`
    pub id: SmolStr,
    /// Bundle document this node was read from
    pub document: SmolStr,
    /// JSON pointer of the node inside its document (empty for the root)
    pub pointer: String,
    pub kind: NodeKind,
    /// Object properties, sorted by name
    pub properties: BTreeMap<SmolStr, NodeIndex>,
    pub required: BTreeSet<SmolStr>,
    /// Element schema for arrays
    pub items: Option<NodeIndex>,
    /// Value schema from `additionalProperties` or `patternProperties`
    pub additional: Option<NodeIndex>,
    pub reference: Option<Reference>,
    pub all_of: Vec<NodeIndex>,
    pub one_of: Vec<NodeIndex>,
    pub any_of: Vec<NodeIndex>,
    pub enum_values: Option<Vec<Value>>,
    pub enum_descriptions: Vec<SmolStr>,
    pub constant: Option<Value>,
    /// Plain-name anchor from `"$id": "#Name"`
    pub anchor: Option<SmolStr>,
    pub title: Option<SmolStr>,
    pub description: Option<String>,
    /// Whether this node sits directly under `definitions` or `$defs`
    pub is_definition: bool,
    /// The raw schema object as written
    pub raw: Value,
}

impl SchemaNode {
    /// Last JSON pointer segment, unescaped
    pub fn pointer_name(&self) -> Option<String> {
        self.pointer
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .map(unescape_pointer_segment)
    }

    /// Whether this node is the root of its document
    pub fn is_root(&self) -> bool {
        self.pointer.is_empty()
    }

    /// Whether the node carries any type information at all
    pub fn has_content(&self) -> bool {
        !matches!(self.kind, NodeKind::Any)
    }
}

/// The loaded, reference-resolved schema graph
#[derive(Debug, Clone, Default)]
pub struct SchemaGraph {
    nodes: Vec<SchemaNode>,
    by_id: BTreeMap<SmolStr, NodeIndex>,
    roots: BTreeMap<SmolStr, NodeIndex>,
    anchors: BTreeMap<(SmolStr, SmolStr), NodeIndex>,
}

impl SchemaGraph {
    /// Parse and link every document in the bundle
    pub fn load(bundle: &SchemaBundle) -> Result<Self> {
        let _span = tracing::debug_span!("load_schema_graph", documents = bundle.len()).entered();
        let mut graph = Self::default();

        for (name, text) in bundle.iter() {
            let value: Value = serde_json::from_str(text).map_err(|e| {
                SchemaError::parse_error_with_source(e, name.as_str(), text.to_string())
            })?;
            let root = graph.visit(name, String::new(), &value)?;
            graph.roots.insert(name.clone(), root);
        }

        graph.resolve_references()?;
        tracing::debug!(nodes = graph.nodes.len(), "schema graph loaded");
        Ok(graph)
    }

    /// Get a node by index
    pub fn node(&self, idx: NodeIndex) -> &SchemaNode {
        &self.nodes[idx.0]
    }

    /// Look up a node by its qualified identifier
    pub fn get(&self, id: &str) -> Option<NodeIndex> {
        self.by_id.get(id).copied()
    }

    /// Root node of a bundle document
    pub fn root(&self, document: &str) -> Option<NodeIndex> {
        self.roots.get(document).copied()
    }

    /// Iterate over all nodes in lexicographic qualified-id order
    pub fn iter(&self) -> impl Iterator<Item = (NodeIndex, &SchemaNode)> {
        self.by_id.values().map(|&idx| (idx, &self.nodes[idx.0]))
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Target of a node's `$ref`, if it has one
    pub fn ref_target(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.node(idx).reference.as_ref().and_then(|r| r.target)
    }

    /// Follow `$ref` edges until reaching a node that is not a pure reference
    ///
    /// Returns `None` when the chain loops back on itself.
    pub fn follow_refs(&self, mut idx: NodeIndex) -> Option<NodeIndex> {
        let mut seen = BTreeSet::new();
        while let Some(target) = self.ref_target(idx) {
            if !seen.insert(idx) {
                return None;
            }
            idx = target;
        }
        Some(idx)
    }

    fn push(&mut self, node: SchemaNode) -> NodeIndex {
        let idx = NodeIndex(self.nodes.len());
        self.by_id.insert(node.id.clone(), idx);
        if let Some(anchor) = &node.anchor {
            self.anchors
                .entry((node.document.clone(), anchor.clone()))
                .or_insert(idx);
        }
        self.nodes.push(node);
        idx
    }

    fn visit(&mut self, document: &SmolStr, pointer: String, value: &Value) -> Result<NodeIndex> {
        let id = format!("{}#{}", document, pointer).to_smolstr();
        let empty = Map::new();
        let obj = match value {
            Value::Object(obj) => obj,
            Value::Bool(_) => &empty,
            other => {
                return Err(SchemaError::parse(
                    document.as_str(),
                    format!("expected a schema object at {}, found {}", id, json_kind(other)),
                ));
            }
        };

        let mut node = SchemaNode {
            id,
            document: document.clone(),
            pointer: pointer.clone(),
            kind: NodeKind::Any,
            properties: BTreeMap::new(),
            required: BTreeSet::new(),
            items: None,
            additional: None,
            reference: None,
            all_of: Vec::new(),
            one_of: Vec::new(),
            any_of: Vec::new(),
            enum_values: None,
            enum_descriptions: Vec::new(),
            constant: None,
            anchor: None,
            title: obj.get("title").and_then(Value::as_str).map(SmolStr::new),
            description: obj
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
            is_definition: is_definition_pointer(&pointer),
            raw: value.clone(),
        };

        if let Some(id_value) = obj.get("$id").and_then(Value::as_str) {
            if let Some(anchor) = id_value.strip_prefix('#') {
                node.anchor = Some(SmolStr::new(anchor));
            }
        }

        if let Some(reference) = obj.get("$ref") {
            let raw = reference.as_str().ok_or_else(|| {
                SchemaError::parse(document.as_str(), format!("$ref in {} is not a string", node.id))
            })?;
            node.reference = Some(Reference {
                raw: SmolStr::new(raw),
                target: None,
            });
        }

        if let Some(required) = obj.get("required").and_then(Value::as_array) {
            node.required = required
                .iter()
                .filter_map(Value::as_str)
                .map(SmolStr::new)
                .collect();
        }

        if let Some(values) = obj.get("enum") {
            let values = values.as_array().ok_or_else(|| {
                SchemaError::parse(document.as_str(), format!("enum in {} is not an array", node.id))
            })?;
            node.enum_values = Some(values.clone());
        }
        if let Some(descriptions) = obj.get("enumDescriptions").and_then(Value::as_array) {
            node.enum_descriptions = descriptions
                .iter()
                .filter_map(Value::as_str)
                .map(SmolStr::new)
                .collect();
        }
        node.constant = obj.get("const").cloned();

        let declared = match obj.get("type") {
            None => None,
            Some(Value::String(s)) => Some(s.as_str()),
            Some(Value::Array(types)) if types.len() == 1 => types[0].as_str(),
            Some(other) => {
                return Err(SchemaError::unsupported(
                    format!("type declaration {}", other),
                    node.id.as_str(),
                ));
            }
        };

        // Children are visited before the parent is pushed, so indices of a
        // subtree are contiguous and the parent's fields can refer to them.
        let mut children = NodeChildren::default();
        for keyword in ["definitions", "$defs"] {
            if let Some(defs) = obj.get(keyword).and_then(Value::as_object) {
                for (name, schema) in defs {
                    let child_ptr = format!("{}/{}/{}", pointer, keyword, escape_pointer_segment(name));
                    self.visit(document, child_ptr, schema)?;
                }
            }
        }
        if let Some(props) = obj.get("properties").and_then(Value::as_object) {
            for (name, schema) in props {
                let child_ptr = format!("{}/properties/{}", pointer, escape_pointer_segment(name));
                let child = self.visit(document, child_ptr, schema)?;
                children.properties.insert(SmolStr::new(name), child);
            }
        }
        if let Some(items) = obj.get("items") {
            if items.is_object() || items.is_boolean() {
                children.items = Some(self.visit(document, format!("{}/items", pointer), items)?);
            }
        }
        match obj.get("additionalProperties") {
            Some(schema @ Value::Object(_)) => {
                children.additional =
                    Some(self.visit(document, format!("{}/additionalProperties", pointer), schema)?);
            }
            _ => {
                if let Some(patterns) = obj.get("patternProperties").and_then(Value::as_object) {
                    // Patterns only ever constrain keys; the first value schema stands for all.
                    for (pattern, schema) in patterns {
                        let child_ptr = format!(
                            "{}/patternProperties/{}",
                            pointer,
                            escape_pointer_segment(pattern)
                        );
                        let child = self.visit(document, child_ptr, schema)?;
                        children.additional.get_or_insert(child);
                    }
                }
            }
        }
        for keyword in ["allOf", "oneOf", "anyOf"] {
            if let Some(branches) = obj.get(keyword) {
                let branches = branches.as_array().ok_or_else(|| {
                    SchemaError::parse(
                        document.as_str(),
                        format!("{} in {} is not an array", keyword, node.id),
                    )
                })?;
                let mut visited = Vec::with_capacity(branches.len());
                for (i, schema) in branches.iter().enumerate() {
                    visited.push(self.visit(document, format!("{}/{}/{}", pointer, keyword, i), schema)?);
                }
                match keyword {
                    "allOf" => children.all_of = visited,
                    "oneOf" => children.one_of = visited,
                    _ => children.any_of = visited,
                }
            }
        }

        node.properties = children.properties;
        node.items = children.items;
        node.additional = children.additional;
        node.all_of = children.all_of;
        node.one_of = children.one_of;
        node.any_of = children.any_of;

        node.kind = if node.reference.is_some() {
            NodeKind::Ref
        } else if !node.all_of.is_empty() || !node.one_of.is_empty() || !node.any_of.is_empty() {
            NodeKind::Composition
        } else if node.constant.is_some() {
            NodeKind::Const
        } else if node.enum_values.is_some() {
            NodeKind::Enum
        } else {
            match declared {
                Some("object") => NodeKind::Object,
                Some("array") => NodeKind::Array,
                Some(other) => match PrimitiveKind::from_type_name(other) {
                    Some(p) => NodeKind::Primitive(p),
                    None => {
                        return Err(SchemaError::unsupported(
                            format!("type `{}`", other),
                            node.id.as_str(),
                        ));
                    }
                },
                None if !node.properties.is_empty() || node.additional.is_some() => {
                    NodeKind::Object
                }
                None if node.items.is_some() => NodeKind::Array,
                None => NodeKind::Any,
            }
        };

        Ok(self.push(node))
    }

    fn resolve_references(&mut self) -> Result<()> {
        for i in 0..self.nodes.len() {
            let Some(reference) = &self.nodes[i].reference else {
                continue;
            };
            let raw = reference.raw.clone();
            let document = self.nodes[i].document.clone();
            let target = self
                .resolve(&document, &raw)
                .ok_or_else(|| SchemaError::unresolved(raw.as_str(), self.nodes[i].id.as_str()))?;
            tracing::trace!(from = %self.nodes[i].id, to = %self.nodes[target.0].id, "resolved $ref");
            if let Some(reference) = self.nodes[i].reference.as_mut() {
                reference.target = Some(target);
            }
        }
        Ok(())
    }

    /// Resolve a reference string written inside `document`
    pub fn resolve(&self, document: &str, reference: &str) -> Option<NodeIndex> {
        let (doc_part, fragment) = reference.split_once('#').unwrap_or((reference, ""));
        let explicit_doc = !doc_part.is_empty();
        let target_doc = if explicit_doc {
            self.resolve_document(document, doc_part)?
        } else {
            SmolStr::new(document)
        };

        if fragment.is_empty() {
            return self.roots.get(&target_doc).copied();
        }
        if fragment.starts_with('/') {
            return self.get(&format!("{}#{}", target_doc, fragment));
        }

        let anchor = SmolStr::new(fragment);
        if let Some(&idx) = self.anchors.get(&(target_doc.clone(), anchor.clone())) {
            return Some(idx);
        }
        if explicit_doc {
            return None;
        }
        // Bare anchors may live in any document of the bundle
        self.anchors
            .iter()
            .find(|((_, a), _)| *a == anchor)
            .map(|(_, &idx)| idx)
    }

    fn resolve_document(&self, from: &str, name: &str) -> Option<SmolStr> {
        if self.roots.contains_key(name) {
            return Some(SmolStr::new(name));
        }
        if let Some((dir, _)) = from.rsplit_once('/') {
            let joined = format!("{}/{}", dir, name.trim_start_matches("./"));
            if self.roots.contains_key(joined.as_str()) {
                return Some(joined.to_smolstr());
            }
        }
        // Absolute URIs: match on the final path segment when it is unambiguous
        let base = name.rsplit('/').next().unwrap_or(name);
        let mut candidates = self
            .roots
            .keys()
            .filter(|doc| doc.rsplit('/').next() == Some(base));
        match (candidates.next(), candidates.next()) {
            (Some(doc), None) => Some(doc.clone()),
            _ => None,
        }
    }
}

#[derive(Default)]
struct NodeChildren {
    properties: BTreeMap<SmolStr, NodeIndex>,
    items: Option<NodeIndex>,
    additional: Option<NodeIndex>,
    all_of: Vec<NodeIndex>,
    one_of: Vec<NodeIndex>,
    any_of: Vec<NodeIndex>,
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

fn is_definition_pointer(pointer: &str) -> bool {
    let mut segments = pointer.rsplit('/');
    segments.next();
    matches!(segments.next(), Some("definitions") | Some("$defs"))
}

/// Escape a JSON pointer segment per RFC 6901
pub fn escape_pointer_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Unescape a JSON pointer segment per RFC 6901
pub fn unescape_pointer_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
