use super::Compiler;
use crate::graph::{NodeIndex, SchemaNode};
use heck::ToPascalCase;
use smol_str::{SmolStr, format_smolstr};
use std::collections::BTreeSet;

impl<'g> Compiler<'g> {
    /// Assign names to document roots, definitions and `$ref` targets
    ///
    /// Returned in lexicographic order of qualified identifiers, which is also
    /// the order names are handed out in, so collisions resolve the same way
    /// on every run.
    pub(super) fn reserve_names(&mut self) -> Vec<(NodeIndex, SmolStr)> {
        let graph = self.graph;
        let ref_targets: BTreeSet<NodeIndex> = graph
            .iter()
            .filter_map(|(idx, _)| graph.ref_target(idx))
            .collect();

        let mut reserved = Vec::new();
        for (idx, node) in graph.iter() {
            let named = (node.is_root() && node.has_content())
                || node.is_definition
                || ref_targets.contains(&idx);
            if !named {
                continue;
            }
            let name = self.claim(&base_name(node));
            self.names.insert(idx, name.clone());
            reserved.push((idx, name));
        }
        reserved
    }

    /// Name an anonymous node that needs its own catalog entry
    pub(super) fn hoist(&mut self, idx: NodeIndex, hint: &str) -> SmolStr {
        let name = self.claim(&sanitize_type_name(hint));
        tracing::trace!(node = %self.graph.node(idx).id, name = %name, "hoisted inline type");
        self.names.insert(idx, name.clone());
        name
    }

    /// Take `base`, or `base2`, `base3`, ... if it is already taken
    fn claim(&mut self, base: &str) -> SmolStr {
        let mut candidate = SmolStr::new(base);
        let mut suffix = 2;
        while self.taken.contains(&candidate) {
            candidate = format_smolstr!("{}{}", base, suffix);
            suffix += 1;
        }
        self.taken.insert(candidate.clone());
        candidate
    }
}

/// Preferred name for a node: anchor, then title, then pointer segment, then document stem
fn base_name(node: &SchemaNode) -> String {
    let raw = node
        .anchor
        .as_ref()
        .map(|a| a.to_string())
        .or_else(|| node.title.as_ref().map(|t| t.to_string()))
        .or_else(|| node.pointer_name())
        .unwrap_or_else(|| document_stem(&node.document).to_string());
    sanitize_type_name(&raw.to_pascal_case())
}

/// `nested/file-format.schema.json` → `file-format`
pub(crate) fn document_stem(document: &str) -> &str {
    let file = document.rsplit('/').next().unwrap_or(document);
    let file = file.strip_suffix(".json").unwrap_or(file);
    file.strip_suffix(".schema").unwrap_or(file)
}

/// Make a PascalCase string usable as a Rust type name
fn sanitize_type_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    match cleaned.chars().next() {
        None => "Unnamed".to_string(),
        Some(c) if c.is_ascii_digit() => format!("T{}", cleaned),
        _ if cleaned == "Self" => "SelfType".to_string(),
        _ => cleaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_stem() {
        assert_eq!(document_stem("page.schema.json"), "page");
        assert_eq!(document_stem("nested/file-format.schema.json"), "file-format");
        assert_eq!(document_stem("plain.json"), "plain");
    }

    #[test]
    fn test_sanitize_type_name() {
        assert_eq!(sanitize_type_name("Rect"), "Rect");
        assert_eq!(sanitize_type_name("3dTransform"), "T3dTransform");
        assert_eq!(sanitize_type_name("Self"), "SelfType");
        assert_eq!(sanitize_type_name(""), "Unnamed");
    }
}
