//! The decoded form of one archive

use bytes::Bytes;
use serde_json::Value;
use sketch_schema::binding::{Data, Record};
use smol_str::SmolStr;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{ArchiveError, Result};
use crate::layout::{DOCUMENT_PATH, EntryKind, page_path};
use crate::references::{ReferenceConvention, resolve_asset};

/// A document archive, decoded and held in memory
///
/// The root document keeps its page list as reference objects; page bodies
/// live in [`pages`](Self::pages), keyed by identifier. Assets are kept as
/// raw bytes keyed by their archive path.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentGraph {
    document: Record,
    meta: Record,
    user: Option<Data>,
    pages: BTreeMap<SmolStr, Record>,
    workspace: BTreeMap<SmolStr, Value>,
    assets: BTreeMap<SmolStr, Bytes>,
    references: ReferenceConvention,
}

impl DocumentGraph {
    /// Create a document with no pages, workspace documents or assets
    pub fn new(document: Record, meta: Record) -> Self {
        Self::with_references(document, meta, ReferenceConvention::default())
    }

    /// Create an empty document using a custom reference convention
    pub fn with_references(document: Record, meta: Record, references: ReferenceConvention) -> Self {
        Self {
            document,
            meta,
            user: None,
            pages: BTreeMap::new(),
            workspace: BTreeMap::new(),
            assets: BTreeMap::new(),
            references,
        }
    }

    /// The root document
    pub fn document(&self) -> &Record {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Record {
        &mut self.document
    }

    pub fn meta(&self) -> &Record {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut Record {
        &mut self.meta
    }

    /// Per-user state, typed when the archive options name a user type
    pub fn user(&self) -> Option<&Data> {
        self.user.as_ref()
    }

    pub fn set_user(&mut self, user: Option<Data>) {
        self.user = user;
    }

    /// Page bodies by identifier
    pub fn pages(&self) -> &BTreeMap<SmolStr, Record> {
        &self.pages
    }

    pub fn page(&self, id: &str) -> Option<&Record> {
        self.pages.get(id)
    }

    pub fn page_mut(&mut self, id: &str) -> Option<&mut Record> {
        self.pages.get_mut(id)
    }

    /// Named workspace documents, kept as plain JSON
    pub fn workspace(&self) -> &BTreeMap<SmolStr, Value> {
        &self.workspace
    }

    pub fn workspace_mut(&mut self) -> &mut BTreeMap<SmolStr, Value> {
        &mut self.workspace
    }

    /// Binary entries by archive path
    pub fn assets(&self) -> &BTreeMap<SmolStr, Bytes> {
        &self.assets
    }

    pub fn asset(&self, path: &str) -> Option<&Bytes> {
        self.assets.get(path)
    }

    /// Add or replace a binary entry, returning the previous contents
    ///
    /// Paths that name a JSON entry, such as `pages/<id>.json`, are rejected
    /// by [`validate`](Self::validate).
    pub fn insert_asset(&mut self, path: impl Into<SmolStr>, data: impl Into<Bytes>) -> Option<Bytes> {
        self.assets.insert(path.into(), data.into())
    }

    pub fn remove_asset(&mut self, path: &str) -> Option<Bytes> {
        self.assets.remove(path)
    }

    pub fn references(&self) -> &ReferenceConvention {
        &self.references
    }

    /// Identifiers listed in the root document's page list, in list order
    pub fn page_ids(&self) -> Result<Vec<SmolStr>> {
        let refs = &self.references;
        let Some(list) = self.document.get(&refs.pages_field) else {
            return Ok(Vec::new());
        };
        let items = list.as_array().ok_or_else(|| {
            ArchiveError::invalid_document(DOCUMENT_PATH, format!("{} is not a list", refs.pages_field))
        })?;

        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_record()
                    .and_then(|record| refs.read_record(record))
                    .and_then(|file_ref| refs.page_id(&file_ref.path).map(SmolStr::new))
                    .ok_or_else(|| {
                        ArchiveError::invalid_document(
                            DOCUMENT_PATH,
                            format!("{}[{}] is not a page reference", refs.pages_field, i),
                        )
                    })
            })
            .collect()
    }

    /// Add a page and append it to the root document's page list
    ///
    /// The identifier is read from the page itself. Replacing an existing page
    /// keeps its position in the list.
    pub fn insert_page(&mut self, page: Record) -> Result<SmolStr> {
        let id = page
            .get_str(&self.references.page_id_field)
            .map(SmolStr::new)
            .ok_or_else(|| {
                ArchiveError::invalid_document(
                    page_path("<new>"),
                    format!("page has no {}", self.references.page_id_field),
                )
            })?;

        if !self.page_ids()?.contains(&id) {
            let page_ref = Data::Record(self.references.page_ref(&id));
            let pages_field = self.references.pages_field.clone();
            match self.document.get_mut(&pages_field) {
                Some(Data::Array(items)) => items.push(page_ref),
                Some(_) => {
                    return Err(ArchiveError::invalid_document(
                        DOCUMENT_PATH,
                        format!("{} is not a list", pages_field),
                    ));
                }
                None => {
                    self.document.insert(pages_field, Data::Array(vec![page_ref]));
                }
            }
        }
        self.pages.insert(id.clone(), page);
        Ok(id)
    }

    /// Store a page body under `id` without touching the page list
    pub fn insert_page_body(&mut self, id: impl Into<SmolStr>, page: Record) -> Option<Record> {
        self.pages.insert(id.into(), page)
    }

    /// Remove a page and its entry in the root document's page list
    pub fn remove_page(&mut self, id: &str) -> Option<Record> {
        let refs = &self.references;
        if let Some(Data::Array(items)) = self.document.get_mut(&refs.pages_field) {
            items.retain(|item| {
                item.as_record()
                    .and_then(|record| refs.read_record(record))
                    .and_then(|file_ref| refs.page_id(&file_ref.path).map(|p| p != id))
                    .unwrap_or(true)
            });
        }
        self.pages.remove(id)
    }

    /// Page bodies stored without being listed in the root document
    pub fn orphan_pages(&self) -> Result<Vec<SmolStr>> {
        let listed: BTreeSet<SmolStr> = self.page_ids()?.into_iter().collect();
        Ok(self
            .pages
            .keys()
            .filter(|id| !listed.contains(*id))
            .cloned()
            .collect())
    }

    /// Check that every listed page has a body
    pub fn validate_pages(&self) -> Result<()> {
        for id in self.page_ids()? {
            if !self.pages.contains_key(&id) {
                return Err(ArchiveError::missing_page(&id));
            }
        }
        Ok(())
    }

    /// Every asset reference in the graph, sorted
    pub fn asset_refs(&self) -> BTreeSet<SmolStr> {
        let refs = &self.references;
        let mut out = BTreeSet::new();
        refs.collect_record_asset_refs(&self.document, &mut out);
        refs.collect_record_asset_refs(&self.meta, &mut out);
        if let Some(user) = &self.user {
            refs.collect_asset_refs(user, &mut out);
        }
        for page in self.pages.values() {
            refs.collect_record_asset_refs(page, &mut out);
        }
        for value in self.workspace.values() {
            refs.collect_json_asset_refs(value, &mut out);
        }
        out
    }

    /// Check that every asset reference resolves to an asset
    pub fn validate_assets(&self) -> Result<()> {
        for reference in self.asset_refs() {
            if resolve_asset(&self.assets, &reference).is_none() {
                return Err(ArchiveError::missing_asset(&reference));
            }
        }
        Ok(())
    }

    /// Check that no asset sits at a path reserved for a JSON entry
    pub fn validate_asset_paths(&self) -> Result<()> {
        match self.assets.keys().find(|path| EntryKind::classify(path.as_str()).is_json()) {
            Some(path) => Err(ArchiveError::invalid_document(
                path.clone(),
                "asset path is reserved for a JSON entry",
            )),
            None => Ok(()),
        }
    }

    /// Both document invariants, plus asset path checks
    pub fn validate(&self) -> Result<()> {
        self.validate_asset_paths()?;
        self.validate_pages()?;
        self.validate_assets()
    }

    /// Identifier for the whole document: XOR of the listed page UUIDs, as
    /// 32 uppercase hex digits
    pub fn object_id(&self) -> Result<SmolStr> {
        let mut acc: u128 = 0;
        for id in self.page_ids()? {
            let page = self.pages.get(&id).ok_or_else(|| ArchiveError::missing_page(&id))?;
            let object_id = page.get_str(&self.references.page_id_field).unwrap_or(id.as_str());
            acc ^= parse_uuid(object_id).ok_or_else(|| {
                ArchiveError::invalid_document(
                    page_path(&id),
                    format!("{} is not a UUID", object_id),
                )
            })?;
        }
        Ok(smol_str::format_smolstr!("{:032X}", acc))
    }
}

/// Parse a hyphenated or plain hex UUID
fn parse_uuid(s: &str) -> Option<u128> {
    let hex: String = s.chars().filter(|c| *c != '-').collect();
    if hex.len() != 32 {
        return None;
    }
    u128::from_str_radix(&hex, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArchiveErrorKind;

    fn page(id: &str) -> Record {
        Record::new("Page")
            .with("_class", Data::from("page"))
            .with("do_objectID", Data::from(id))
            .with("name", Data::from("Page"))
            .with("layers", Data::Array(Vec::new()))
    }

    fn graph() -> DocumentGraph {
        let document = Record::new("Document")
            .with("_class", Data::from("document"))
            .with("do_objectID", Data::from("D1"))
            .with("pages", Data::Array(Vec::new()));
        DocumentGraph::new(document, Record::new("Meta"))
    }

    #[test]
    fn test_inserting_pages_updates_the_page_list() {
        let mut graph = graph();
        let a = graph.insert_page(page("A")).expect("insert");
        graph.insert_page(page("B")).expect("insert");
        graph.insert_page(page("A")).expect("replace");

        assert_eq!(a, "A");
        assert_eq!(graph.page_ids().expect("ids"), ["A", "B"]);
        graph.validate_pages().expect("valid");

        assert!(graph.remove_page("A").is_some());
        assert_eq!(graph.page_ids().expect("ids"), ["B"]);
        assert!(graph.page("A").is_none());
    }

    #[test]
    fn test_listed_page_without_body_is_missing() {
        let mut graph = graph();
        graph.insert_page(page("A")).expect("insert");
        graph.pages.remove("A");

        let err = graph.validate_pages().unwrap_err();
        assert_eq!(err.kind(), &ArchiveErrorKind::MissingPage);
        assert_eq!(err.entry(), Some("pages/A.json"));
    }

    #[test]
    fn test_unlisted_pages_are_orphans() {
        let mut graph = graph();
        graph.insert_page(page("A")).expect("insert");
        graph.pages.insert("Z".into(), page("Z"));
        assert_eq!(graph.orphan_pages().expect("orphans"), ["Z"]);
        graph.validate_pages().expect("orphans are allowed");
    }

    #[test]
    fn test_asset_references_must_resolve() {
        let mut graph = graph();
        let image = Record::new("FileRef")
            .with("_class", Data::from("MSJSONFileReference"))
            .with("_ref_class", Data::from("MSImageData"))
            .with("_ref", Data::from("images/photo"));
        let mut body = page("A");
        body.insert("image", Data::Record(image));
        graph.insert_page(body).expect("insert");

        let err = graph.validate_assets().unwrap_err();
        assert_eq!(err.kind(), &ArchiveErrorKind::MissingAsset);
        assert_eq!(err.entry(), Some("images/photo"));

        graph.insert_asset("images/photo.png", Bytes::from_static(b"\x89PNG"));
        graph.validate().expect("valid");
    }

    #[test]
    fn test_object_id_xors_page_uuids() {
        let mut graph = graph();
        assert_eq!(graph.object_id().expect("id"), "00000000000000000000000000000000");

        graph
            .insert_page(page("00000000-0000-0000-0000-0000000000F0"))
            .expect("insert");
        graph
            .insert_page(page("00000000-0000-0000-0000-00000000000f"))
            .expect("insert");
        assert_eq!(graph.object_id().expect("id"), "000000000000000000000000000000FF");

        graph.insert_page(page("not-a-uuid")).expect("insert");
        assert_eq!(
            graph.object_id().unwrap_err().kind(),
            &ArchiveErrorKind::InvalidDocument
        );
    }

    #[test]
    fn test_assets_cannot_take_json_entry_paths() {
        let mut graph = graph();
        graph.insert_asset("images/logo.png", Bytes::from_static(b"\x89PNG"));
        graph.validate_asset_paths().expect("ordinary asset path");

        for reserved in ["pages/X.json", "document.json", "workspace/state.json"] {
            let mut graph = graph.clone();
            graph.insert_asset(reserved, Bytes::from_static(b"\x89PNG"));
            let err = graph.validate().unwrap_err();
            assert_eq!(err.kind(), &ArchiveErrorKind::InvalidDocument);
            assert_eq!(err.entry(), Some(reserved));
        }
    }
}
