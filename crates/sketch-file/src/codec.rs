//! Opening and saving document archives

use serde_json::Value;
use sketch_schema::binding::{Bindings, Data, Record};
use smol_str::SmolStr;
use std::path::Path;

use crate::archive::{ArchiveEntry, EntryContent, read_entries, write_entries};
use crate::document::DocumentGraph;
use crate::error::{ArchiveError, Result};
use crate::layout::{
    ArchiveOptions, AssetCheck, DOCUMENT_PATH, EntryKind, META_PATH, USER_PATH, entry_stem,
    page_path, workspace_path,
};

/// Reads and writes document archives, checking every JSON entry against a
/// type catalog
///
/// The codec keeps no state between calls; the [`DocumentGraph`] returned by
/// [`open`](Self::open) belongs to the caller.
#[derive(Debug, Clone)]
pub struct ArchiveCodec {
    bindings: Bindings,
    options: ArchiveOptions,
}

impl ArchiveCodec {
    pub fn new(bindings: Bindings, options: ArchiveOptions) -> Self {
        Self { bindings, options }
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn options(&self) -> &ArchiveOptions {
        &self.options
    }

    /// Decode an archive into a document graph
    ///
    /// Fails on the first malformed entry, naming it. Every page listed in
    /// the root document must be present; asset references are checked here
    /// unless the options defer them to [`save`](Self::save).
    pub fn open(&self, bytes: &[u8]) -> Result<DocumentGraph> {
        let _span = tracing::debug_span!("open_archive", bytes = bytes.len()).entered();

        let mut document = None;
        let mut meta = None;
        let mut user = None;
        let mut pages = Vec::new();
        let mut workspace = Vec::new();
        let mut assets = Vec::new();

        for entry in read_entries(bytes)? {
            match (entry.kind, entry.content) {
                (EntryKind::Document, EntryContent::Json(value)) => {
                    document = Some(self.decode_record(&entry.path, &value, &self.options.document_type)?);
                }
                (EntryKind::Meta, EntryContent::Json(value)) => {
                    meta = Some(self.decode_record(&entry.path, &value, &self.options.meta_type)?);
                }
                (EntryKind::User, EntryContent::Json(value)) => {
                    user = Some(self.decode_user(&entry.path, value)?);
                }
                (EntryKind::Page, EntryContent::Json(value)) => {
                    let page = self.decode_record(&entry.path, &value, &self.options.page_type)?;
                    let id = SmolStr::new(entry_stem(&entry.path));
                    if page.get_str(&self.options.references.page_id_field) != Some(id.as_str()) {
                        tracing::warn!(entry = %entry.path, "page identifier differs from its file name");
                    }
                    pages.push((id, page));
                }
                (EntryKind::Workspace, EntryContent::Json(value)) => {
                    workspace.push((SmolStr::new(entry_stem(&entry.path)), value));
                }
                (kind, EntryContent::Binary(data)) => {
                    tracing::debug!(entry = %entry.path, ?kind, "keeping entry as asset");
                    assets.push((entry.path, data));
                }
                (kind, EntryContent::Json(_)) => {
                    return Err(ArchiveError::invalid_document(
                        entry.path,
                        format!("unexpected JSON content for {:?} entry", kind),
                    ));
                }
            }
        }

        let document = document.ok_or_else(|| ArchiveError::missing_entry(DOCUMENT_PATH))?;
        let meta = meta.ok_or_else(|| ArchiveError::missing_entry(META_PATH))?;

        let mut graph =
            DocumentGraph::with_references(document, meta, self.options.references.clone());
        graph.set_user(user);
        for (id, page) in pages {
            graph.insert_page_body(id, page);
        }
        for (name, value) in workspace {
            graph.workspace_mut().insert(name, value);
        }
        for (path, data) in assets {
            graph.insert_asset(path, data);
        }

        graph.validate_pages()?;
        match self.options.asset_check {
            AssetCheck::Eager => graph.validate_assets()?,
            AssetCheck::Deferred => {}
        }

        let orphans = graph.orphan_pages()?;
        if !orphans.is_empty() {
            tracing::warn!(?orphans, "archive stores pages the document does not list");
        }
        tracing::debug!(
            pages = graph.pages().len(),
            assets = graph.assets().len(),
            "opened archive"
        );
        Ok(graph)
    }

    /// Encode a document graph into archive bytes
    ///
    /// Both document invariants are checked first. Saving the same graph twice
    /// gives identical bytes.
    pub fn save(&self, graph: &DocumentGraph) -> Result<Vec<u8>> {
        let _span = tracing::debug_span!("save_archive", pages = graph.pages().len()).entered();

        graph.validate()?;

        let mut entries = Vec::with_capacity(
            3 + graph.pages().len() + graph.workspace().len() + graph.assets().len(),
        );
        entries.push(ArchiveEntry::json(
            DOCUMENT_PATH,
            self.encode_record(DOCUMENT_PATH, &self.options.document_type, graph.document())?,
        ));
        entries.push(ArchiveEntry::json(
            META_PATH,
            self.encode_record(META_PATH, &self.options.meta_type, graph.meta())?,
        ));
        if let Some(user) = graph.user() {
            entries.push(ArchiveEntry::json(USER_PATH, self.encode_user(user)?));
        }
        for (id, page) in graph.pages() {
            let path = page_path(id);
            let value = self.encode_record(&path, &self.options.page_type, page)?;
            entries.push(ArchiveEntry::json(path, value));
        }
        for (name, value) in graph.workspace() {
            entries.push(ArchiveEntry::json(workspace_path(name), value.clone()));
        }
        for (path, data) in graph.assets() {
            entries.push(ArchiveEntry::binary(path.clone(), data.clone()));
        }

        let bytes = write_entries(&entries)?;
        tracing::debug!(entries = entries.len(), bytes = bytes.len(), "saved archive");
        Ok(bytes)
    }

    /// Read and decode an archive file
    pub fn open_path(&self, path: impl AsRef<Path>) -> Result<DocumentGraph> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| ArchiveError::io(e).with_context(format!("reading {}", path.display())))?;
        self.open(&bytes)
    }

    /// Encode a document graph and write it to a file
    pub fn save_path(&self, graph: &DocumentGraph, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.save(graph)?;
        std::fs::write(path, bytes)
            .map_err(|e| ArchiveError::io(e).with_context(format!("writing {}", path.display())))?;
        tracing::info!(path = %path.display(), "wrote archive");
        Ok(())
    }

    fn decode_record(&self, entry: &str, value: &Value, expected: &str) -> Result<Record> {
        let (type_name, data) = self
            .bindings
            .decode_tagged(value, Some(expected))
            .map_err(|e| ArchiveError::decode(entry, e))?;
        if type_name != expected {
            return Err(ArchiveError::invalid_document(
                entry,
                format!("expected a {} document, found {}", expected, type_name),
            ));
        }
        match data {
            Data::Record(record) => Ok(record),
            other => Err(ArchiveError::invalid_document(
                entry,
                format!("{} decoded as {}, not a record", expected, other.kind()),
            )),
        }
    }

    fn decode_user(&self, entry: &str, value: Value) -> Result<Data> {
        match &self.options.user_type {
            Some(user_type) => self
                .bindings
                .decode(user_type, &value)
                .map_err(|e| ArchiveError::decode(entry, e)),
            None => Ok(Data::Unknown(value)),
        }
    }

    fn encode_record(&self, entry: &str, type_name: &str, record: &Record) -> Result<Value> {
        self.bindings
            .encode(type_name, &Data::Record(record.clone()))
            .map_err(|e| ArchiveError::encode(entry, e))
    }

    fn encode_user(&self, user: &Data) -> Result<Value> {
        match &self.options.user_type {
            Some(user_type) => self
                .bindings
                .encode(user_type, user)
                .map_err(|e| ArchiveError::encode(USER_PATH, e)),
            None => Ok(user.to_json()),
        }
    }
}
