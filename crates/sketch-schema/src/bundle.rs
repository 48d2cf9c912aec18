use crate::error::Result;
use itertools::Itertools;
use smol_str::SmolStr;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// The raw schema documents fed to the compiler, keyed by document name
///
/// Names are what cross-document `$ref`s use, e.g. `page.schema.json` in
/// `"$ref": "page.schema.json#/definitions/rect"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaBundle {
    docs: BTreeMap<SmolStr, String>,
}

impl SchemaBundle {
    /// Create an empty bundle
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document, replacing any previous document with the same name
    pub fn insert(&mut self, name: impl Into<SmolStr>, text: impl Into<String>) {
        self.docs.insert(name.into(), text.into());
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, name: impl Into<SmolStr>, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }

    /// Load every `*.json` file below a directory
    ///
    /// Document names are paths relative to `path`, joined with `/`.
    pub fn load_from_dir(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref();
        let mut bundle = Self::new();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file_path = entry.path();
            if file_path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let relative = file_path.strip_prefix(root).unwrap_or(file_path);
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .join("/");
            let content = fs::read_to_string(file_path)?;
            tracing::debug!(document = %name, bytes = content.len(), "loaded schema document");
            bundle.insert(name, content);
        }

        Ok(bundle)
    }

    /// Get a document's text by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.docs.get(name).map(|s| s.as_str())
    }

    /// Iterate over all documents in name order
    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &str)> {
        self.docs.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Number of documents
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Check if the bundle is empty
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for SchemaBundle
where
    K: Into<SmolStr>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bundle = Self::new();
        for (name, text) in iter {
            bundle.insert(name, text);
        }
        bundle
    }
}
