//! Archive layout: where each kind of entry lives and how it is typed

use crate::references::ReferenceConvention;
use bon::Builder;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Root document entry
pub const DOCUMENT_PATH: &str = "document.json";
/// Metadata entry
pub const META_PATH: &str = "meta.json";
/// Per-user state entry
pub const USER_PATH: &str = "user.json";
/// Directory holding one JSON entry per page
pub const PAGES_DIR: &str = "pages";
/// Directory holding named workspace JSON documents
pub const WORKSPACE_DIR: &str = "workspace";
/// Directory holding preview renders
pub const PREVIEWS_DIR: &str = "previews";
/// Directory holding embedded images
pub const IMAGES_DIR: &str = "images";

/// What an archive entry holds, decided from its path alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryKind {
    Document,
    Meta,
    User,
    Page,
    Workspace,
    Preview,
    Image,
    Other,
}

impl EntryKind {
    /// Classify an entry by its path inside the archive
    pub fn classify(path: &str) -> Self {
        match path {
            DOCUMENT_PATH => return Self::Document,
            META_PATH => return Self::Meta,
            USER_PATH => return Self::User,
            _ => {}
        }

        let Some((dir, file)) = path.split_once('/') else {
            return Self::Other;
        };
        match dir {
            PAGES_DIR if is_flat_json(file) => Self::Page,
            WORKSPACE_DIR if is_flat_json(file) => Self::Workspace,
            PREVIEWS_DIR => Self::Preview,
            IMAGES_DIR => Self::Image,
            _ => Self::Other,
        }
    }

    /// Whether entries of this kind are parsed as JSON
    pub fn is_json(self) -> bool {
        matches!(
            self,
            Self::Document | Self::Meta | Self::User | Self::Page | Self::Workspace
        )
    }

    /// Whether entries of this kind are stored as opaque bytes in the asset table
    pub fn is_asset(self) -> bool {
        !self.is_json()
    }
}

fn is_flat_json(file: &str) -> bool {
    !file.contains('/') && file.len() > ".json".len() && file.ends_with(".json")
}

/// Path of the entry storing a page
pub fn page_path(id: &str) -> String {
    format!("{}/{}.json", PAGES_DIR, id)
}

/// Path of the entry storing a workspace document
pub fn workspace_path(name: &str) -> String {
    format!("{}/{}.json", WORKSPACE_DIR, name)
}

/// `pages/ABC.json` → `ABC`, for page and workspace entries
pub fn entry_stem(path: &str) -> &str {
    let file = path.rsplit('/').next().unwrap_or(path);
    file.strip_suffix(".json").unwrap_or(file)
}

/// When file references are checked against the asset table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetCheck {
    /// While opening the archive
    #[default]
    Eager,
    /// Only before saving
    Deferred,
}

/// Options controlling how archives are read and written
///
/// Type names refer to entries of the bindings' catalog.
///
/// ```
/// use sketch_file::{ArchiveOptions, AssetCheck};
///
/// let options = ArchiveOptions::new()
///     .asset_check(AssetCheck::Deferred)
///     .build();
/// assert_eq!(options.document_type, "Document");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(start_fn = new)]
pub struct ArchiveOptions {
    /// Catalog type of `document.json`
    #[builder(into, default = SmolStr::new_static("Document"))]
    pub document_type: SmolStr,
    /// Catalog type of `meta.json`, which carries no class tag
    #[builder(into, default = SmolStr::new_static("Meta"))]
    pub meta_type: SmolStr,
    /// Catalog type of every page entry
    #[builder(into, default = SmolStr::new_static("Page"))]
    pub page_type: SmolStr,
    /// Catalog type of `user.json`; kept as plain JSON when unset
    #[builder(into)]
    pub user_type: Option<SmolStr>,
    /// When to check that file references resolve
    #[builder(default)]
    pub asset_check: AssetCheck,
    /// How documents refer to pages and assets
    #[builder(default)]
    pub references: ReferenceConvention,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self::new().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_paths() {
        assert_eq!(EntryKind::classify("document.json"), EntryKind::Document);
        assert_eq!(EntryKind::classify("meta.json"), EntryKind::Meta);
        assert_eq!(EntryKind::classify("user.json"), EntryKind::User);
        assert_eq!(EntryKind::classify("pages/0A1B.json"), EntryKind::Page);
        assert_eq!(EntryKind::classify("workspace/assistants.json"), EntryKind::Workspace);
        assert_eq!(EntryKind::classify("previews/preview.png"), EntryKind::Preview);
        assert_eq!(EntryKind::classify("images/ab12.png"), EntryKind::Image);
    }

    #[test]
    fn test_classify_everything_else_as_other() {
        assert_eq!(EntryKind::classify("text-previews/text-previews.pdf"), EntryKind::Other);
        assert_eq!(EntryKind::classify("pages/nested/page.json"), EntryKind::Other);
        assert_eq!(EntryKind::classify("pages/readme.txt"), EntryKind::Other);
        assert_eq!(EntryKind::classify("pages/.json"), EntryKind::Other);
        assert_eq!(EntryKind::classify("Document.json"), EntryKind::Other);
        assert!(EntryKind::Other.is_asset());
        assert!(EntryKind::Workspace.is_json());
    }

    #[test]
    fn test_entry_paths() {
        assert_eq!(page_path("ABC"), "pages/ABC.json");
        assert_eq!(workspace_path("assistants"), "workspace/assistants.json");
        assert_eq!(entry_stem("pages/ABC.json"), "ABC");
        assert_eq!(entry_stem("workspace/assistants.json"), "assistants");
    }

    #[test]
    fn test_default_options() {
        let options = ArchiveOptions::default();
        assert_eq!(options.page_type, "Page");
        assert_eq!(options.user_type, None);
        assert_eq!(options.asset_check, AssetCheck::Eager);

        let custom = ArchiveOptions::new()
            .document_type("Root")
            .user_type("User")
            .build();
        assert_eq!(custom.document_type, "Root");
        assert_eq!(custom.user_type.as_deref(), Some("User"));
        assert_eq!(custom.meta_type, "Meta");
    }
}
