//! File references between archive entries
//!
//! Documents point at pages and assets with small reference objects:
//!
//! ```json
//! { "_class": "MSJSONFileReference", "_ref_class": "MSImmutablePage", "_ref": "pages/<id>" }
//! ```
//!
//! Page references omit the `.json` extension. Asset references name the
//! asset path, with or without its extension.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sketch_schema::binding::{Data, Record};
use smol_str::SmolStr;
use std::collections::{BTreeMap, BTreeSet};

use crate::layout::PAGES_DIR;

/// Field names and tags used by reference objects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceConvention {
    /// Catalog type of reference objects
    pub type_name: SmolStr,
    /// Class tag marking an object as a reference
    pub class: SmolStr,
    /// Property holding the class tag
    pub class_field: SmolStr,
    /// Property holding the referenced path
    pub ref_field: SmolStr,
    /// Property holding the class of the referenced entry
    pub ref_class_field: SmolStr,
    /// Referenced class for pages
    pub page_ref_class: SmolStr,
    /// Root document property listing the pages
    pub pages_field: SmolStr,
    /// Page property holding its identifier
    pub page_id_field: SmolStr,
}

impl Default for ReferenceConvention {
    fn default() -> Self {
        Self {
            type_name: SmolStr::new_static("FileRef"),
            class: SmolStr::new_static("MSJSONFileReference"),
            class_field: SmolStr::new_static("_class"),
            ref_field: SmolStr::new_static("_ref"),
            ref_class_field: SmolStr::new_static("_ref_class"),
            page_ref_class: SmolStr::new_static("MSImmutablePage"),
            pages_field: SmolStr::new_static("pages"),
            page_id_field: SmolStr::new_static("do_objectID"),
        }
    }
}

/// A reference found in a document
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FileRef {
    pub ref_class: Option<SmolStr>,
    pub path: SmolStr,
}

impl ReferenceConvention {
    /// Read a reference out of a decoded record
    pub fn read_record(&self, record: &Record) -> Option<FileRef> {
        if record_str(record, &self.class_field)? != self.class {
            return None;
        }
        Some(FileRef {
            ref_class: record_str(record, &self.ref_class_field).map(SmolStr::new),
            path: SmolStr::new(record_str(record, &self.ref_field)?),
        })
    }

    /// Read a reference out of plain JSON
    pub fn read_json(&self, value: &Value) -> Option<FileRef> {
        let obj = value.as_object()?;
        if obj.get(self.class_field.as_str())?.as_str()? != self.class {
            return None;
        }
        Some(FileRef {
            ref_class: obj
                .get(self.ref_class_field.as_str())
                .and_then(Value::as_str)
                .map(SmolStr::new),
            path: SmolStr::new(obj.get(self.ref_field.as_str())?.as_str()?),
        })
    }

    /// Whether a reference points at a page rather than an asset
    pub fn is_page_ref(&self, file_ref: &FileRef) -> bool {
        file_ref.ref_class.as_deref() == Some(self.page_ref_class.as_str())
    }

    /// Page identifier of a page reference path, `pages/<id>` → `<id>`
    pub fn page_id<'a>(&self, path: &'a str) -> Option<&'a str> {
        path.strip_prefix(PAGES_DIR)?
            .strip_prefix('/')
            .filter(|id| !id.is_empty() && !id.contains('/'))
    }

    /// Reference record pointing at a page, as stored in the root document's page list
    pub fn page_ref(&self, id: &str) -> Record {
        Record::new(self.type_name.clone())
            .with(self.class_field.clone(), Data::String(self.class.clone()))
            .with(self.ref_class_field.clone(), Data::String(self.page_ref_class.clone()))
            .with(self.ref_field.clone(), Data::from(format!("{}/{}", PAGES_DIR, id).as_str()))
    }

    /// Every asset reference in a decoded value, declared fields and overflow alike
    pub fn collect_asset_refs(&self, data: &Data, out: &mut BTreeSet<SmolStr>) {
        match data {
            Data::Record(record) => self.collect_record_asset_refs(record, out),
            Data::Array(items) => {
                for item in items {
                    self.collect_asset_refs(item, out);
                }
            }
            Data::Map(map) => {
                for value in map.values() {
                    self.collect_asset_refs(value, out);
                }
            }
            Data::Union(union) => self.collect_asset_refs(&union.value, out),
            Data::Unknown(value) => self.collect_json_asset_refs(value, out),
            Data::Null
            | Data::Boolean(_)
            | Data::Integer(_)
            | Data::Number(_)
            | Data::String(_)
            | Data::Enum { .. } => {}
        }
    }

    /// Every asset reference in a record and the values below it
    pub fn collect_record_asset_refs(&self, record: &Record, out: &mut BTreeSet<SmolStr>) {
        if let Some(file_ref) = self.read_record(record) {
            if !self.is_page_ref(&file_ref) {
                out.insert(file_ref.path);
            }
        }
        for value in record.fields.values() {
            self.collect_asset_refs(value, out);
        }
        for value in record.extra_data.values() {
            self.collect_json_asset_refs(value, out);
        }
    }

    /// Every asset reference in plain JSON
    pub fn collect_json_asset_refs(&self, value: &Value, out: &mut BTreeSet<SmolStr>) {
        match value {
            Value::Object(obj) => {
                if let Some(file_ref) = self.read_json(value) {
                    if !self.is_page_ref(&file_ref) {
                        out.insert(file_ref.path);
                    }
                }
                for child in obj.values() {
                    self.collect_json_asset_refs(child, out);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.collect_json_asset_refs(item, out);
                }
            }
            _ => {}
        }
    }
}

/// String field of a record, declared or carried in the overflow bag
fn record_str<'a>(record: &'a Record, name: &str) -> Option<&'a str> {
    record
        .get_str(name)
        .or_else(|| record.extra_data().get(name).and_then(Value::as_str))
}

/// Find the asset a reference path points at
///
/// An exact path match wins; otherwise the reference may omit the asset's
/// extension.
pub fn resolve_asset<'a>(assets: &'a BTreeMap<SmolStr, Bytes>, reference: &str) -> Option<&'a SmolStr> {
    if let Some((path, _)) = assets.get_key_value(reference) {
        return Some(path);
    }
    assets.keys().find(|path| {
        path.strip_prefix(reference)
            .is_some_and(|ext| ext.starts_with('.') && !ext[1..].contains(['.', '/']))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reads_references_from_json() {
        let convention = ReferenceConvention::default();
        let value = json!({
            "_class": "MSJSONFileReference",
            "_ref_class": "MSImageData",
            "_ref": "images/abc.png"
        });
        let file_ref = convention.read_json(&value).expect("reference");
        assert_eq!(file_ref.path, "images/abc.png");
        assert!(!convention.is_page_ref(&file_ref));

        assert_eq!(convention.read_json(&json!({"_class": "rect"})), None);
    }

    #[test]
    fn test_page_ref_records_round_trip() {
        let convention = ReferenceConvention::default();
        let record = convention.page_ref("ABC");
        let file_ref = convention.read_record(&record).expect("reference");
        assert!(convention.is_page_ref(&file_ref));
        assert_eq!(convention.page_id(&file_ref.path), Some("ABC"));
        assert_eq!(convention.page_id("images/ABC"), None);
        assert_eq!(convention.page_id("pages/"), None);
    }

    #[test]
    fn test_collects_refs_from_overflow() {
        let convention = ReferenceConvention::default();
        let mut record = Record::new("Page");
        record.extra_data.insert(
            "style".into(),
            json!({
                "fills": [{
                    "image": {
                        "_class": "MSJSONFileReference",
                        "_ref_class": "MSImageData",
                        "_ref": "images/fill"
                    }
                }]
            }),
        );
        record.insert("pageRef", Data::Record(convention.page_ref("P1")));

        let mut refs = BTreeSet::new();
        convention.collect_asset_refs(&Data::Record(record), &mut refs);
        assert_eq!(refs.into_iter().collect::<Vec<_>>(), ["images/fill"]);
    }

    #[test]
    fn test_asset_extension_is_optional() {
        let mut assets = BTreeMap::new();
        assets.insert(SmolStr::new("images/fill.png"), Bytes::from_static(b"png"));
        assets.insert(SmolStr::new("images/other.tar.gz"), Bytes::from_static(b"gz"));

        assert_eq!(resolve_asset(&assets, "images/fill.png").map(|p| p.as_str()), Some("images/fill.png"));
        assert_eq!(resolve_asset(&assets, "images/fill").map(|p| p.as_str()), Some("images/fill.png"));
        assert_eq!(resolve_asset(&assets, "images/fil"), None);
        assert_eq!(resolve_asset(&assets, "images/other"), None);
        assert_eq!(resolve_asset(&assets, "images/missing"), None);
    }
}
