//! Sketch document archives
//!
//! A document is a zip archive of JSON entries plus binary assets:
//!
//! - `document.json`: the root document, listing its pages by reference
//! - `meta.json`: application and version metadata
//! - `user.json`: per-user view state
//! - `pages/<id>.json`: one entry per page
//! - `workspace/<name>.json`: free-form workspace documents
//! - `previews/*`, `images/*` and anything else: kept as raw bytes
//!
//! [`ArchiveCodec`] decodes every JSON entry through the runtime
//! [`Bindings`](sketch_schema::Bindings) of a compiled type catalog, so a
//! document that opens is known to match the schemas. Unknown properties are
//! carried through to the saved archive unchanged.
//!
//! # Example
//!
//! ```rust,ignore
//! use sketch_file::{ArchiveCodec, ArchiveOptions};
//! use sketch_schema::{Bindings, TypeCatalog};
//!
//! let catalog: TypeCatalog = serde_json::from_str(&std::fs::read_to_string("catalog.json")?)?;
//! let codec = ArchiveCodec::new(Bindings::new(catalog), ArchiveOptions::default());
//!
//! let mut graph = codec.open_path("design.sketch")?;
//! graph.remove_page("8D1A5C4E-0000-4000-8000-000000000001");
//! codec.save_path(&graph, "design-trimmed.sketch")?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

/// Zip container reading and writing
pub mod archive;
pub mod codec;
pub mod document;
pub mod error;
pub mod layout;
pub mod references;

pub use archive::{ArchiveEntry, EntryContent};
pub use codec::ArchiveCodec;
pub use document::DocumentGraph;
pub use error::{ArchiveError, ArchiveErrorKind, Result};
pub use layout::{ArchiveOptions, AssetCheck, EntryKind};
pub use references::{FileRef, ReferenceConvention};
pub use sketch_schema;
