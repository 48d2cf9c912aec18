//! Zip container I/O
//!
//! Reading yields every file entry with JSON entries already parsed; writing
//! takes entries in the order they should appear and produces a deterministic
//! archive: fixed timestamps, deflate compression, no directory entries.

use bytes::Bytes;
use serde_json::Value;
use smol_str::SmolStr;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{ArchiveError, Result};
use crate::layout::EntryKind;

/// Upper bound on the buffer reserved from an entry's declared size
const MAX_PREALLOC: u64 = 1 << 20;

/// One file inside an archive
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveEntry {
    pub path: SmolStr,
    pub kind: EntryKind,
    pub content: EntryContent,
}

/// Contents of an archive entry
#[derive(Debug, Clone, PartialEq)]
pub enum EntryContent {
    Json(Value),
    Binary(Bytes),
}

impl ArchiveEntry {
    /// A JSON entry, classified from its path
    pub fn json(path: impl Into<SmolStr>, value: Value) -> Self {
        let path = path.into();
        Self {
            kind: EntryKind::classify(&path),
            path,
            content: EntryContent::Json(value),
        }
    }

    /// A binary entry, classified from its path
    pub fn binary(path: impl Into<SmolStr>, data: impl Into<Bytes>) -> Self {
        let path = path.into();
        Self {
            kind: EntryKind::classify(&path),
            path,
            content: EntryContent::Binary(data.into()),
        }
    }
}

/// Read every file entry of a zip archive
///
/// Entries keep the order they have in the container. JSON entries (see
/// [`EntryKind::is_json`]) are parsed; everything else is kept as bytes.
pub fn read_entries(bytes: &[u8]) -> Result<Vec<ArchiveEntry>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ArchiveError::zip(e).with_context("not a zip archive"))?;

    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        if file.is_dir() {
            continue;
        }
        let path = SmolStr::new(file.name());

        // The declared size comes from the archive and may be forged
        let mut data = Vec::with_capacity(file.size().min(MAX_PREALLOC) as usize);
        file.read_to_end(&mut data)
            .map_err(|e| ArchiveError::zip(e).with_entry(path.clone()))?;

        let kind = EntryKind::classify(&path);
        let content = if kind.is_json() {
            let value = serde_json::from_slice(&data)
                .map_err(|e| ArchiveError::decode(path.clone(), e))?;
            EntryContent::Json(value)
        } else {
            EntryContent::Binary(Bytes::from(data))
        };

        tracing::trace!(entry = %path, ?kind, "read archive entry");
        entries.push(ArchiveEntry { path, kind, content });
    }
    Ok(entries)
}

/// Write entries to a new zip archive, in the given order
///
/// JSON entries are written compactly with keys in sorted order.
pub fn write_entries(entries: &[ArchiveEntry]) -> Result<Vec<u8>> {
    let mut archive = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut archive));
        let options = SimpleFileOptions::default()
            .last_modified_time(zip::DateTime::default())
            .compression_method(CompressionMethod::Deflated);

        for entry in entries {
            let data = match &entry.content {
                EntryContent::Json(value) => serde_json::to_vec(value)
                    .map_err(|e| ArchiveError::encode(entry.path.clone(), e))?,
                EntryContent::Binary(bytes) => bytes.to_vec(),
            };
            zip.start_file(entry.path.as_str(), options)
                .map_err(|e| ArchiveError::zip(e).with_entry(entry.path.clone()))?;
            zip.write_all(&data)
                .map_err(|e| ArchiveError::io(e).with_entry(entry.path.clone()))?;
        }

        zip.finish()?;
    }
    Ok(archive)
}
