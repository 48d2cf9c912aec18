//! Error types for archive operations

use smol_str::SmolStr;
use std::error::Error;
use std::fmt;

/// Boxed error type for error sources
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Result type alias for archive operations
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Archive operation error with rich diagnostics
///
/// Every error raised while reading or writing a specific archive entry
/// carries that entry's path.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub struct ArchiveError {
    kind: ArchiveErrorKind,
    entry: Option<SmolStr>,
    #[source]
    source: Option<BoxError>,
    #[help]
    help: Option<String>,
    context: Option<String>,
}

/// Error categories for archive operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveErrorKind {
    /// The zip container is malformed, or an entry failed its checksum
    Zip,
    /// I/O error
    Io,
    /// A JSON entry does not match its schema type
    Decode,
    /// A document could not be encoded back to JSON
    Encode,
    /// A required entry is absent from the archive
    MissingEntry,
    /// The root document lists a page with no page entry
    MissingPage,
    /// A file reference points at no asset
    MissingAsset,
    /// An entry is readable but not a valid document of its kind
    InvalidDocument,
}

impl ArchiveError {
    /// Create a new error with the given kind and optional source
    pub fn new(kind: ArchiveErrorKind, source: Option<BoxError>) -> Self {
        Self {
            kind,
            entry: None,
            source,
            help: None,
            context: None,
        }
    }

    /// Add a help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Add context information to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Name the archive entry the error concerns
    pub fn with_entry(mut self, entry: impl Into<SmolStr>) -> Self {
        self.entry = Some(entry.into());
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> &ArchiveErrorKind {
        &self.kind
    }

    /// Path of the archive entry the error concerns, if any
    pub fn entry(&self) -> Option<&str> {
        self.entry.as_deref()
    }

    /// Context message, if any
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    // Constructors for different error kinds

    /// Create a zip container error
    pub fn zip(source: impl Error + Send + Sync + 'static) -> Self {
        Self::new(ArchiveErrorKind::Zip, Some(Box::new(source)))
    }

    /// Create an I/O error
    pub fn io(source: impl Error + Send + Sync + 'static) -> Self {
        Self::new(ArchiveErrorKind::Io, Some(Box::new(source)))
    }

    /// Create a decode error for an entry
    pub fn decode(entry: impl Into<SmolStr>, source: impl Error + Send + Sync + 'static) -> Self {
        Self::new(ArchiveErrorKind::Decode, Some(Box::new(source))).with_entry(entry)
    }

    /// Create an encode error for an entry
    pub fn encode(entry: impl Into<SmolStr>, source: impl Error + Send + Sync + 'static) -> Self {
        Self::new(ArchiveErrorKind::Encode, Some(Box::new(source))).with_entry(entry)
    }

    /// Create a missing entry error
    pub fn missing_entry(entry: impl Into<SmolStr>) -> Self {
        let entry = entry.into();
        Self::new(ArchiveErrorKind::MissingEntry, None)
            .with_context(format!("archive has no {}", entry))
            .with_entry(entry)
    }

    /// Create a missing page error
    pub fn missing_page(id: &str) -> Self {
        Self::new(ArchiveErrorKind::MissingPage, None)
            .with_context(format!("page {} is listed in the root document but has no entry", id))
            .with_help("Every page in the document's page list must be stored under pages/")
            .with_entry(format!("pages/{}.json", id))
    }

    /// Create a missing asset error
    pub fn missing_asset(reference: &str) -> Self {
        Self::new(ArchiveErrorKind::MissingAsset, None)
            .with_context(format!("file reference {} does not resolve to an asset", reference))
            .with_help("Add the asset to the document, or remove the layer referencing it")
            .with_entry(reference)
    }

    /// Create an invalid document error
    pub fn invalid_document(entry: impl Into<SmolStr>, msg: impl Into<String>) -> Self {
        Self::new(ArchiveErrorKind::InvalidDocument, None)
            .with_context(msg)
            .with_entry(entry)
    }
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;

        if let Some(entry) = &self.entry {
            write!(f, " in {}", entry)?;
        }

        if let Some(ctx) = &self.context {
            write!(f, ": {}", ctx)?;
        }

        if let Some(src) = &self.source {
            write!(f, ": {}", src)?;
        }

        Ok(())
    }
}

impl From<std::io::Error> for ArchiveError {
    fn from(e: std::io::Error) -> Self {
        Self::io(e)
    }
}

impl From<zip::result::ZipError> for ArchiveError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::zip(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_page_names_the_page() {
        let err = ArchiveError::missing_page("ABC");
        assert_eq!(err.kind(), &ArchiveErrorKind::MissingPage);
        assert_eq!(err.entry(), Some("pages/ABC.json"));
        assert!(err.to_string().contains("page ABC"));
    }

    #[test]
    fn test_display_includes_entry_and_source() {
        let source = std::io::Error::other("boom");
        let err = ArchiveError::decode("meta.json", source);
        assert_eq!(err.to_string(), "Decode in meta.json: boom");
    }
}
