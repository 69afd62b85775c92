//! Documents picked for ingestion

use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Extensions the backend can index, lower-cased
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "doc", "docx"];

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Not a file: {0}")]
    NoFileName(String),
}

/// Lower-cased suffix after the final `.`, if the name has one.
///
/// A name without a dot has no extension, so `pdf` alone is not a PDF.
pub fn extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
}

pub fn is_supported(filename: &str) -> bool {
    extension(filename).is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

/// A file handle: name plus raw content
#[derive(Clone, PartialEq, Eq)]
pub struct Document {
    pub filename: String,
    pub content: Vec<u8>,
}

impl Document {
    #[allow(dead_code)] // Used in tests
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }

    /// Read a document from disk, named after the path's final component
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| DocumentError::NoFileName(path.display().to_string()))?
            .to_string();
        let content = tokio::fs::read(path).await.map_err(|source| DocumentError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self { filename, content })
    }

    pub fn is_supported(&self) -> bool {
        is_supported(&self.filename)
    }

    /// MIME type for the multipart part, guessed from the filename
    pub fn mime_type(&self) -> String {
        mime_guess::from_path(&self.filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }
}

// Content is elided so logging a document never dumps the file
impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("filename", &self.filename)
            .field("bytes", &self.content.len())
            .finish()
    }
}
