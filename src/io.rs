//! Document loading and format dispatch
//!
//! Configuration files, entry feeds and input traces are all plain serde
//! documents. This module picks the format from the file extension and
//! deserializes into the requested type.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors that can occur while reading a document
#[derive(Error, Debug)]
pub enum IoError {
    /// The file format is not supported
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The file extension could not be determined
    #[error("could not determine file format from path: {0}")]
    UnknownExtension(String),

    /// An I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A parsing error occurred
    #[error("parse error: {0}")]
    Parse(String),
}

/// Result type for document reading
pub type IoResult<T> = Result<T, IoError>;

/// Serialization formats documents may be written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// File extensions this format is recognised by
    pub fn supported_extensions(&self) -> &'static [&'static str] {
        match self {
            DocumentFormat::Yaml => &["yaml", "yml"],
            DocumentFormat::Json => &["json"],
        }
    }

    /// Find the format for a file extension (case insensitive)
    pub fn from_extension(ext: &str) -> Option<Self> {
        [DocumentFormat::Yaml, DocumentFormat::Json]
            .into_iter()
            .find(|f| {
                f.supported_extensions()
                    .iter()
                    .any(|e| e.eq_ignore_ascii_case(ext))
            })
    }

    /// Find the format for a path based on its extension
    pub fn from_path(path: &Path) -> IoResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| IoError::UnknownExtension(path.display().to_string()))?;

        Self::from_extension(ext).ok_or_else(|| IoError::UnsupportedFormat(ext.to_string()))
    }

    /// Deserialize a document held in memory
    pub fn parse<T: DeserializeOwned>(&self, content: &str) -> IoResult<T> {
        match self {
            DocumentFormat::Yaml => {
                serde_yaml::from_str(content).map_err(|e| IoError::Parse(e.to_string()))
            }
            DocumentFormat::Json => {
                serde_json::from_str(content).map_err(|e| IoError::Parse(e.to_string()))
            }
        }
    }
}

/// Read and deserialize a YAML or JSON document from disk
pub fn read_document<T: DeserializeOwned>(path: &Path) -> IoResult<T> {
    let format = DocumentFormat::from_path(path)?;
    let content = fs::read_to_string(path)?;
    format.parse(&content)
}
