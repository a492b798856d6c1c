//! Error types for the benchmark harness.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, BenchError>;

/// Errors that can occur in the benchmark pipeline.
#[derive(Error, Debug)]
pub enum BenchError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error extracting text from a PDF file.
    #[error("PDF extraction failed for '{path}': {message}")]
    Pdf { path: PathBuf, message: String },

    /// The document directory does not exist or is not a directory.
    #[error("Document path '{0}' does not exist or is not a directory")]
    InvalidDocPath(PathBuf),

    /// No corpus documents could be produced.
    #[error("No corpus documents found at '{0}'")]
    EmptyCorpus(PathBuf),

    /// The index directory does not exist.
    #[error("Index not found at '{0}'")]
    IndexNotFound(PathBuf),

    /// Error from the BM25 index.
    #[error("Index error: {0}")]
    Index(String),

    /// Unsupported question set file format.
    #[error("Unsupported question file format: '{0}' (expected yaml/json/jsonl)")]
    UnsupportedFormat(PathBuf),

    /// LLM API error.
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// LLM response parsing error.
    #[error("Failed to parse LLM response: {0}")]
    LlmParse(String),

    /// HTTP request error.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BenchError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for BenchError {
    fn from(err: reqwest::Error) -> Self {
        BenchError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for BenchError {
    fn from(err: serde_json::Error) -> Self {
        BenchError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for BenchError {
    fn from(err: serde_yaml::Error) -> Self {
        BenchError::Serialization(err.to_string())
    }
}

impl From<tantivy::TantivyError> for BenchError {
    fn from(err: tantivy::TantivyError) -> Self {
        BenchError::Index(err.to_string())
    }
}
