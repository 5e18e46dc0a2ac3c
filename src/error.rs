//! Error types for the letterhead stamping library

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the letterhead stamping library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network or protocol error from the HTTP client
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// A URL could not be parsed or resolved
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Required configuration key is absent or empty
    #[error("{0} is missing (set it in the environment or .env file)")]
    MissingConfig(&'static str),

    /// Configuration value could not be parsed
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidConfig {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {0}")]
    EmptyPdf(String),

    /// General error
    #[error("{0}")]
    General(String),
}

/// Fatal errors that abort the whole run before any document is processed
#[derive(Error, Debug)]
pub enum RunError {
    /// Configuration is missing or malformed
    #[error("Configuration error: {0}")]
    Config(#[source] Error),

    /// Letterhead template could not be opened or decoded
    #[error("Letterhead unavailable at '{}': {source}", path.display())]
    Letterhead { path: PathBuf, source: Error },

    /// Index page could not be fetched
    #[error("Failed to fetch URL {url}: {source}")]
    IndexFetch { url: String, source: Error },

    /// Output directory could not be created
    #[error("Cannot create output directory '{}': {source}", path.display())]
    OutputDir { path: PathBuf, source: Error },
}

impl RunError {
    /// Process exit code for this failure class
    ///
    /// A run that completes with per-document failures exits with 0.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Config(_) => 2,
            RunError::Letterhead { .. } => 3,
            RunError::IndexFetch { .. } => 4,
            RunError::OutputDir { .. } => 5,
        }
    }
}

/// Step of the per-document pipeline at which a failure occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Download,
    Decode,
    Stamp,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Download => "download",
            Stage::Decode => "decode",
            Stage::Stamp => "stamp",
            Stage::Write => "write",
        };
        f.write_str(name)
    }
}

/// Failure isolated to a single document; the batch continues
#[derive(Error, Debug)]
#[error("Failed to process {filename} ({stage}): {source}")]
pub struct DocumentError {
    /// Output filename derived from the link
    pub filename: String,
    /// Absolute URL the document was fetched from
    pub url: String,
    /// Pipeline step that failed
    pub stage: Stage,
    pub source: Error,
}
