//! Error types shared by the backend client, the composer and file selection.

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single backend round-trip.
///
/// Every caller treats the variants the same way (log, then fall back), the
/// split only exists so the log line says what actually went wrong.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never completed (connection refused, reset, timeout).
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {body}")]
    Server { status: StatusCode, body: String },

    /// The body was not the JSON we expected.
    #[error("invalid response body: {0}")]
    Parse(#[from] serde_json::Error),

    /// The file selected for upload could not be read.
    #[error("could not read {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ComposerError {
    #[error("input is read-only while a file is selected")]
    FileSelected,

    #[error("composer is disabled until the current request finishes")]
    Disabled,
}

/// Reasons a path cannot be selected for upload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileError {
    #[error("no such file: {}", .0.display())]
    Missing(PathBuf),

    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("unsupported file type (expected one of .txt, .pdf, .docx): {}", .0.display())]
    Unsupported(PathBuf),
}
