use std::path::PathBuf;
use thiserror::Error;

/// Whole-source failures. Per-line anomalies never surface here.
#[derive(Error, Debug)]
pub enum WarnError {
    #[error("Cannot read log '{}': {reason}", path.display())]
    SourceUnreadable { path: PathBuf, reason: String },

    #[error("Failed to parse '{source_id}': {reason}")]
    ParseFailed { source_id: String, reason: String },

    #[error("Invalid category pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("No external editor configured")]
    EditorNotConfigured,

    #[error("Warning #{0} does not exist")]
    NoSuchWarning(usize),

    #[error("Warning #{0} has a relative path and cannot be opened")]
    RelativePath(usize),
}

pub type Result<T> = std::result::Result<T, WarnError>;
