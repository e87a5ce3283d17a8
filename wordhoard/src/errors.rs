/// Error types for wordhoard.
///
/// Two kinds of failure exist in a build:
///
/// 1. **Per-item failures** (an unreadable file, a directory entry that cannot be
///    stat'ed, a file with invalid UTF-8). These never abort a build. The pipeline
///    classifies them with [`DictionaryError::skip_kind`] and records them in the
///    [`BuildReport`](crate::report::BuildReport).
///
/// 2. **Build-level failures** (invalid state transition, cancellation, a worker
///    panic, a snapshot that cannot be written). These are returned to the caller:
///    ```rust,ignore
///    match dictionary.build_from_dir("corpus") {
///        Ok(report) => println!("{} unique words", report.unique_words),
///        Err(DictionaryError::Cancelled) => // build was interrupted,
///        Err(e) => // handle other errors
///    }
///    ```
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::dictionary::BuildState;
use crate::report::SkipKind;

/// Result type for dictionary operations
pub type DictionaryResult<T> = Result<T, DictionaryError>;

/// Errors that can occur while building or persisting a dictionary
#[derive(Error, Debug)]
pub enum DictionaryError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid UTF-8 in file {path}: {source}")]
    EncodingError {
        path: PathBuf,
        source: std::string::FromUtf8Error,
    },
    #[error("Traversal error{}: {message}", path.as_ref().map(|p| format!(" at {}", p.display())).unwrap_or_default())]
    Traversal {
        path: Option<PathBuf>,
        message: String,
    },
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid build state: expected {expected}, found {found}")]
    InvalidState {
        expected: BuildState,
        found: BuildState,
    },
    #[error("Build was cancelled")]
    Cancelled,
    #[error("Worker thread panicked: {0}")]
    WorkerPanicked(String),
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
    #[error("Snapshot error: {0}")]
    SnapshotError(String),
}

impl DictionaryError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    /// Classifies an I/O error raised while touching `path`
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::FileNotFound(path),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            _ => Self::Io { path, source },
        }
    }

    pub fn encoding_error(path: impl Into<PathBuf>, source: std::string::FromUtf8Error) -> Self {
        Self::EncodingError {
            path: path.into(),
            source,
        }
    }

    pub fn traversal(path: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self::Traversal {
            path,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_state(expected: BuildState, found: BuildState) -> Self {
        Self::InvalidState { expected, found }
    }

    pub fn snapshot_error(msg: impl Into<String>) -> Self {
        Self::SnapshotError(msg.into())
    }

    /// The filesystem path this error is about, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::FileNotFound(path) | Self::PermissionDenied(path) => Some(path),
            Self::Io { path, .. } | Self::EncodingError { path, .. } => Some(path),
            Self::Traversal { path, .. } => path.as_deref(),
            _ => None,
        }
    }

    /// How a per-item failure is classified in a build report
    pub fn skip_kind(&self) -> SkipKind {
        match self {
            Self::FileNotFound(_) => SkipKind::NotFound,
            Self::PermissionDenied(_) => SkipKind::PermissionDenied,
            Self::EncodingError { .. } => SkipKind::Encoding,
            Self::Traversal { .. } => SkipKind::Traversal,
            _ => SkipKind::Io,
        }
    }
}
