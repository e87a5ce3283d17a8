use std::path::PathBuf;
use std::time::Duration;

use crate::errors::DictionaryError;

/// Classification of an entry the pipeline could not ingest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipKind {
    /// The walker failed on a directory entry
    Traversal,
    /// The file disappeared between discovery and open
    NotFound,
    /// The file or directory could not be opened for reading
    PermissionDenied,
    /// Any other read failure
    Io,
    /// The file contained invalid UTF-8 and the encoding mode is fail-fast
    Encoding,
}

/// An entry that was skipped during a build, with the reason
#[derive(Debug, Clone)]
pub struct SkippedEntry {
    pub path: Option<PathBuf>,
    pub kind: SkipKind,
    pub message: String,
}

impl From<&DictionaryError> for SkippedEntry {
    fn from(err: &DictionaryError) -> Self {
        Self {
            path: err.path().map(PathBuf::from),
            kind: err.skip_kind(),
            message: err.to_string(),
        }
    }
}

/// Outcome of a completed build.
///
/// Skipped entries never abort a build, so this is the only place a caller can
/// tell an empty tree apart from one whose files were all unreadable.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Non-directory entries emitted by the walker
    pub files_discovered: u64,
    /// Files streamed to the end without error
    pub files_read: u64,
    /// Lines handed to the worker pool
    pub lines_read: u64,
    /// Bytes consumed by the line sources
    pub bytes_read: u64,
    /// Tokens seen, duplicates included
    pub total_words: u64,
    /// Distinct tokens accepted into the dictionary
    pub unique_words: u64,
    /// Everything that could not be ingested
    pub skipped: Vec<SkippedEntry>,
    /// Wall-clock duration of the build
    pub elapsed: Duration,
}

impl BuildReport {
    /// Returns true when every discovered entry was ingested
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    /// Number of skipped entries of the given kind
    pub fn skipped_of(&self, kind: SkipKind) -> usize {
        self.skipped.iter().filter(|entry| entry.kind == kind).count()
    }
}
