use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::errors::{DictionaryError, DictionaryResult};

/// The population fields of a built dictionary, ready for persistence.
///
/// On disk a snapshot is bincode-encoded and then base64-encoded, so the file
/// is plain ASCII text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionarySnapshot {
    pub unique_words: Vec<String>,
    pub total_word_count: u64,
    pub unique_word_count: u64,
}

impl DictionarySnapshot {
    /// Encodes the snapshot as base64 text
    pub fn encode(&self) -> DictionaryResult<String> {
        let bytes = bincode::serialize(self)
            .map_err(|e| DictionaryError::snapshot_error(format!("encode failed: {}", e)))?;
        Ok(STANDARD.encode(bytes))
    }

    /// Decodes text produced by [`encode`](Self::encode)
    pub fn decode(text: &str) -> DictionaryResult<Self> {
        let bytes = STANDARD
            .decode(text.trim())
            .map_err(|e| DictionaryError::snapshot_error(format!("invalid base64: {}", e)))?;
        let snapshot: Self = bincode::deserialize(&bytes)
            .map_err(|e| DictionaryError::snapshot_error(format!("decode failed: {}", e)))?;
        snapshot.check_counts()?;
        Ok(snapshot)
    }

    /// Writes the snapshot to `path`.
    ///
    /// The data goes to a temporary file in the same directory, is flushed to
    /// disk and then renamed over `path`, so readers never see a partial file.
    /// An existing file is replaced.
    pub fn save_to(&self, path: &Path) -> DictionaryResult<()> {
        let data = self.encode()?;

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|e| DictionaryError::io(parent, e))?;

        let mut tmp = NamedTempFile::new_in(parent).map_err(|e| DictionaryError::io(parent, e))?;
        tmp.write_all(data.as_bytes())
            .map_err(|e| DictionaryError::io(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| DictionaryError::io(tmp.path(), e))?;
        tmp.persist(path)
            .map_err(|e| DictionaryError::io(path, e.error))?;

        info!(
            "Saved {} unique words ({} bytes) to {}",
            self.unique_word_count,
            data.len(),
            path.display()
        );
        Ok(())
    }

    /// Reads a snapshot written by [`save_to`](Self::save_to)
    pub fn load_from(path: &Path) -> DictionaryResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| DictionaryError::io(path, e))?;
        let snapshot = Self::decode(&text)?;
        debug!(
            "Loaded {} unique words from {}",
            snapshot.unique_word_count,
            path.display()
        );
        Ok(snapshot)
    }

    fn check_counts(&self) -> DictionaryResult<()> {
        if self.unique_word_count != self.unique_words.len() as u64 {
            return Err(DictionaryError::snapshot_error(format!(
                "unique word count {} does not match {} stored words",
                self.unique_word_count,
                self.unique_words.len()
            )));
        }
        if self.total_word_count < self.unique_word_count {
            return Err(DictionaryError::snapshot_error(format!(
                "total word count {} is below unique word count {}",
                self.total_word_count, self.unique_word_count
            )));
        }
        Ok(())
    }
}
