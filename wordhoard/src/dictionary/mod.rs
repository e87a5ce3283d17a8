//! The dictionary aggregate: deduplicated vocabulary plus word counters.
//!
//! A [`Dictionary`] is populated exactly once by [`Dictionary::build_from_dir`]
//! and is read-only afterwards:
//!
//! ```text
//! Empty --build--> Building --done--> Built
//!                      \--cancel/fail--> Aborted
//! ```
//!
//! During a build every worker calls into the same instance. The only shared
//! mutable state is the word list and the two counters. The unique-word list
//! and its counter change together under one lock; the total counter is a
//! lock-free atomic.
mod pipeline;

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use crate::cancel::CancellationToken;
use crate::config::{BuildConfig, MembershipStrategy};
use crate::errors::{DictionaryError, DictionaryResult};
use crate::membership::{self, MembershipSet};
use crate::report::BuildReport;
use crate::snapshot::DictionarySnapshot;

/// Lifecycle of a dictionary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Empty,
    Building,
    Built,
    Aborted,
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Deduplicated vocabulary built from a directory tree
#[derive(Debug)]
pub struct Dictionary {
    config: BuildConfig,
    membership: Box<dyn MembershipSet>,
    unique_words: Mutex<Vec<String>>,
    total_word_count: AtomicU64,
    unique_word_count: AtomicU64,
    state: Mutex<BuildState>,
}

impl Dictionary {
    /// Creates an empty dictionary deduplicating with a bloom filter sized for
    /// a million words
    pub fn new_empty() -> Self {
        Self::with_membership(
            BuildConfig::default(),
            Box::new(membership::BloomFilter::default()),
        )
    }

    /// Creates an empty dictionary using the membership strategy selected by `config`
    pub fn new(config: BuildConfig) -> DictionaryResult<Self> {
        let membership = membership::from_config(&config)?;
        Ok(Self::with_membership(config, membership))
    }

    /// Creates an empty dictionary around a caller-supplied membership set
    pub fn with_membership(config: BuildConfig, membership: Box<dyn MembershipSet>) -> Self {
        Self {
            config,
            membership,
            unique_words: Mutex::new(Vec::new()),
            total_word_count: AtomicU64::new(0),
            unique_word_count: AtomicU64::new(0),
            state: Mutex::new(BuildState::Empty),
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn strategy(&self) -> MembershipStrategy {
        self.membership.strategy()
    }

    pub fn state(&self) -> BuildState {
        *lock(&self.state)
    }

    /// Tokens seen so far, duplicates included
    pub fn total_word_count(&self) -> u64 {
        self.total_word_count.load(Ordering::Acquire)
    }

    /// Distinct tokens accepted so far
    pub fn unique_word_count(&self) -> u64 {
        self.unique_word_count.load(Ordering::Acquire)
    }

    /// Copy of the unique words in first-arrival order. The order depends on
    /// scheduling and carries no meaning.
    pub fn unique_words(&self) -> Vec<String> {
        lock(&self.unique_words).clone()
    }

    /// Builds the dictionary from every file under `root`.
    ///
    /// Blocks until the tree is walked, every file streamed and every token
    /// counted. Unreadable entries are skipped and listed in the returned report.
    pub fn build_from_dir(&self, root: impl AsRef<Path>) -> DictionaryResult<BuildReport> {
        self.build_from_dir_with(root, &CancellationToken::new())
    }

    /// Same as [`build_from_dir`](Self::build_from_dir), stopping early once
    /// `cancel` is triggered
    pub fn build_from_dir_with(
        &self,
        root: impl AsRef<Path>,
        cancel: &CancellationToken,
    ) -> DictionaryResult<BuildReport> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(DictionaryError::file_not_found(root));
        }
        self.transition(BuildState::Empty, BuildState::Building)?;
        info!(
            "Building dictionary from {} with {} workers ({:?} membership)",
            root.display(),
            self.config.worker_count,
            self.strategy()
        );

        match pipeline::run(self, root, cancel) {
            Ok(report) => {
                self.set_state(BuildState::Built);
                info!(
                    "Build complete. {} unique words out of {} in {} files",
                    report.unique_words, report.total_words, report.files_read
                );
                Ok(report)
            }
            Err(err) => {
                self.set_state(BuildState::Aborted);
                debug!("Build aborted: {}", err);
                Err(err)
            }
        }
    }

    /// Stable copy of the population fields of a built dictionary
    pub fn snapshot(&self) -> DictionaryResult<DictionarySnapshot> {
        let state = self.state();
        if state != BuildState::Built {
            return Err(DictionaryError::invalid_state(BuildState::Built, state));
        }
        let words = lock(&self.unique_words);
        Ok(DictionarySnapshot {
            unique_words: words.clone(),
            total_word_count: self.total_word_count(),
            unique_word_count: self.unique_word_count(),
        })
    }

    /// Counts one token and adds it to the vocabulary if unseen
    pub(crate) fn ingest(&self, word: String) {
        self.total_word_count.fetch_add(1, Ordering::AcqRel);
        self.append_if_not_exists(word);
    }

    /// Appends `word` to the vocabulary unless the membership set already
    /// reports it.
    ///
    /// The unlocked probe only filters out the common duplicate case. Two
    /// threads can both miss it for the same word, so the insert under the lock
    /// decides which one appends.
    pub(crate) fn append_if_not_exists(&self, word: String) {
        if self.membership.may_contain(&word) {
            return;
        }

        let mut words = lock(&self.unique_words);
        if !self.membership.insert(&word) {
            return;
        }
        words.push(word);
        self.unique_word_count.fetch_add(1, Ordering::AcqRel);
    }

    fn transition(&self, from: BuildState, to: BuildState) -> DictionaryResult<()> {
        let mut state = lock(&self.state);
        if *state != from {
            return Err(DictionaryError::invalid_state(from, *state));
        }
        *state = to;
        Ok(())
    }

    fn set_state(&self, to: BuildState) {
        *lock(&self.state) = to;
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new_empty()
    }
}

impl fmt::Display for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Dictionary({}): {} unique words, {} total words",
            self.state(),
            self.unique_word_count(),
            self.total_word_count()
        )
    }
}

// A panicking worker cannot leave the word list half-updated: push and the
// counter increment happen after the last fallible step.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::{BloomFilter, ExactSet};
    use std::collections::HashSet;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn dictionaries() -> Vec<Dictionary> {
        vec![
            Dictionary::with_membership(BuildConfig::default(), Box::new(ExactSet::new())),
            Dictionary::with_membership(
                BuildConfig::default(),
                Box::new(BloomFilter::try_with_rate(10_000, 0.001).unwrap()),
            ),
        ]
    }

    #[test]
    fn test_repeated_insert_is_idempotent() {
        for dict in dictionaries() {
            for _ in 0..5 {
                dict.append_if_not_exists("echo".to_string());
            }
            dict.append_if_not_exists("other".to_string());
            dict.append_if_not_exists("echo".to_string());

            assert_eq!(dict.unique_word_count(), 2);
            assert_eq!(dict.unique_words(), vec!["echo", "other"]);
        }
    }

    #[test]
    fn test_ingest_counts_every_token() {
        for dict in dictionaries() {
            for word in ["a", "b", "a", "c", "a"] {
                dict.ingest(word.to_string());
            }
            assert_eq!(dict.total_word_count(), 5);
            assert_eq!(dict.unique_word_count(), 3);
            assert!(dict.total_word_count() >= dict.unique_word_count());
        }
    }

    #[test]
    fn test_concurrent_insert_of_same_word() {
        for round in 0..50 {
            for dict in dictionaries() {
                let dict = Arc::new(dict);
                let threads = 16;
                let barrier = Arc::new(Barrier::new(threads));
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let dict = Arc::clone(&dict);
                        let barrier = Arc::clone(&barrier);
                        thread::spawn(move || {
                            barrier.wait();
                            dict.ingest(format!("contended-{}", round));
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().unwrap();
                }

                assert_eq!(dict.unique_word_count(), 1);
                assert_eq!(dict.unique_words().len(), 1);
                assert_eq!(dict.total_word_count(), threads as u64);
            }
        }
    }

    #[test]
    fn test_concurrent_distinct_inserts_keep_invariant() {
        let dict = Arc::new(Dictionary::with_membership(
            BuildConfig::default(),
            Box::new(ExactSet::new()),
        ));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let dict = Arc::clone(&dict);
                thread::spawn(move || {
                    for i in 0..2_000 {
                        // Half the words overlap between threads
                        dict.ingest(format!("w{}", i + (t % 2) * 1_000));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let words = dict.unique_words();
        let distinct: HashSet<&String> = words.iter().collect();
        assert_eq!(distinct.len(), words.len());
        assert_eq!(dict.unique_word_count(), words.len() as u64);
        assert_eq!(words.len(), 3_000);
        assert_eq!(dict.total_word_count(), 16_000);
    }

    #[test]
    fn test_snapshot_requires_built_state() {
        let dict = Dictionary::new_empty();
        assert_eq!(dict.state(), BuildState::Empty);
        assert!(matches!(
            dict.snapshot(),
            Err(DictionaryError::InvalidState {
                expected: BuildState::Built,
                found: BuildState::Empty
            })
        ));
    }

    #[test]
    fn test_transition_guards() {
        let dict = Dictionary::new_empty();
        dict.transition(BuildState::Empty, BuildState::Building)
            .unwrap();
        assert!(dict
            .transition(BuildState::Empty, BuildState::Building)
            .is_err());
        assert_eq!(dict.state(), BuildState::Building);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = BuildConfig {
            expected_words: 0,
            ..BuildConfig::default()
        };
        assert!(matches!(
            Dictionary::new(config),
            Err(DictionaryError::ConfigError(_))
        ));
    }

    #[test]
    fn test_display() {
        let dict = Dictionary::new_empty();
        dict.ingest("hello".to_string());
        assert_eq!(
            dict.to_string(),
            "Dictionary(Empty): 1 unique words, 1 total words"
        );
    }
}
