use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::errors::{DictionaryError, DictionaryResult};

/// Default size of the word-processing worker pool
pub const DEFAULT_WORKER_COUNT: usize = 250;
/// Default bloom filter capacity
pub const DEFAULT_EXPECTED_WORDS: usize = 1_000_000;
/// Default bloom filter false-positive target
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.01;

/// Which membership set backs the dictionary's deduplication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStrategy {
    /// Hashed set of every word seen. No false positives.
    Exact,
    /// Fixed-size bloom filter. A novel word may occasionally be treated as a
    /// duplicate and left out of the vocabulary; a seen word is never missed.
    #[default]
    Bloom,
}

/// How invalid UTF-8 in an input file is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// Stop reading the file at the first invalid line and record it as skipped
    FailFast,
    /// Replace invalid sequences with U+FFFD and keep going
    #[default]
    Lossy,
}

/// Configuration for a dictionary build.
///
/// # Configuration Locations
///
/// The configuration can be loaded from multiple locations in order of precedence:
/// 1. Custom config file specified via `--config` flag
/// 2. Local `.wordhoard.yaml` in the current directory
/// 3. Global `$HOME/.config/wordhoard/config.yaml`
///
/// # Configuration Format
///
/// ```yaml
/// root_path: "corpus"
///
/// # Processing workers draining the shared line channel
/// worker_count: 250
///
/// # Threads reading files (default: CPU cores)
/// reader_threads: 8
///
/// # exact | bloom
/// membership: "bloom"
/// expected_words: 1000000
/// false_positive_rate: 0.01
///
/// file_extensions: ["txt"]
/// ignore_patterns: ["**/drafts/**"]
///
/// # failfast | lossy
/// encoding_mode: "lossy"
///
/// log_level: "info"
/// ```
///
/// When using the CLI, command-line arguments take precedence over config file
/// values. The merging behavior is defined in [`BuildConfig::merge_with_cli`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Root directory to ingest
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,

    /// Number of workers tokenizing lines and updating the dictionary
    #[serde(default = "default_worker_count")]
    pub worker_count: NonZeroUsize,

    /// Number of threads running per-file line producers
    #[serde(default = "default_reader_threads")]
    pub reader_threads: NonZeroUsize,

    /// Capacity of the shared line channel. Zero makes every send a rendezvous
    /// with a worker.
    #[serde(default)]
    pub line_channel_capacity: usize,

    /// Deduplication strategy
    #[serde(default)]
    pub membership: MembershipStrategy,

    /// Anticipated vocabulary size used to size the bloom filter
    #[serde(default = "default_expected_words")]
    pub expected_words: usize,

    /// Target false-positive probability of the bloom filter
    #[serde(default = "default_false_positive_rate")]
    pub false_positive_rate: f64,

    /// Optional list of file extensions to include (e.g., ["txt", "md"])
    /// If None, every file is read
    #[serde(default)]
    pub file_extensions: Option<Vec<String>>,

    /// Patterns to ignore (glob syntax)
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Whether dot-files and dot-directories are visited
    #[serde(default = "default_true")]
    pub include_hidden: bool,

    /// Whether `.gitignore` and `.ignore` files are honoured
    #[serde(default)]
    pub respect_ignore_files: bool,

    /// Whether symbolic links are followed while walking
    #[serde(default)]
    pub follow_links: bool,

    /// How invalid UTF-8 is handled
    #[serde(default)]
    pub encoding_mode: EncodingMode,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_root_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_worker_count() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_WORKER_COUNT).unwrap_or(NonZeroUsize::MIN)
}

fn default_reader_threads() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_expected_words() -> usize {
    DEFAULT_EXPECTED_WORDS
}

fn default_false_positive_rate() -> f64 {
    DEFAULT_FALSE_POSITIVE_RATE
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            worker_count: default_worker_count(),
            reader_threads: default_reader_threads(),
            line_channel_capacity: 0,
            membership: MembershipStrategy::default(),
            expected_words: default_expected_words(),
            false_positive_rate: default_false_positive_rate(),
            file_extensions: None,
            ignore_patterns: Vec::new(),
            include_hidden: true,
            respect_ignore_files: false,
            follow_links: false,
            encoding_mode: EncodingMode::default(),
            log_level: default_log_level(),
        }
    }
}

impl BuildConfig {
    /// Configuration rooted at `root` with every other field at its default
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root.into(),
            ..Self::default()
        }
    }

    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration from a specific file
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            // Global config
            dirs::config_dir().map(|p| p.join("wordhoard/config.yaml")),
            // Local config
            Some(PathBuf::from(".wordhoard.yaml")),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicitly requested file must exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder.build()?.try_deserialize()
    }

    /// Checks values that deserialize fine but cannot drive a build
    pub fn validate(&self) -> DictionaryResult<()> {
        validate_bloom_sizing(self.expected_words, self.false_positive_rate)
    }

    /// Applies command-line overrides on top of configuration file values.
    ///
    /// Every flag that was given wins, even when it repeats a default value.
    pub fn merge_with_cli(mut self, cli: ConfigOverrides) -> Self {
        if let Some(root_path) = cli.root_path {
            self.root_path = root_path;
        }
        if let Some(worker_count) = cli.worker_count {
            self.worker_count = worker_count;
        }
        if let Some(reader_threads) = cli.reader_threads {
            self.reader_threads = reader_threads;
        }
        if let Some(capacity) = cli.line_channel_capacity {
            self.line_channel_capacity = capacity;
        }
        if let Some(membership) = cli.membership {
            self.membership = membership;
        }
        if let Some(expected_words) = cli.expected_words {
            self.expected_words = expected_words;
        }
        if let Some(rate) = cli.false_positive_rate {
            self.false_positive_rate = rate;
        }
        if cli.file_extensions.is_some() {
            self.file_extensions = cli.file_extensions;
        }
        if !cli.ignore_patterns.is_empty() {
            self.ignore_patterns = cli.ignore_patterns;
        }
        if let Some(include_hidden) = cli.include_hidden {
            self.include_hidden = include_hidden;
        }
        if let Some(respect) = cli.respect_ignore_files {
            self.respect_ignore_files = respect;
        }
        if let Some(follow_links) = cli.follow_links {
            self.follow_links = follow_links;
        }
        if let Some(encoding_mode) = cli.encoding_mode {
            self.encoding_mode = encoding_mode;
        }
        if let Some(log_level) = cli.log_level {
            self.log_level = log_level;
        }
        self
    }
}

/// Values given explicitly on the command line. `None` leaves the loaded
/// configuration untouched.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub root_path: Option<PathBuf>,
    pub worker_count: Option<NonZeroUsize>,
    pub reader_threads: Option<NonZeroUsize>,
    pub line_channel_capacity: Option<usize>,
    pub membership: Option<MembershipStrategy>,
    pub expected_words: Option<usize>,
    pub false_positive_rate: Option<f64>,
    pub file_extensions: Option<Vec<String>>,
    pub ignore_patterns: Vec<String>,
    pub include_hidden: Option<bool>,
    pub respect_ignore_files: Option<bool>,
    pub follow_links: Option<bool>,
    pub encoding_mode: Option<EncodingMode>,
    pub log_level: Option<String>,
}

/// Rejects bloom filter sizing that would allocate an unusable filter
pub(crate) fn validate_bloom_sizing(
    expected_words: usize,
    false_positive_rate: f64,
) -> DictionaryResult<()> {
    if expected_words == 0 {
        return Err(DictionaryError::config_error(
            "expected_words must be greater than zero",
        ));
    }
    if !(false_positive_rate > 0.0 && false_positive_rate < 1.0) {
        return Err(DictionaryError::config_error(format!(
            "false_positive_rate must be between 0 and 1, got {}",
            false_positive_rate
        )));
    }
    Ok(())
}
