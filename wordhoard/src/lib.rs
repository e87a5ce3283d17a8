pub mod cancel;
pub mod config;
pub mod dictionary;
pub mod errors;
pub mod filters;
pub mod membership;
pub mod metrics;
pub mod report;
pub mod snapshot;
pub mod source;
pub mod tokenizer;

pub use cancel::CancellationToken;
pub use config::{BuildConfig, ConfigOverrides, EncodingMode, MembershipStrategy};
pub use dictionary::{BuildState, Dictionary};
pub use errors::{DictionaryError, DictionaryResult};
pub use membership::{BloomFilter, ExactSet, MembershipSet};
pub use report::{BuildReport, SkipKind, SkippedEntry};
pub use snapshot::DictionarySnapshot;
pub use tokenizer::tokenize;
