//! Deduplication structures answering "has this word been seen".
//!
//! Both strategies sit behind [`MembershipSet`] so the dictionary never knows
//! which one it holds:
//!
//! - [`ExactSet`] keeps every word in a sharded hash set. Lookups are exact.
//! - [`BloomFilter`] keeps a fixed bit array sized for an expected vocabulary.
//!   It never reports a seen word as absent, but may report an unseen word as
//!   present. Such a word is treated as a duplicate and left out of the
//!   vocabulary. Callers that need an exact vocabulary must pick [`ExactSet`].
//!
//! Both are append-only and safe to probe from many threads at once.
mod bloom;
mod exact;

pub use bloom::BloomFilter;
pub use exact::ExactSet;

use std::fmt::Debug;

use crate::config::{BuildConfig, MembershipStrategy};
use crate::errors::DictionaryResult;

/// Capability the dictionary relies on for deduplication
pub trait MembershipSet: Debug + Send + Sync {
    /// Returns false only if `word` has definitely never been inserted
    fn may_contain(&self, word: &str) -> bool;

    /// Inserts `word`, returning true if the set did not already report it
    /// as present
    fn insert(&self, word: &str) -> bool;

    /// Strategy implemented by this set
    fn strategy(&self) -> MembershipStrategy;
}

/// Creates the membership set selected by `config`
pub fn from_config(config: &BuildConfig) -> DictionaryResult<Box<dyn MembershipSet>> {
    config.validate()?;
    Ok(match config.membership {
        MembershipStrategy::Exact => Box::new(ExactSet::new()),
        MembershipStrategy::Bloom => Box::new(BloomFilter::try_with_rate(
            config.expected_words,
            config.false_positive_rate,
        )?),
    })
}
