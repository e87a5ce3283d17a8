use dashmap::DashSet;

use super::MembershipSet;
use crate::config::MembershipStrategy;

/// Exact membership backed by a sharded hash set
#[derive(Debug, Default)]
pub struct ExactSet {
    words: DashSet<String>,
}

impl ExactSet {
    pub fn new() -> Self {
        Self {
            words: DashSet::new(),
        }
    }

    /// Number of distinct words inserted
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl MembershipSet for ExactSet {
    fn may_contain(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    fn insert(&self, word: &str) -> bool {
        if self.words.contains(word) {
            return false;
        }
        self.words.insert(word.to_owned())
    }

    fn strategy(&self) -> MembershipStrategy {
        MembershipStrategy::Exact
    }
}
