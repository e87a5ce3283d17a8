use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use super::MembershipSet;
use crate::config::{
    validate_bloom_sizing, MembershipStrategy, DEFAULT_EXPECTED_WORDS, DEFAULT_FALSE_POSITIVE_RATE,
};
use crate::errors::DictionaryResult;

const WORD_BITS: u64 = 64;
const MAX_HASHES: u32 = 16;

// Seeds for the two base hashes; further probe positions are derived from them
const SEED_A: u64 = 0x51_7c_c1_b7_27_22_0a_95;
const SEED_B: u64 = 0x9e_37_79_b9_7f_4a_7c_15;

/// Lock-free bloom filter over a fixed atomic bit array.
///
/// Bits are only ever set, so a word observed as present stays present.
/// Probe positions use double hashing: `h1 + i * h2` for `i` in `0..k`.
#[derive(Debug)]
pub struct BloomFilter {
    bits: Box<[AtomicU64]>,
    num_bits: u64,
    num_hashes: u32,
    inserted: AtomicU64,
    capacity: usize,
}

impl BloomFilter {
    /// Creates a filter sized so that `expected_items` insertions keep the
    /// false-positive probability near `false_positive_rate`.
    ///
    /// Fails with a configuration error unless `expected_items` is non-zero and
    /// the rate lies strictly between 0 and 1.
    pub fn try_with_rate(
        expected_items: usize,
        false_positive_rate: f64,
    ) -> DictionaryResult<Self> {
        validate_bloom_sizing(expected_items, false_positive_rate)?;
        Ok(Self::sized(expected_items, false_positive_rate))
    }

    fn sized(expected_items: usize, false_positive_rate: f64) -> Self {
        let num_bits = optimal_num_bits(expected_items, false_positive_rate);
        let num_hashes = optimal_num_hashes(num_bits, expected_items);
        Self::with_params(num_bits, num_hashes, expected_items)
    }

    fn with_params(num_bits: u64, num_hashes: u32, capacity: usize) -> Self {
        let words = num_bits.div_ceil(WORD_BITS) as usize;
        let bits = (0..words).map(|_| AtomicU64::new(0)).collect();
        Self {
            bits,
            num_bits: words as u64 * WORD_BITS,
            num_hashes,
            inserted: AtomicU64::new(0),
            capacity,
        }
    }

    /// Size of the bit array
    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    /// Number of probe positions per word
    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Expected item count the filter was sized for
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of insertions that set at least one new bit
    pub fn inserted(&self) -> u64 {
        self.inserted.load(Ordering::Relaxed)
    }

    /// False-positive probability implied by the current fill
    pub fn estimated_false_positive_rate(&self) -> f64 {
        let k = f64::from(self.num_hashes);
        let n = self.inserted() as f64;
        let m = self.num_bits as f64;
        (1.0 - (-k * n / m).exp()).powf(k)
    }

    fn positions(&self, word: &str) -> impl Iterator<Item = u64> {
        let h1 = seeded_hash(SEED_A, word);
        // A zero step would probe the same position k times
        let h2 = seeded_hash(SEED_B, word) | 1;
        let num_bits = self.num_bits;
        (0..u64::from(self.num_hashes))
            .map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % num_bits)
    }
}

impl Default for BloomFilter {
    /// A filter for a million words at a 1% false-positive target
    fn default() -> Self {
        Self::sized(DEFAULT_EXPECTED_WORDS, DEFAULT_FALSE_POSITIVE_RATE)
    }
}

impl MembershipSet for BloomFilter {
    fn may_contain(&self, word: &str) -> bool {
        self.positions(word).all(|pos| {
            let mask = 1u64 << (pos % WORD_BITS);
            self.bits[(pos / WORD_BITS) as usize].load(Ordering::Acquire) & mask != 0
        })
    }

    fn insert(&self, word: &str) -> bool {
        let mut fresh = false;
        for pos in self.positions(word) {
            let mask = 1u64 << (pos % WORD_BITS);
            let previous = self.bits[(pos / WORD_BITS) as usize].fetch_or(mask, Ordering::AcqRel);
            if previous & mask == 0 {
                fresh = true;
            }
        }
        if fresh {
            self.inserted.fetch_add(1, Ordering::Relaxed);
        }
        fresh
    }

    fn strategy(&self) -> MembershipStrategy {
        MembershipStrategy::Bloom
    }
}

fn seeded_hash(seed: u64, word: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    word.hash(&mut hasher);
    hasher.finish()
}

/// m = -n ln(p) / (ln 2)^2
fn optimal_num_bits(expected_items: usize, false_positive_rate: f64) -> u64 {
    let n = expected_items as f64;
    let bits = -n * false_positive_rate.ln() / std::f64::consts::LN_2.powi(2);
    (bits.ceil() as u64).max(WORD_BITS)
}

/// k = (m / n) ln 2
fn optimal_num_hashes(num_bits: u64, expected_items: usize) -> u32 {
    let k = (num_bits as f64 / expected_items as f64) * std::f64::consts::LN_2;
    (k.round() as u32).clamp(1, MAX_HASHES)
}
