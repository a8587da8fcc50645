//! xorshift64* generator with keyed substreams
//!
//! Every agent decision draws from its own generator, derived from
//! `(seed, stream key, period, phase)`. Parallel phases can therefore run
//! in any thread order and still consume exactly the same numbers.
//!
//! # Determinism
//!
//! Same seed + same key + same period + same phase → same sequence.

use serde::{Deserialize, Serialize};

use super::StreamKey;

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use macro_abm_core_rs::RngManager;
///
/// let mut rng = RngManager::new(12345);
/// let value = rng.next();
/// let bucket = rng.range(0, 100); // [0, 100)
/// assert!((0..100).contains(&bucket));
/// # let _ = value;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngManager {
    /// Internal state (64-bit, never zero)
    state: u64,
}

impl RngManager {
    /// Create a new RNG with given seed
    ///
    /// A zero seed is mapped to 1 (xorshift cannot leave the zero state).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Derive the substream for one agent in one phase of one period
    ///
    /// The four inputs are folded through splitmix64 so that neighbouring
    /// keys (firm 3 and firm 4, period 7 and period 8) start from unrelated
    /// states.
    ///
    /// # Example
    /// ```
    /// use macro_abm_core_rs::rng::{RngManager, StreamKey};
    ///
    /// let mut a = RngManager::substream(42, StreamKey::Firm(3), 7, 5);
    /// let mut b = RngManager::substream(42, StreamKey::Firm(3), 7, 5);
    /// assert_eq!(a.next(), b.next());
    /// ```
    pub fn substream(seed: u64, key: impl Into<StreamKey>, period: usize, phase: u8) -> Self {
        let mut h = splitmix64(seed);
        h = splitmix64(h ^ key.into().encode());
        h = splitmix64(h ^ period as u64);
        h = splitmix64(h ^ u64::from(phase));
        Self::new(h)
    }

    /// Generate next random u64 value
    pub fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Generate random value in range [min, max)
    ///
    /// # Panics
    /// Panics if min >= max
    pub fn range(&mut self, min: i64, max: i64) -> i64 {
        assert!(min < max, "min must be less than max");

        let value = self.next();
        let range_size = (max - min) as u64;
        min + (value % range_size) as i64
    }

    /// Uniform index in `[0, len)`; `len` must be positive
    pub fn index(&mut self, len: usize) -> usize {
        self.range(0, len as i64) as usize
    }

    /// Get current RNG state (for checkpointing/replay)
    pub fn get_state(&self) -> u64 {
        self.state
    }

    /// Generate random f64 in range [0.0, 1.0)
    pub fn next_f64(&mut self) -> f64 {
        let value = self.next();
        (value >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Bernoulli trial with success probability `p`
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E3779B97F4A7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
