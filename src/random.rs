//! Injectable randomness for voice selection.
//!
//! Starting-voice choice and probability-gated switching both draw from a
//! [`RandomSource`], so tests can pin outcomes with a seeded or scripted
//! source.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A source of uniform random numbers.
pub trait RandomSource: Send {
    /// A float uniformly distributed in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// An index uniformly distributed in `0..len`. `len` must be non-zero.
    fn pick_index(&mut self, len: usize) -> usize;
}

/// [`RandomSource`] backed by `rand`'s `StdRng`.
#[derive(Debug, Clone)]
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    /// Seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for StdRandom {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl RandomSource for StdRandom {
    fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn pick_index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Replays fixed values, cycling when exhausted.
///
/// `floats` feed [`RandomSource::next_f64`] and `indices` feed
/// [`RandomSource::pick_index`] (reduced modulo `len`). An empty list yields
/// `0.0` / `0`.
#[derive(Debug, Clone, Default)]
pub struct SequenceRandom {
    floats: Vec<f64>,
    indices: Vec<usize>,
    float_pos: usize,
    index_pos: usize,
}

impl SequenceRandom {
    pub fn new(floats: Vec<f64>, indices: Vec<usize>) -> Self {
        Self {
            floats,
            indices,
            float_pos: 0,
            index_pos: 0,
        }
    }

    /// Only index picks are scripted; every float is `0.0`.
    pub fn indices(indices: Vec<usize>) -> Self {
        Self::new(Vec::new(), indices)
    }
}

impl RandomSource for SequenceRandom {
    fn next_f64(&mut self) -> f64 {
        if self.floats.is_empty() {
            return 0.0;
        }
        let value = self.floats[self.float_pos % self.floats.len()];
        self.float_pos += 1;
        value
    }

    fn pick_index(&mut self, len: usize) -> usize {
        if self.indices.is_empty() || len == 0 {
            return 0;
        }
        let value = self.indices[self.index_pos % self.indices.len()];
        self.index_pos += 1;
        value % len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_is_deterministic() {
        let mut a = StdRandom::seeded(7);
        let mut b = StdRandom::seeded(7);
        for _ in 0..10 {
            assert_eq!(a.pick_index(5), b.pick_index(5));
            assert_eq!(a.next_f64(), b.next_f64());
        }
    }

    #[test]
    fn test_std_random_ranges() {
        let mut rng = StdRandom::seeded(42);
        for _ in 0..100 {
            let f = rng.next_f64();
            assert!((0.0..1.0).contains(&f));
            assert!(rng.pick_index(3) < 3);
        }
    }

    #[test]
    fn test_sequence_cycles_and_wraps() {
        let mut rng = SequenceRandom::new(vec![0.1, 0.9], vec![4, 1]);
        assert_eq!(rng.next_f64(), 0.1);
        assert_eq!(rng.next_f64(), 0.9);
        assert_eq!(rng.next_f64(), 0.1);
        assert_eq!(rng.pick_index(3), 1); // 4 % 3
        assert_eq!(rng.pick_index(3), 1);
    }

    #[test]
    fn test_sequence_empty_defaults() {
        let mut rng = SequenceRandom::default();
        assert_eq!(rng.next_f64(), 0.0);
        assert_eq!(rng.pick_index(10), 0);
    }
}
