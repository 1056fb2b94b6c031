//! Per-session pseudo-random generator.
//!
//! Each `VmSession` owns its own seeded stream — there is no process-wide RNG, so
//! two sessions constructed with the same seed observe the same sequence of
//! `loadRandomValueIntoVariable` results regardless of what else is running.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg32;

#[derive(Debug, Clone)]
pub struct SessionRng {
    inner: Pcg32,
}

impl SessionRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Pcg32::seed_from_u64(seed),
        }
    }

    /// Mixes a monotonic-ish counter with `session_id` to produce a default seed
    /// when the caller doesn't supply one explicitly.
    pub fn default_seed(session_id: u64, clock_sample: u64) -> u64 {
        clock_sample ^ session_id.wrapping_mul(0x9E3779B97F4A7C15)
    }

    pub fn next_i32(&mut self) -> i32 {
        self.inner.next_u32() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = SessionRng::new(42);
        let mut b = SessionRng::new(42);
        for _ in 0..8 {
            assert_eq!(a.next_i32(), b.next_i32());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = SessionRng::new(1);
        let mut b = SessionRng::new(2);
        let seq_a: Vec<_> = (0..8).map(|_| a.next_i32()).collect();
        let seq_b: Vec<_> = (0..8).map(|_| b.next_i32()).collect();
        assert_ne!(seq_a, seq_b);
    }
}
