use rand::{Rng, rng};

/// Picks positions for the `Random` reissue policy.
pub trait RandSource {
    /// Returns a uniformly distributed position in `0..len`.
    ///
    /// Callers never pass `len == 0`.
    fn pick(&self, len: usize) -> usize;
}

/// A `RandSource` that uses the thread-local RNG (`rand::rng()`).
///
/// Each OS thread has its own RNG instance, so calls from multiple threads are
/// contention-free. This type does **not** store the RNG itself; it accesses
/// the thread-local generator on each call and is therefore `Send + Sync`.
#[derive(Default, Clone, Copy, Debug)]
pub struct ThreadRandom;

impl RandSource for ThreadRandom {
    fn pick(&self, len: usize) -> usize {
        rng().random_range(0..len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_stays_in_bounds() {
        for len in 1..32 {
            for _ in 0..64 {
                assert!(ThreadRandom.pick(len) < len);
            }
        }
    }
}
