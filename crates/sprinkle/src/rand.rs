use rand::{Rng, rng};

/// A source of uniformly distributed random integers.
///
/// The engine draws token symbols and share amounts through this trait so
/// tests can substitute deterministic sequences.
pub trait RandSource {
    /// Returns a uniform value in `0..bound`.
    ///
    /// `bound` is always greater than zero.
    fn next_below(&self, bound: u64) -> u64;
}

/// A `RandSource` that uses the thread-local RNG (`rand::rng()`).
///
/// This RNG is cryptographically secure (ChaCha-based) and automatically
/// reseeded, which keeps tokens unpredictable.
///
/// ⚠️ NOTE: The underlying `ThreadRng` is not `Send` or `Sync`. This type does
/// not store it; it accesses the thread-local generator on each call, so it
/// may be freely shared across threads.
#[derive(Default, Clone, Copy, Debug)]
pub struct ThreadRandom;

impl RandSource for ThreadRandom {
    fn next_below(&self, bound: u64) -> u64 {
        rng().random_range(0..bound)
    }
}

impl<R: RandSource + ?Sized> RandSource for &R {
    fn next_below(&self, bound: u64) -> u64 {
        (**self).next_below(bound)
    }
}
