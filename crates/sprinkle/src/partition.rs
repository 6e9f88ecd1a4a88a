//! Random splitting of a total into positive shares.
//!
//! The split is a left-to-right randomized composition. For recipient `i` of
//! `count` (1-based, excluding the last), the largest amount that still leaves
//! one unit for every later recipient is `remaining - (count - i)`. A uniform
//! draw in `[1, max]` is taken, optionally after scaling `max` down by a
//! dampening factor so early recipients cannot drain most of the pool. The
//! last recipient takes whatever is left, which conserves the total exactly.
//!
//! Earlier shares are structurally capped lower than later ones could be, so
//! the split is not order-independent.

use crate::{Error, RandSource, Result};
use core::iter::FusedIterator;

/// Dampening applied to each draw's upper bound unless configured otherwise.
pub const DEFAULT_DAMPENING: f64 = 0.7;

/// Splits totals into random positive shares.
#[derive(Clone, Debug)]
pub struct Partitioner<R> {
    rng: R,
    dampening: Option<f64>,
}

impl<R: RandSource> Partitioner<R> {
    /// Creates an undampened partitioner.
    pub const fn new(rng: R) -> Self {
        Self {
            rng,
            dampening: None,
        }
    }

    /// Creates a partitioner scaling each draw's bound by `factor`.
    ///
    /// Factors outside `(0, 1)` leave the bound untouched.
    pub fn with_dampening(rng: R, factor: f64) -> Self {
        Self {
            rng,
            dampening: Some(factor).filter(|f| *f > 0.0 && *f < 1.0),
        }
    }

    pub const fn dampening(&self) -> Option<f64> {
        self.dampening
    }

    /// Returns an iterator over `count` positive shares summing to `total`.
    ///
    /// The iterator is finite and cannot be restarted; call again for a new,
    /// independent split.
    ///
    /// # Errors
    /// Returns [`Error::InvalidAmounts`] if `count` is zero or exceeds `total`.
    ///
    /// # Example
    /// ```
    /// use sprinkle::{Partitioner, ThreadRandom};
    ///
    /// let partitioner = Partitioner::new(ThreadRandom);
    /// let shares: Vec<u64> = partitioner.partition(10_000, 6).unwrap().collect();
    /// assert_eq!(shares.len(), 6);
    /// assert_eq!(shares.iter().sum::<u64>(), 10_000);
    /// ```
    pub fn partition(&self, total: u64, count: u64) -> Result<Partition<'_, R>> {
        if count == 0 || count > total {
            return Err(Error::InvalidAmounts { total, count });
        }
        Ok(Partition {
            rng: &self.rng,
            dampening: self.dampening,
            remaining: total,
            count,
            handed_out: 0,
        })
    }
}

/// The lazy share sequence produced by [`Partitioner::partition`].
#[derive(Debug)]
pub struct Partition<'a, R> {
    rng: &'a R,
    dampening: Option<f64>,
    remaining: u64,
    count: u64,
    handed_out: u64,
}

impl<R: RandSource> Partition<'_, R> {
    fn draw_bound(&self, recipient: u64) -> u64 {
        // Leave one unit for each recipient after this one.
        let max = self.remaining - (self.count - recipient);
        match self.dampening {
            Some(factor) => ((max as f64 * factor).round() as u64).clamp(1, max),
            None => max,
        }
    }
}

impl<R: RandSource> Iterator for Partition<'_, R> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.handed_out == self.count {
            return None;
        }
        self.handed_out += 1;

        if self.handed_out == self.count {
            return Some(core::mem::take(&mut self.remaining));
        }

        let bound = self.draw_bound(self.handed_out);
        let amount = 1 + self.rng.next_below(bound);
        debug_assert!(amount <= bound);
        self.remaining -= amount;
        Some(amount)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = usize::try_from(self.count - self.handed_out).unwrap_or(usize::MAX);
        (left, Some(left))
    }
}

impl<R: RandSource> ExactSizeIterator for Partition<'_, R> {}

impl<R: RandSource> FusedIterator for Partition<'_, R> {}
