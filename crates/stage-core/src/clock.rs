//! Logical clock for cache invalidation.
//!
//! Every recomputed transform and every geometry mutation draws a fresh
//! [`Stamp`] from one process-wide counter. Comparing stamps replaces
//! comparing wall-clock times, so two updates can never look simultaneous.

use std::sync::atomic::{AtomicU64, Ordering};

/// A point on the logical clock. Larger is newer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Stamp(u64);

impl Stamp {
    /// Older than anything the clock hands out.
    pub const ZERO: Stamp = Stamp(0);

    /// Advance the clock and return the new reading.
    pub fn next() -> Self {
        static CLOCK: AtomicU64 = AtomicU64::new(1);
        Stamp(CLOCK.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamps_strictly_increase() {
        let a = Stamp::next();
        let b = Stamp::next();
        let c = Stamp::next();
        assert!(a < b && b < c);
        assert!(Stamp::ZERO < a);
    }
}
