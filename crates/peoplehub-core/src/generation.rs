//! Request generations for discarding stale completions.
//!
//! Each part operation takes a fresh [`Generation`] before it awaits anything.
//! When the operation completes it commits only if its generation is still the
//! latest one issued, so a slow response to an older trigger can never
//! overwrite the result of a newer one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic tag identifying one operation of a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Issues generations and answers whether one is still current.
#[derive(Debug, Default)]
pub struct GenerationCounter {
    latest: AtomicU64,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, superseding every earlier one.
    pub fn next(&self) -> Generation {
        Generation(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// The most recently issued generation.
    pub fn current(&self) -> Generation {
        Generation(self.latest.load(Ordering::Acquire))
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.current() == generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generations_are_monotonic() {
        let counter = GenerationCounter::new();
        let first = counter.next();
        let second = counter.next();
        assert!(second > first);
        assert_eq!(second.value(), 2);
    }

    #[test]
    fn test_only_latest_is_current() {
        let counter = GenerationCounter::new();
        let first = counter.next();
        assert!(counter.is_current(first));

        let second = counter.next();
        assert!(!counter.is_current(first));
        assert!(counter.is_current(second));
    }

    #[test]
    fn test_fresh_counter_has_generation_zero() {
        let counter = GenerationCounter::new();
        assert_eq!(counter.current().value(), 0);
        assert_eq!(counter.current().to_string(), "0");
    }
}
