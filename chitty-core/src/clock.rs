//! Lamport logical clock
//!
//! A single counter guarded by one lock. Every causally relevant event goes
//! through [`LamportClock::advance`] exactly once; nothing else writes the
//! counter.
//!
//! Known limitation: the counter is an `i64` to match the wire schema. Once it
//! reaches `i64::MAX` it stays there and later events share that timestamp.

use parking_lot::Mutex;
use tracing::error;

/// Lamport timestamp
pub type Timestamp = i64;

/// Process-wide Lamport clock
#[derive(Debug, Default)]
pub struct LamportClock {
    current: Mutex<Timestamp>,
}

impl LamportClock {
    /// Create a clock starting at 0
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Create a clock starting at the given value
    #[must_use]
    pub fn starting_at(initial: Timestamp) -> Self {
        Self {
            current: Mutex::new(initial),
        }
    }

    /// Record one event that observed `observed`.
    ///
    /// Stores and returns `max(current, observed) + 1`, saturating at
    /// `i64::MAX`.
    pub fn advance(&self, observed: Timestamp) -> Timestamp {
        let mut current = self.current.lock();
        let latest = (*current).max(observed);
        let next = latest.checked_add(1).unwrap_or_else(|| {
            error!(observed, "Lamport clock exhausted, holding at i64::MAX");
            latest
        });
        *current = next;
        next
    }

    /// Record one local event with nothing observed
    pub fn tick(&self) -> Timestamp {
        self.advance(Timestamp::MIN)
    }

    /// Last value handed out. For diagnostics only; never use this as the
    /// timestamp of a new event.
    #[must_use]
    pub fn current(&self) -> Timestamp {
        *self.current.lock()
    }
}
