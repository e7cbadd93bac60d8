//! Wall-clock abstraction for deterministic testing.
//!
//! Expiry decisions compare job timestamps against UNIX wall-clock seconds.
//! Decoupling "what time is it" from the decision and driver code lets tests
//! pin the clock to any instant instead of racing the real one.

/// Source of the current UNIX time in whole seconds.
///
/// # Invariants
///
/// - Implementations MUST NOT go backwards within a single process run.
///   Expiry is monotone: once a job is due it stays due.
pub trait Clock: Send + Sync {
    /// Current UNIX timestamp in seconds.
    fn wall_clock_secs(&self) -> u64;
}

/// Production clock backed by the OS real-time clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    #[allow(clippy::expect_used)]
    fn wall_clock_secs(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("invariant: system clock is after Unix epoch (1970-01-01)")
            .as_secs()
    }
}
