//! Quota accounting primitives.

use std::time::Duration;

use crate::error::{GateError, Result};

/// Number of events a protected operation will create.
///
/// Always at least one: an empty batch still costs a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventCost(u64);

impl EventCost {
    pub const ONE: EventCost = EventCost(1);

    pub fn new(events: u64) -> Self {
        Self(events.max(1))
    }

    /// Cost of a batch with `len` items.
    pub fn from_batch_len(len: usize) -> Self {
        Self::new(u64::try_from(len).unwrap_or(u64::MAX))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl Default for EventCost {
    fn default() -> Self {
        Self::ONE
    }
}

/// Outcome of one `try_consume` call against a single counter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumptionResult {
    pub allowed: bool,
    /// Events still available in the current window.
    pub remaining: u64,
    /// Time until the current window ends (zero when no window is open).
    pub window_ttl: Duration,
}

impl ConsumptionResult {
    pub fn allowed(remaining: u64, window_ttl: Duration) -> Self {
        Self { allowed: true, remaining, window_ttl }
    }

    pub fn rejected(remaining: u64, window_ttl: Duration) -> Self {
        Self { allowed: false, remaining, window_ttl }
    }

    /// Build from the raw integer triple a store script returns
    /// (`allowed` as 0/1, `remaining`, `ttl` in milliseconds).
    ///
    /// Negative values mean the backend is not behaving; they surface as
    /// `GateError::Inconsistent` instead of being clamped.
    pub fn from_raw(allowed: i64, remaining: i64, ttl_ms: i64) -> Result<Self> {
        let remaining = u64::try_from(remaining)
            .map_err(|_| GateError::Inconsistent(format!("negative remaining: {remaining}")))?;
        let ttl_ms = u64::try_from(ttl_ms)
            .map_err(|_| GateError::Inconsistent(format!("negative ttl: {ttl_ms}")))?;
        let window_ttl = Duration::from_millis(ttl_ms);
        match allowed {
            1 => Ok(Self::allowed(remaining, window_ttl)),
            0 => Ok(Self::rejected(remaining, window_ttl)),
            other => Err(GateError::Inconsistent(format!("allowed flag out of range: {other}"))),
        }
    }

    /// Check the result against the limit it was computed for.
    pub fn check_bounds(&self, quota: u64, window: Duration) -> Result<()> {
        if self.remaining > quota {
            return Err(GateError::Inconsistent(format!(
                "remaining {} exceeds quota {quota}",
                self.remaining
            )));
        }
        if self.window_ttl > window {
            return Err(GateError::Inconsistent(format!(
                "window ttl {}ms exceeds window {}ms",
                self.window_ttl.as_millis(),
                window.as_millis()
            )));
        }
        Ok(())
    }

    /// Seconds until the window resets, rounded up, never below one.
    pub fn reset_after_secs(&self) -> u64 {
        let ms = self.window_ttl.as_millis();
        let secs = ms.div_ceil(1000);
        u64::try_from(secs).unwrap_or(u64::MAX).max(1)
    }
}
