//! Rate limiting for repeated poll warnings.
//!
//! Persistent firmware failure produces one error per tick.  The poller
//! asks [`WarnLimiter::admit`] before logging; refused warnings are counted
//! and the tally is handed to the next admitted one so the log states how
//! much was dropped.

use burster::Limiter;
use core::time::Duration;

/// Token-bucket gate in front of `log::warn!`.
pub struct WarnLimiter {
    bucket: burster::TokenBucket<fn() -> Duration>,
    suppressed: u32,
}

impl WarnLimiter {
    /// `per_sec` tokens are refilled each second, up to `burst`.
    pub fn new(per_sec: u32, burst: u32) -> Self {
        Self::with_clock(per_sec, burst, platform_now)
    }

    /// Same as [`new`](Self::new) with an explicit monotonic clock.
    pub fn with_clock(per_sec: u32, burst: u32, clock: fn() -> Duration) -> Self {
        Self {
            bucket: burster::TokenBucket::new_with_time_provider(
                per_sec.into(),
                burst.into(),
                clock,
            ),
            suppressed: 0,
        }
    }

    /// `Some(n)` if a warning may be logged now, where `n` is the number of
    /// warnings refused since the last admitted one.  `None` means drop it.
    pub fn admit(&mut self) -> Option<u32> {
        if self.bucket.try_consume(1).is_ok() {
            Some(core::mem::take(&mut self.suppressed))
        } else {
            self.suppressed = self.suppressed.saturating_add(1);
            None
        }
    }

    /// Warnings refused since the last admitted one.
    pub fn suppressed(&self) -> u32 {
        self.suppressed
    }
}

fn platform_now() -> Duration {
    use std::time::Instant;
    static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    START.get_or_init(Instant::now).elapsed()
}
