//! Publish interface: what external readers see.
//!
//! | Attribute  | Mode | Content                                   |
//! |------------|------|-------------------------------------------|
//! | `data`     | 0444 | 32 raw status bytes, verbatim             |
//! | `interval` | 0644 | poll interval in ms (`configurable-interval` only) |
//!
//! The default build exposes `data` alone.  The writable `interval`
//! attribute is compiled in only with the `configurable-interval` feature.

use std::sync::Arc;

use crate::app::ports::AttributeSpec;
use crate::cache::SnapshotCache;
use crate::error::{Error, Result};
use crate::status::STATUS_LEN;

/// Read-only raw snapshot endpoint.
pub const DATA_ATTRIBUTE: AttributeSpec = AttributeSpec {
    name: "data",
    mode: 0o444,
};

/// Writable poll interval endpoint.
#[cfg(feature = "configurable-interval")]
pub const INTERVAL_ATTRIBUTE: AttributeSpec = AttributeSpec {
    name: "interval",
    mode: 0o644,
};

/// Attribute group registered under the node.
#[cfg(not(feature = "configurable-interval"))]
pub const ATTRIBUTES: &[AttributeSpec] = &[DATA_ATTRIBUTE];

/// Attribute group registered under the node.
#[cfg(feature = "configurable-interval")]
pub const ATTRIBUTES: &[AttributeSpec] = &[DATA_ATTRIBUTE, INTERVAL_ATTRIBUTE];

// ───────────────────────────────────────────────────────────────
// data
// ───────────────────────────────────────────────────────────────

/// Cloneable read handle onto the snapshot cache.
#[derive(Clone)]
pub struct SnapshotReader {
    cache: Arc<SnapshotCache>,
}

impl SnapshotReader {
    pub fn new(cache: Arc<SnapshotCache>) -> Self {
        Self { cache }
    }

    /// Current 32-byte snapshot.
    pub fn snapshot(&self) -> [u8; STATUS_LEN] {
        self.cache.read().into_bytes()
    }

    /// Cache writes plus clears so far.  Changes whenever a tick lands, so a
    /// reader can tell a republished snapshot from a stale one.
    pub fn mutations(&self) -> u64 {
        self.cache.mutations()
    }

    /// Copy the snapshot into `out` and return the number of bytes written
    /// (always [`STATUS_LEN`]).  A shorter buffer is rejected untouched.
    pub fn read_into(&self, out: &mut [u8]) -> Result<usize> {
        let dst = out
            .get_mut(..STATUS_LEN)
            .ok_or(Error::InvalidInput("buffer shorter than status length"))?;
        dst.copy_from_slice(&self.snapshot());
        Ok(STATUS_LEN)
    }
}

// ───────────────────────────────────────────────────────────────
// interval
// ───────────────────────────────────────────────────────────────

#[cfg(feature = "configurable-interval")]
pub use interval::IntervalAttribute;

#[cfg(feature = "configurable-interval")]
mod interval {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use log::info;

    use crate::config::validate_interval;
    use crate::error::{Error, Result};

    /// Text endpoint for the poll interval, in milliseconds.
    #[derive(Clone)]
    pub struct IntervalAttribute {
        interval_ms: Arc<AtomicU32>,
    }

    impl IntervalAttribute {
        pub fn new(interval_ms: Arc<AtomicU32>) -> Self {
            Self { interval_ms }
        }

        /// Current interval in milliseconds.
        pub fn millis(&self) -> u32 {
            self.interval_ms.load(Ordering::Relaxed)
        }

        /// `"<ms>\n"`.
        pub fn show(&self) -> String {
            format!("{}\n", self.millis())
        }

        /// Parse a decimal interval and apply it from the next reschedule.
        /// Returns the number of bytes consumed.
        pub fn store(&self, input: &str) -> Result<usize> {
            let ms: u32 = input
                .trim()
                .parse()
                .map_err(|_| Error::InvalidInput("interval must be a decimal integer"))?;
            let ms = validate_interval(ms)?;
            self.interval_ms.store(ms, Ordering::Relaxed);
            info!("publish: poll interval set to {} ms", ms);
            Ok(input.len())
        }
    }
}
