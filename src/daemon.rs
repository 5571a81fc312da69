//! Daemon plumbing: stop requests and the snapshot mirror loop.
//!
//! The mirror loop copies the current snapshot into the `data` file of the
//! node once per period.  It returns when a stop is requested (normally a
//! termination signal) or when the node directory disappears, so the caller
//! can run `on_unload` and leave no stale node behind.

use std::os::raw::c_int;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{info, warn};
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};

use crate::adapters::attr_file::FsAttributeHost;
use crate::app::ports::AttributeHost;
use crate::error::HostError;
use crate::module::SkrModule;
use crate::publish::DATA_ATTRIBUTE;

/// Signals that end the daemon.
pub const TERMINATION_SIGNALS: [c_int; 3] = [SIGTERM, SIGINT, SIGHUP];

/// Longest a pending stop request waits for the loop to notice it.
const STOP_LATENCY: Duration = Duration::from_millis(50);

/// Shared stop request, settable from a signal handler.
#[derive(Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// A flag raised by any of `signals`.  A second delivery of the same
    /// signal while the flag is already raised terminates the process.
    pub fn on_signals(signals: &[c_int]) -> std::io::Result<Self> {
        let flag = Self::new();
        for &sig in signals {
            signal_hook::flag::register_conditional_shutdown(sig, 1, Arc::clone(&flag.0))?;
            signal_hook::flag::register(sig, Arc::clone(&flag.0))?;
        }
        Ok(flag)
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Sleep for `period` or until a stop is requested.  `false` if the
    /// sleep ended because of a stop request.
    fn sleep(&self, period: Duration) -> bool {
        let deadline = Instant::now() + period;
        loop {
            if self.is_requested() {
                return false;
            }
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return true;
            }
            std::thread::sleep(left.min(STOP_LATENCY));
        }
    }
}

/// Why [`mirror`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorExit {
    Stopped,
    NodeRemoved,
}

/// Mirror the snapshot of `module` into `out` every `period_ms` until
/// stopped.  With `configurable-interval`, the period follows the
/// `interval` attribute and values written to its file are applied.
pub fn mirror<H: AttributeHost>(
    module: &SkrModule<H>,
    out: &FsAttributeHost,
    stop: &StopFlag,
    #[cfg_attr(feature = "configurable-interval", allow(unused_variables))] period_ms: u32,
) -> MirrorExit {
    let node = module.node_name();

    #[cfg(feature = "configurable-interval")]
    let interval = module.interval_attribute();
    #[cfg(feature = "configurable-interval")]
    if let Err(e) = out.refresh(node, "interval", interval.show().as_bytes()) {
        warn!("daemon: cannot publish interval: {e}");
    }

    loop {
        match out.refresh(node, DATA_ATTRIBUTE.name, &module.snapshot()) {
            Ok(()) => {}
            Err(HostError::Io) if !out.node_path(node).exists() => {
                info!("daemon: node {} removed", out.node_path(node).display());
                return MirrorExit::NodeRemoved;
            }
            Err(e) => warn!("daemon: cannot refresh snapshot: {e}"),
        }

        #[cfg(feature = "configurable-interval")]
        apply_interval(out, node, &interval);
        #[cfg(feature = "configurable-interval")]
        let period_ms = interval.millis();

        let stats = module.stats();
        if stats.ticks > 0 && stats.ticks % 1000 == 0 {
            info!(
                "daemon: ticks={} ok={} failed={} last_error={:?}",
                stats.ticks, stats.successes, stats.failures, stats.last_error
            );
        }

        if !stop.sleep(Duration::from_millis(u64::from(period_ms))) {
            info!("daemon: stop requested");
            return MirrorExit::Stopped;
        }
    }
}

/// Pick up an interval written into the `interval` file.
#[cfg(feature = "configurable-interval")]
fn apply_interval(out: &FsAttributeHost, node: &str, interval: &crate::publish::IntervalAttribute) {
    let Ok(raw) = out.read(node, "interval") else {
        return;
    };
    let written = String::from_utf8_lossy(&raw);
    if written.trim().parse::<u32>().ok() == Some(interval.millis()) {
        return;
    }
    if let Err(e) = interval.store(&written) {
        warn!("daemon: rejected interval {:?}: {e}", written.trim());
    }
    if let Err(e) = out.refresh(node, "interval", interval.show().as_bytes()) {
        warn!("daemon: cannot publish interval: {e}");
    }
}
