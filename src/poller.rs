//! Periodic poller.
//!
//! A single worker evaluates the EV20 method once per tick and pushes the
//! result into the [`SnapshotCache`].
//!
//! ```text
//!            ┌────────── reschedule (interval) ──────────┐
//!            ▼                                           │
//!   on_load ──▶ Active ──tick──▶ query() ──ok──▶ write()─┤
//!                 │                  └──err──▶ clear() ──┘
//!                 │                             + rate-limited warn
//!                 └── stop(): drop signal, join ──▶ Stopped
//! ```
//!
//! A failed tick is never fatal: the cache degrades to all-zero and the
//! next tick retries.  `stop()` blocks until the worker has exited, so no
//! tick can run against torn-down resources.

use core::cell::Cell;
use core::time::Duration;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::JoinHandle;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{debug, error, info, trace, warn};

use crate::app::ports::FirmwarePort;
use crate::cache::SnapshotCache;
use crate::config::{FirstTick, METHOD_PATH_CAP};
use crate::error::{Error, FirmwareError, Result};
use crate::firmware;
use crate::ratelimit::WarnLimiter;
use crate::status::StatusBuffer;

/// Worker thread name (shows up in `ps -L` and panic messages).
const WORKER_NAME: &str = "skr-poll";
/// The worker only copies 32-byte buffers; a small stack is plenty.
const WORKER_STACK_KB: usize = 64;

// ═══════════════════════════════════════════════════════════════
//  Poll statistics
// ═══════════════════════════════════════════════════════════════

/// Counters describing the poll loop so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub ticks: u64,
    pub successes: u64,
    pub failures: u64,
    /// Failures since the last successful tick.
    pub consecutive_failures: u32,
    pub last_error: Option<FirmwareError>,
}

/// Shared, lock-protected [`PollStats`].
pub struct StatsCell {
    inner: Mutex<CriticalSectionRawMutex, Cell<PollStats>>,
}

impl StatsCell {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(PollStats {
                ticks: 0,
                successes: 0,
                failures: 0,
                consecutive_failures: 0,
                last_error: None,
            })),
        }
    }

    pub fn get(&self) -> PollStats {
        self.inner.lock(|cell| cell.get())
    }

    fn update(&self, f: impl FnOnce(&mut PollStats)) -> PollStats {
        self.inner.lock(|cell| {
            let mut stats = cell.get();
            f(&mut stats);
            cell.set(stats);
            stats
        })
    }
}

impl Default for StatsCell {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tick
// ═══════════════════════════════════════════════════════════════

/// Everything one tick needs.  Owned by the worker.
pub struct PollTask<F> {
    firmware: F,
    method: heapless::String<METHOD_PATH_CAP>,
    cache: Arc<SnapshotCache>,
    stats: Arc<StatsCell>,
    limiter: WarnLimiter,
}

impl<F: FirmwarePort> PollTask<F> {
    pub fn new(
        firmware: F,
        method: heapless::String<METHOD_PATH_CAP>,
        cache: Arc<SnapshotCache>,
        stats: Arc<StatsCell>,
        limiter: WarnLimiter,
    ) -> Self {
        Self {
            firmware,
            method,
            cache,
            stats,
            limiter,
        }
    }

    /// Run one poll: query, then write or clear the cache.
    ///
    /// The firmware call happens before the cache lock is taken.
    pub fn tick(&mut self) -> core::result::Result<StatusBuffer, FirmwareError> {
        let result = firmware::query(&mut self.firmware, &self.method);

        match result {
            Ok(buf) => {
                self.cache.write(buf);
                let before = self.stats.get().consecutive_failures;
                self.stats.update(|s| {
                    s.ticks += 1;
                    s.successes += 1;
                    s.consecutive_failures = 0;
                });
                if before > 0 {
                    info!("poller: {} recovered after {} failed polls", self.method, before);
                }
            }
            Err(e) => {
                self.cache.clear();
                let stats = self.stats.update(|s| {
                    s.ticks += 1;
                    s.failures += 1;
                    s.consecutive_failures = s.consecutive_failures.saturating_add(1);
                    s.last_error = Some(e);
                });
                match self.limiter.admit() {
                    Some(0) => warn!("poller: error polling {}: {e}; cache cleared", self.method),
                    Some(dropped) => warn!(
                        "poller: error polling {}: {e}; cache cleared ({} failures in a row, {} warnings suppressed)",
                        self.method, stats.consecutive_failures, dropped
                    ),
                    None => debug!("poller: {e} (rate-limited)"),
                }
            }
        }
        result
    }
}

// ═══════════════════════════════════════════════════════════════
//  Worker
// ═══════════════════════════════════════════════════════════════

/// Handle to the running poll worker.
pub struct Poller {
    stop: Option<mpsc::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl Poller {
    /// Spawn the worker.  The first tick runs per `first_tick`; later ticks
    /// are spaced by the current value of `interval_ms`, re-read after
    /// every tick.
    pub fn start<F>(
        mut task: PollTask<F>,
        interval_ms: Arc<AtomicU32>,
        first_tick: FirstTick,
    ) -> Result<Self>
    where
        F: FirmwarePort + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let current = move || Duration::from_millis(interval_ms.load(Ordering::Relaxed).into());

        let worker = spawn_worker(WORKER_NAME, WORKER_STACK_KB, move || {
            let mut delay = match first_tick {
                FirstTick::Immediate => Duration::ZERO,
                FirstTick::AfterInterval => current(),
            };
            loop {
                match stop_rx.recv_timeout(delay) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
                if let Err(e) = task.tick() {
                    trace!("poller: tick ended with {e}");
                }
                delay = current();
            }
            debug!("poller: worker exiting");
        })?;

        info!("poller: started (first tick {:?})", first_tick);
        Ok(Self {
            stop: Some(stop_tx),
            worker: Some(worker),
        })
    }

    /// `true` until [`stop`](Self::stop) has returned.
    pub fn is_active(&self) -> bool {
        self.worker.is_some()
    }

    /// Cancel the pending tick and wait for an in-flight one to finish.
    ///
    /// After this returns no tick runs again.  Idempotent.
    pub fn stop(&mut self) {
        // Dropping the sender wakes the worker out of its sleep.
        drop(self.stop.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("poller: worker panicked");
            }
            info!("poller: stopped");
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawn a named worker thread with an explicit stack size.
fn spawn_worker(
    name: &str,
    stack_kb: usize,
    f: impl FnOnce() + Send + 'static,
) -> Result<JoinHandle<()>> {
    debug!("Spawning '{}' (stack={}KB)", name, stack_kb);

    std::thread::Builder::new()
        .name(name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
        .map_err(|e| {
            error!("poller: thread creation failed: {e}");
            Error::Spawn
        })
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
