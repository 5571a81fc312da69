//! Snapshot cache: the only shared mutable state of the poller.
//!
//! One writer (the poll worker) and any number of readers (the publish
//! interface).  Every operation runs inside the same critical section and
//! copies exactly [`STATUS_LEN`](crate::status::STATUS_LEN) bytes, so a
//! reader observes either the previous buffer or the new one in full.
//!
//! The lock is an `embassy-sync` blocking mutex over
//! [`CriticalSectionRawMutex`]: safe to take from interrupt-adjacent
//! contexts, never poisoned, and held only for a fixed-size copy.  No I/O
//! or allocation ever happens while it is held; the firmware call lives in
//! [`firmware`](crate::firmware) and runs entirely outside it.

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::status::StatusBuffer;

#[derive(Clone, Copy)]
struct CacheState {
    buf: StatusBuffer,
    /// Writes plus clears since construction.
    mutations: u64,
}

/// Last known status buffer plus the exclusive right to mutate it.
pub struct SnapshotCache {
    inner: Mutex<CriticalSectionRawMutex, Cell<CacheState>>,
}

impl SnapshotCache {
    /// A cache holding the all-zero buffer.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(CacheState {
                buf: StatusBuffer::ZEROED,
                mutations: 0,
            })),
        }
    }

    /// Replace the whole buffer.
    pub fn write(&self, buf: StatusBuffer) {
        self.replace(buf);
    }

    /// Zero the whole buffer (degraded-safe state).
    pub fn clear(&self) {
        self.replace(StatusBuffer::ZEROED);
    }

    /// Copy out the whole buffer.
    pub fn read(&self) -> StatusBuffer {
        self.inner.lock(|cell| cell.get().buf)
    }

    /// Number of writes and clears applied so far.
    pub fn mutations(&self) -> u64 {
        self.inner.lock(|cell| cell.get().mutations)
    }

    fn replace(&self, buf: StatusBuffer) {
        self.inner.lock(|cell| {
            let state = cell.get();
            cell.set(CacheState {
                buf,
                mutations: state.mutations.wrapping_add(1),
            });
        });
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}
