//! Module lifecycle: the context object the host runtime loads and unloads.
//!
//! [`SkrModule`] owns everything one reader instance needs: the snapshot
//! cache, the poll worker, the interval cell and the attribute host.  There
//! is no process-wide state, so several independent instances can coexist
//! (the integration tests rely on this).
//!
//! ## Load order
//!
//! 1. create the node
//! 2. create the attribute group (rollback: remove node)
//! 3. start the poller on a zeroed cache (rollback: remove group, node)
//!
//! ## Unload order
//!
//! 1. stop the poller and wait for it
//! 2. remove the attribute group
//! 3. remove the node

use std::sync::Arc;
use std::sync::atomic::AtomicU32;

use log::{error, info};

use crate::app::ports::{AttributeHost, FirmwarePort};
use crate::cache::SnapshotCache;
use crate::config::{NODE_NAME_CAP, SkrConfig};
use crate::error::{Error, Result};
use crate::poller::{PollStats, PollTask, Poller, StatsCell};
use crate::publish::{ATTRIBUTES, SnapshotReader};
use crate::ratelimit::WarnLimiter;
use crate::status::STATUS_LEN;

/// A loaded special-key reader.
pub struct SkrModule<H: AttributeHost> {
    node: heapless::String<NODE_NAME_CAP>,
    host: H,
    cache: Arc<SnapshotCache>,
    stats: Arc<StatsCell>,
    #[cfg_attr(not(feature = "configurable-interval"), allow(dead_code))]
    interval_ms: Arc<AtomicU32>,
    poller: Poller,
    loaded: bool,
}

impl<H: AttributeHost> SkrModule<H> {
    /// Register the published endpoints and start polling.
    ///
    /// On failure every resource created so far is released, latest first,
    /// and the error's [`errno`](Error::errno) is the status to report.
    pub fn on_load<F>(config: &SkrConfig, firmware: F, mut host: H) -> Result<Self>
    where
        F: FirmwarePort + Send + 'static,
    {
        config.validate()?;
        let node = config.node_name.clone();

        host.create_node(&node).map_err(|e| {
            error!("module: cannot create node '{}': {e}", node);
            Error::from(e)
        })?;

        if let Err(e) = host.create_group(&node, ATTRIBUTES) {
            error!("module: cannot create attributes under '{}': {e}", node);
            host.remove_node(&node);
            return Err(e.into());
        }

        let cache = Arc::new(SnapshotCache::new());
        let stats = Arc::new(StatsCell::new());
        let interval_ms = Arc::new(AtomicU32::new(config.poll_interval_ms));

        let task = PollTask::new(
            firmware,
            config.method_path.clone(),
            Arc::clone(&cache),
            Arc::clone(&stats),
            WarnLimiter::new(config.warn_per_sec, config.warn_burst),
        );
        let poller = match Poller::start(task, Arc::clone(&interval_ms), config.first_tick) {
            Ok(p) => p,
            Err(e) => {
                host.remove_group(&node, ATTRIBUTES);
                host.remove_node(&node);
                return Err(e);
            }
        };

        info!(
            "module: loaded '{}' polling {} every {} ms",
            node, config.method_path, config.poll_interval_ms
        );
        Ok(Self {
            node,
            host,
            cache,
            stats,
            interval_ms,
            poller,
            loaded: true,
        })
    }

    /// Stop polling and remove the published endpoints.
    pub fn on_unload(mut self) {
        self.teardown();
    }

    /// Current 32-byte snapshot.
    pub fn snapshot(&self) -> [u8; STATUS_LEN] {
        self.cache.read().into_bytes()
    }

    /// A read handle that outlives borrows of the module.
    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader::new(Arc::clone(&self.cache))
    }

    /// Handle for the writable interval endpoint.
    #[cfg(feature = "configurable-interval")]
    pub fn interval_attribute(&self) -> crate::publish::IntervalAttribute {
        crate::publish::IntervalAttribute::new(Arc::clone(&self.interval_ms))
    }

    /// Cache writes plus clears since load.
    pub fn cache_mutations(&self) -> u64 {
        self.cache.mutations()
    }

    pub fn stats(&self) -> PollStats {
        self.stats.get()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_active()
    }

    pub fn node_name(&self) -> &str {
        &self.node
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    fn teardown(&mut self) {
        if !self.loaded {
            return;
        }
        self.loaded = false;
        self.poller.stop();
        self.host.remove_group(&self.node, ATTRIBUTES);
        self.host.remove_node(&self.node);
        info!("module: '{}' unloaded", self.node);
    }
}

impl<H: AttributeHost> Drop for SkrModule<H> {
    fn drop(&mut self) {
        self.teardown();
    }
}
