//! Service configuration parameters
//!
//! All tunable parameters for the special-key reader.  Defaults: EV20
//! polled every 500 ms, read-only `data` endpoint under the `mbb_skr` node.
//! The daemon may override them from a JSON file.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::firmware::EV20_METHOD;

/// Default delay between two ticks.
pub const DEFAULT_POLL_INTERVAL_MS: u32 = 500;
/// Lower bound for any poll interval (config or runtime attribute).
pub const MIN_POLL_INTERVAL_MS: u32 = 10;
/// Upper bound for any poll interval (config or runtime attribute).
pub const MAX_POLL_INTERVAL_MS: u32 = 60_000;

/// Capacity of [`SkrConfig::method_path`].
pub const METHOD_PATH_CAP: usize = 64;
/// Capacity of [`SkrConfig::log_level`].
pub const LOG_LEVEL_CAP: usize = 8;
/// Capacity of [`SkrConfig::node_name`].
pub const NODE_NAME_CAP: usize = 32;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_NODE_NAME: &str = "mbb_skr";

// Every string default must fit its field.
const _: () = assert!(EV20_METHOD.len() <= METHOD_PATH_CAP);
const _: () = assert!(DEFAULT_LOG_LEVEL.len() <= LOG_LEVEL_CAP);
const _: () = assert!(DEFAULT_NODE_NAME.len() <= NODE_NAME_CAP);

/// When the first tick runs relative to `on_load`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstTick {
    /// Tick as soon as the worker starts.
    Immediate,
    /// Wait one interval first (default).
    AfterInterval,
}

/// Core service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkrConfig {
    // --- Firmware ---
    /// Absolute ACPI path of the status method
    pub method_path: heapless::String<METHOD_PATH_CAP>,
    /// `acpi_call` control file used by the daemon backend
    pub acpi_call_path: std::path::PathBuf,

    // --- Timing ---
    /// Delay between ticks (milliseconds)
    pub poll_interval_ms: u32,
    /// First tick policy
    pub first_tick: FirstTick,

    // --- Logging ---
    /// Poll warnings refilled per second
    pub warn_per_sec: u32,
    /// Poll warnings allowed in one burst
    pub warn_burst: u32,
    /// Daemon log level (`error`, `warn`, `info`, `debug`, `trace`)
    pub log_level: heapless::String<LOG_LEVEL_CAP>,

    // --- Published attribute ---
    /// Node name the attribute group lives under
    pub node_name: heapless::String<NODE_NAME_CAP>,
    /// Directory the daemon creates the node in
    pub attr_root: std::path::PathBuf,
}

impl Default for SkrConfig {
    fn default() -> Self {
        Self {
            method_path: bounded(EV20_METHOD),
            acpi_call_path: "/proc/acpi/call".into(),

            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            first_tick: FirstTick::AfterInterval,

            warn_per_sec: 1,
            warn_burst: 5,
            log_level: bounded(DEFAULT_LOG_LEVEL),

            node_name: bounded(DEFAULT_NODE_NAME),
            attr_root: "/run".into(),
        }
    }
}

impl SkrConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|_| Error::Config("malformed JSON"))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the poller cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !self.method_path.starts_with('\\') {
            return Err(Error::Config("method_path must be an absolute ACPI path"));
        }
        validate_interval(self.poll_interval_ms).map_err(|_| {
            Error::Config("poll_interval_ms out of range")
        })?;
        if self.warn_per_sec == 0 || self.warn_burst == 0 {
            return Err(Error::Config("warning rate and burst must be non-zero"));
        }
        if self.node_name.is_empty() || self.node_name.contains('/') {
            return Err(Error::Config("node_name must be a single path component"));
        }
        if self.log_level().is_none() {
            return Err(Error::Config("unknown log_level"));
        }
        Ok(())
    }

    /// `log_level` as a `log` filter, `None` if unrecognised.
    pub fn log_level(&self) -> Option<log::LevelFilter> {
        self.log_level.parse().ok()
    }
}

/// Range check shared by the config and the runtime interval attribute.
pub fn validate_interval(ms: u32) -> Result<u32> {
    if (MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS).contains(&ms) {
        Ok(ms)
    } else {
        Err(Error::InvalidInput("poll interval out of range"))
    }
}

/// Copy a string default into its field.  The `const` checks above keep
/// every default within capacity; an oversized one trips the debug assert
/// instead of being cut short.
fn bounded<const N: usize>(s: &str) -> heapless::String<N> {
    debug_assert!(s.len() <= N, "default {s:?} exceeds {N} bytes");
    heapless::String::try_from(s).unwrap_or_default()
}
