//! mbb-skr daemon: Main Entry Point
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                   │
//! │                                                          │
//! │  AcpiCallFirmware   FsAttributeHost   StderrLogger       │
//! │  (FirmwarePort)     (AttributeHost)   (log::Log)         │
//! │                                                          │
//! │  ──────────────── Port Trait Boundary ──────────────     │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │  SkrModule: Poller ─▶ SnapshotCache ─▶ reader      │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `mbb-skr [config.json]`
//!
//! The snapshot is mirrored into `<attr_root>/<node_name>/data` once per
//! poll interval.  SIGTERM, SIGINT or SIGHUP (or removing the node
//! directory) stops the daemon and unloads the module cleanly.
#![deny(unused_must_use)]

use anyhow::{Context, Result, bail};
use log::{error, info, warn};

use mbb_skr::SkrModule;
use mbb_skr::adapters::acpi_call::AcpiCallFirmware;
use mbb_skr::adapters::attr_file::FsAttributeHost;
use mbb_skr::adapters::log_sink;
use mbb_skr::config::SkrConfig;
use mbb_skr::daemon::{self, StopFlag, TERMINATION_SIGNALS};

fn load_config() -> Result<SkrConfig> {
    let Some(path) = std::env::args_os().nth(1) else {
        return Ok(SkrConfig::default());
    };
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.to_string_lossy()))?;
    SkrConfig::from_json(&text).with_context(|| format!("parsing {}", path.to_string_lossy()))
}

fn main() -> Result<()> {
    let config = load_config()?;
    let level = config.log_level().unwrap_or(log::LevelFilter::Info);
    log_sink::init(level).context("installing logger")?;

    info!("mbb-skr v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Signals ────────────────────────────────────────────
    let stop = StopFlag::on_signals(&TERMINATION_SIGNALS).context("installing signal handlers")?;

    // ── 2. Firmware backend ───────────────────────────────────
    let firmware = AcpiCallFirmware::new(&config.acpi_call_path);
    if let Err(e) = firmware.probe() {
        // Not fatal: the poller publishes zeros until the call succeeds.
        warn!(
            "{} unavailable ({e}); is the acpi_call module loaded?",
            firmware.path().display()
        );
    }

    // ── 3. Load ───────────────────────────────────────────────
    let host = FsAttributeHost::new(&config.attr_root);
    let module = match SkrModule::on_load(&config, firmware, host) {
        Ok(m) => m,
        Err(e) => {
            error!("load failed: {e} (status {})", e.errno());
            bail!("load failed with status {}", e.errno());
        }
    };
    let out = FsAttributeHost::new(&config.attr_root);
    info!("publishing to {}", out.node_path(module.node_name()).display());

    // ── 4. Mirror until stopped ───────────────────────────────
    let exit = daemon::mirror(&module, &out, &stop, config.poll_interval_ms);
    info!("shutting down ({exit:?})");
    module.on_unload();
    Ok(())
}
