//! Maibenben special-key reader library.
//!
//! Polls the `\_SB_.PCI0.WMID.EV20` firmware method for the 32-byte
//! special-key status buffer, caches the latest snapshot and publishes it
//! read-only.  The core (`firmware`, `cache`, `poller`, `module`) talks to
//! the platform only through the traits in [`app::ports`]; the Linux
//! backends live in [`adapters`] and the daemon loop in [`daemon`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod cache;
pub mod config;
pub mod daemon;
pub mod error;
pub mod firmware;
pub mod module;
pub mod poller;
pub mod publish;
pub mod ratelimit;
pub mod status;

pub use error::{Error, Result};
pub use module::SkrModule;
pub use publish::SnapshotReader;
pub use status::{STATUS_LEN, StatusBuffer};
