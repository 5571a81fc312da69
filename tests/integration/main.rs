//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host with no firmware or
//! `/proc` access required.

mod lifecycle_tests;
mod log_capture;
mod poller_tests;
