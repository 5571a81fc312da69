//! Port traits: the boundary between the polling core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SkrModule (core)
//! ```
//!
//! Driven adapters (firmware backends, attribute hosts) implement these
//! traits.  [`SkrModule`](crate::module::SkrModule) consumes them via
//! generics, so the core never touches `/proc`, the filesystem or ACPI
//! directly and can run against scripted mocks on any host.
//!
//! ## Security notes
//!
//! - **FirmwarePort** replies may carry key-event data.  The core scrubs
//!   every returned object; implementations must scrub their own transport
//!   buffers.
//! - **AttributeHost** implementations must honour the requested file mode:
//!   the `data` endpoint is read-only.

use crate::error::{CallFailure, HostError};
use crate::firmware::FirmwareObject;

// ───────────────────────────────────────────────────────────────
// Firmware port (driven adapter: platform firmware → core)
// ───────────────────────────────────────────────────────────────

/// Synchronous call-by-name firmware method evaluation.
pub trait FirmwarePort {
    /// Evaluate `method` with no arguments.
    ///
    /// * `Err(_)`: the firmware layer reported a failure.
    /// * `Ok(None)`: the call succeeded but produced no object.
    /// * `Ok(Some(obj))`: ownership of the result passes to the caller.
    ///
    /// May block for a device-dependent time.  Never called concurrently
    /// with itself.
    fn evaluate(&mut self, method: &str) -> Result<Option<FirmwareObject>, CallFailure>;
}

impl<T: FirmwarePort + ?Sized> FirmwarePort for Box<T> {
    fn evaluate(&mut self, method: &str) -> Result<Option<FirmwareObject>, CallFailure> {
        (**self).evaluate(method)
    }
}

// ───────────────────────────────────────────────────────────────
// Attribute host (driven adapter: core → published endpoints)
// ───────────────────────────────────────────────────────────────

/// One published attribute of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSpec {
    pub name: &'static str,
    /// Unix permission bits, e.g. `0o444`.
    pub mode: u32,
}

/// Registers the node and attribute group the core publishes through.
///
/// The lifecycle creates the node first and the group second; teardown and
/// rollback release them in reverse order.
pub trait AttributeHost {
    /// Create the node (directory / kobject) named `name`.
    fn create_node(&mut self, name: &str) -> Result<(), HostError>;

    /// Create every attribute in `attrs` under `node`.  On error, any
    /// attribute already created by this call must be removed again.
    fn create_group(&mut self, node: &str, attrs: &[AttributeSpec]) -> Result<(), HostError>;

    /// Remove the attribute group.  Best-effort; never fails.
    fn remove_group(&mut self, node: &str, attrs: &[AttributeSpec]);

    /// Remove the node.  Best-effort; never fails.
    fn remove_node(&mut self, node: &str);
}
