//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements     | Connects to                 |
//! |-------------|----------------|-----------------------------|
//! | `acpi_call` | FirmwarePort   | `/proc/acpi/call`           |
//! | `attr_file` | AttributeHost  | node directory on a tmpfs   |
//! | `log_sink`  | `log::Log`     | stderr (journald / console) |

pub mod acpi_call;
pub mod attr_file;
pub mod log_sink;
