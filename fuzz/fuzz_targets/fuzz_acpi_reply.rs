//! Fuzz target: `acpi_call` reply parser and status validation.
//!
//! Feeds arbitrary bytes to `parse_reply` and, when an object comes back,
//! through the same validation the poller applies.  Must never panic.
//!
//! cargo fuzz run fuzz_acpi_reply

#![no_main]

use libfuzzer_sys::fuzz_target;
use mbb_skr::STATUS_LEN;
use mbb_skr::adapters::acpi_call::parse_reply;
use mbb_skr::app::ports::FirmwarePort;
use mbb_skr::error::CallFailure;
use mbb_skr::firmware::{EV20_METHOD, FirmwareObject, query};

struct Canned<'a>(&'a [u8]);

impl FirmwarePort for Canned<'_> {
    fn evaluate(&mut self, _method: &str) -> Result<Option<FirmwareObject>, CallFailure> {
        parse_reply(self.0)
    }
}

fuzz_target!(|data: &[u8]| {
    if let Ok(buf) = query(&mut Canned(data), EV20_METHOD) {
        assert_eq!(buf.as_bytes().len(), STATUS_LEN);
    }
});
