//! Process-wide `log` backend that keeps warnings for inspection.
//!
//! Tests run in parallel, so assertions should match on text unique to the
//! test (a buffer length, a node name) rather than on counts.

use std::sync::{Mutex, Once};

use log::{Level, LevelFilter, Log, Metadata, Record};

struct Capture;

static CAPTURE: Capture = Capture;
static WARNINGS: Mutex<Vec<String>> = Mutex::new(Vec::new());

impl Log for Capture {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Warn
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            WARNINGS.lock().unwrap().push(record.args().to_string());
        }
    }

    fn flush(&self) {}
}

/// Install the capture logger once per test binary.
pub fn install() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        log::set_logger(&CAPTURE).unwrap();
        log::set_max_level(LevelFilter::Warn);
    });
}

/// Whether any captured warning contains `needle`.
pub fn warned(needle: &str) -> bool {
    WARNINGS.lock().unwrap().iter().any(|w| w.contains(needle))
}
