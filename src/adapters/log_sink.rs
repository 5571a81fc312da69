//! Stderr log sink.
//!
//! Backs the `log` facade for the daemon.  Lines look like the ESP-IDF
//! console format so they read the same under journald:
//!
//! ```text
//! W (1500) mbb_skr::poller: poll: EV20 call failed: AE_NOT_FOUND
//! ```

use std::io::Write;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Logger writing one line per record to stderr.
pub struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

/// Install the logger and set the global level.  Fails if a logger is
/// already installed.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    started();
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

fn started() -> Instant {
    static START: OnceLock<Instant> = OnceLock::new();
    *START.get_or_init(Instant::now)
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut err = std::io::stderr().lock();
        let _ = write_record(&mut err, record, started().elapsed());
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn write_record<W: Write>(out: &mut W, record: &Record, uptime: Duration) -> std::io::Result<()> {
    let tag = match record.level() {
        Level::Error => 'E',
        Level::Warn => 'W',
        Level::Info => 'I',
        Level::Debug => 'D',
        Level::Trace => 'V',
    };
    writeln!(
        out,
        "{tag} ({}) {}: {}",
        uptime.as_millis(),
        record.target(),
        record.args()
    )
}
