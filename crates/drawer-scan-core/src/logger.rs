//! Stderr logging for the drawer-scan tools.
//!
//! Lines look like `   412ms INFO  drawer_scan: message`. Records from the
//! drawer-scan crates pass at the configured level; records from
//! dependencies (HTTP client, image codecs) are capped at `warn` so a
//! `debug` run stays readable.
//!
//! Install once at startup with [`init_with_level`]. With the `tracing`
//! feature, [`init_tracing`] installs a `tracing-subscriber` instead; it
//! also forwards `log` records.

use std::fmt;
use std::io::Write;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::EnvFilter;

/// Target prefix shared by every crate of the workspace.
const OWN_TARGET: &str = "drawer_scan";

/// Level cap for records from other crates.
const FOREIGN_CAP: LevelFilter = LevelFilter::Warn;

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

/// Whether a record at `level` from `target` passes under `filter`.
fn admits(filter: LevelFilter, level: Level, target: &str) -> bool {
    let limit = if target.starts_with(OWN_TARGET) {
        filter
    } else {
        filter.min(FOREIGN_CAP)
    };
    level <= limit
}

fn format_line(elapsed: Duration, level: Level, target: &str, args: fmt::Arguments<'_>) -> String {
    let krate = target.split("::").next().unwrap_or(target);
    format!("{:>6}ms {:<5} {krate}: {args}", elapsed.as_millis(), level)
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        admits(self.level, metadata.level(), metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(
            self.started.elapsed(),
            record.level(),
            record.target(),
            *record.args(),
        );
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger.
///
/// Only the first call installs; later calls keep the original level.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    let mut installed_now = false;
    let logger = LOGGER.get_or_init(|| {
        installed_now = true;
        StderrLogger {
            level,
            started: Instant::now(),
        }
    });
    if installed_now {
        log::set_logger(logger)?;
        log::set_max_level(logger.level);
    }
    Ok(())
}

/// Install a `tracing` subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the drawer-scan crates log at
/// `level` and everything else at `warn`. An unparsable `level` falls back
/// to `info`.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool, level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("warn,{OWN_TARGET}={level}")))
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,{OWN_TARGET}=info")));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(tracing_subscriber::fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}
