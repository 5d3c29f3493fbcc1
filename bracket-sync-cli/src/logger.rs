use std::io::{self, Write};

use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Crates whose records are shown at the configured level. Everything else (the HTML parser
/// stack in particular) is capped at [`LevelFilter::Warn`].
const OWN_TARGETS: &[&str] = &["bracket_sync_core", "bracket_sync"];

pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(Logger { level }))?;
    log::set_max_level(level);
    Ok(())
}

#[derive(Copy, Clone, Debug)]
pub struct Logger {
    level: LevelFilter,
}

impl Logger {
    fn max_level(&self, target: &str) -> LevelFilter {
        let own = OWN_TARGETS.iter().any(|own| {
            target == *own || (target.starts_with(own) && target[own.len()..].starts_with("::"))
        });

        if own {
            self.level
        } else {
            self.level.min(LevelFilter::Warn)
        }
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARN ",
            Level::Info => "INFO ",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };

        // Stdout carries the slot tables.
        let _ = writeln!(
            io::stderr().lock(),
            "[{}] [{}:{}] [{}] {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.file().unwrap_or("???"),
            record.line().unwrap_or(0),
            level,
            record.args()
        );
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}
