//! Console logger behind the `log` facade.
//!
//! Level comes from the `LOG` environment variable at build time
//! (`ERROR`..`TRACE`, default `DEBUG`). Output goes to the PL011 console;
//! lines from different cores are serialised by a mutex. The mutex does not
//! mask interrupts, so nothing reachable from an interrupt handler logs.

use core::fmt::{self, Write};

use log::{Level, LevelFilter, Log, Metadata, Record};
use spin::Mutex;

use crate::uart;

static LOG_MUTEX: Mutex<()> = Mutex::new(());

struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        uart::is_enabled()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let _lock = LOG_MUTEX.lock();
        let _ = write_record(&mut uart::writer(), record);
    }

    fn flush(&self) {
        let _lock = LOG_MUTEX.lock();
    }
}

fn level_color(level: Level) -> u8 {
    match level {
        Level::Error => 31, // Red
        Level::Warn => 93,  // BrightYellow
        Level::Info => 34,  // Blue
        Level::Debug => 32, // Green
        Level::Trace => 90, // BrightBlack
    }
}

fn write_record(w: &mut impl Write, record: &Record) -> fmt::Result {
    writeln!(
        w,
        "\u{1B}[{}m[{:>5}] {}\u{1B}[0m",
        level_color(record.level()),
        record.level(),
        record.args(),
    )
}

fn level_from_env(value: Option<&str>) -> LevelFilter {
    match value {
        Some("ERROR") => LevelFilter::Error,
        Some("WARN") => LevelFilter::Warn,
        Some("INFO") => LevelFilter::Info,
        Some("DEBUG") => LevelFilter::Debug,
        Some("TRACE") => LevelFilter::Trace,
        _ => LevelFilter::Debug,
    }
}

/// Install the console logger. Fails if another logger is already set.
pub fn init() -> Result<(), log::SetLoggerError> {
    static LOGGER: SimpleLogger = SimpleLogger;
    log::set_logger(&LOGGER)?;
    log::set_max_level(level_from_env(option_env!("LOG")));
    Ok(())
}
