//! Minimal stderr logger for the command-line binary.

use std::io::Write;

use log::{Level, LevelFilter, Log, Metadata, Record};

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(
            &chrono::Local::now().format("%H:%M:%S").to_string(),
            record.level(),
            &record.args().to_string(),
        );
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn format_line(timestamp: &str, level: Level, message: &str) -> String {
    let prefix = match level {
        Level::Error => "ERR ",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DBG ",
        Level::Trace => "TRC ",
    };
    format!("{timestamp} [{prefix}] {message}")
}

/// Install the logger. Calling this more than once only updates the level.
pub fn init(level: LevelFilter) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}

/// Shift `base` by `-q`/`-v` counts, clamped to `Off..=Trace`.
pub fn adjust_level(base: LevelFilter, verbose: u8, quiet: u8) -> LevelFilter {
    const LEVELS: [LevelFilter; 6] = [
        LevelFilter::Off,
        LevelFilter::Error,
        LevelFilter::Warn,
        LevelFilter::Info,
        LevelFilter::Debug,
        LevelFilter::Trace,
    ];
    let index = LEVELS.iter().position(|&l| l == base).unwrap_or(3) as i32;
    let shifted = (index + verbose as i32 - quiet as i32).clamp(0, LEVELS.len() as i32 - 1);
    LEVELS[shifted as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line() {
        assert_eq!(
            format_line("12:00:01", Level::Warn, "bad signature"),
            "12:00:01 [WARN] bad signature"
        );
        assert_eq!(
            format_line("00:00:00", Level::Error, "x"),
            "00:00:00 [ERR ] x"
        );
    }

    #[test]
    fn test_adjust_level() {
        assert_eq!(adjust_level(LevelFilter::Info, 1, 0), LevelFilter::Debug);
        assert_eq!(adjust_level(LevelFilter::Info, 5, 0), LevelFilter::Trace);
        assert_eq!(adjust_level(LevelFilter::Info, 0, 1), LevelFilter::Warn);
        assert_eq!(adjust_level(LevelFilter::Warn, 0, 9), LevelFilter::Off);
        assert_eq!(adjust_level(LevelFilter::Debug, 1, 1), LevelFilter::Debug);
    }
}
