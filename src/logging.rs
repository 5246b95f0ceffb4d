//! Timestamped console and file logging behind the `log` facade.
//!
//! Every line goes to stdout and is appended to
//! `<exe_dir>/logs/race_score_overlay.log`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::paths;

const LOG_FILE_NAME: &str = "race_score_overlay.log";
const CRATE_TARGET: &str = "race_score_overlay";

struct ConsoleFileLogger {
    file: Option<PathBuf>,
}

/// Our own records follow the configured level. Dependencies are further
/// capped at warn.
fn allows(target: &str, level: Level, max: LevelFilter) -> bool {
    if target.starts_with(CRATE_TARGET) {
        level <= max
    } else {
        level <= max.min(LevelFilter::Warn)
    }
}

impl Log for ConsoleFileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        allows(metadata.target(), metadata.level(), log::max_level())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(Local::now(), record.level(), &record.args().to_string());
        print!("{}", line);
        if let Some(path) = &self.file {
            append_line(path, &line);
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
    }
}

fn append_line(path: &Path, line: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = file.write_all(line.as_bytes());
    }
}

/// `[HH:MM:SS.mmm] LEVEL message\n`
pub fn format_line(at: DateTime<Local>, level: Level, message: &str) -> String {
    format!("[{}] {:<5} {}\n", at.format("%H:%M:%S%.3f"), level, message)
}

/// Parses a config level name, falling back to info.
pub fn parse_level(name: Option<&str>) -> LevelFilter {
    name.and_then(|n| n.trim().parse().ok())
        .unwrap_or(LevelFilter::Info)
}

pub fn log_file_path() -> PathBuf {
    paths::get_logs_dir().join(LOG_FILE_NAME)
}

/// Installs the logger at info level. Later calls are ignored.
pub fn init() {
    let logs_dir = paths::get_logs_dir();
    let file = std::fs::create_dir_all(&logs_dir)
        .ok()
        .map(|_| logs_dir.join(LOG_FILE_NAME));

    if log::set_boxed_logger(Box::new(ConsoleFileLogger { file })).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }
}

/// Applies the configured level once the config is loaded.
pub fn set_level(level: LevelFilter) {
    log::set_max_level(level);
}

/// Logs panics to the log file, even if the logger was never installed.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();

        let line = format_line(Local::now(), Level::Error, &format!("[PANIC]{} {}", location, msg));
        eprint!("{}", line);
        append_line(&log_file_path(), &line);
    }));
}
