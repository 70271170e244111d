//! Async, channel-backed file logger.
//!
//! One background thread per level, fed by an unbounded `crossbeam-channel`.
//! Lines are buffered and flushed either when the channel drains or once the
//! buffer crosses a size threshold, so a burst of log calls from the
//! day-recompute worker pool doesn't serialize on a single file handle per
//! call. Reworked from `stock_crawler`'s logging module (same channel +
//! background-thread shape, collapsed from four writers into one level-
//! tagged writer since this pipeline has no per-level log rotation need).

use std::{
    fmt::Write as _,
    fs::{self, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::OnceLock,
    thread,
};

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};

static LOGGER: OnceLock<Logger> = OnceLock::new();

const DEFAULT_LOG_DIR: &str = "log";

/// Starts the background writer thread rooted at `dir` (`App.logging.dir`,
/// §6.3). Must be called before the first log call if a non-default
/// directory is wanted; subsequent calls are no-ops since the writer thread
/// is already running. Callers that never call `init` get `DEFAULT_LOG_DIR`.
pub fn init(dir: &str) {
    let _ = LOGGER.set(Logger::new("quarter_engine", dir));
}

fn logger() -> &'static Logger {
    LOGGER.get_or_init(|| Logger::new("quarter_engine", DEFAULT_LOG_DIR))
}

struct Logger {
    writer: Sender<LogLine>,
}

struct LogLine {
    level: &'static str,
    msg: String,
}

impl Logger {
    fn new(name: &str, dir: &str) -> Self {
        let log_path = Self::log_path(name, dir).unwrap_or_else(|| {
            panic!("failed to create log directory {dir}");
        });
        let (tx, rx) = unbounded::<LogLine>();

        thread::spawn(move || {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .truncate(false)
                .open(&log_path)
                .unwrap_or_else(|e| panic!("failed to open log file {log_path:?}: {e}"));

            let mut writer = BufWriter::new(file);
            let mut line = String::with_capacity(4096);

            while let Ok(received) = rx.recv() {
                if writeln!(
                    &mut line,
                    "{} {} {}",
                    Local::now().format("%F %X%.6f"),
                    received.level,
                    received.msg
                )
                .is_err()
                {
                    continue;
                }

                if rx.is_empty() || line.len() >= 4096 {
                    if writer.write_all(line.as_bytes()).is_err() {
                        console(received.level, &line);
                    }
                    if writer.flush().is_err() {
                        console(received.level, &line);
                    }
                    line.clear();
                }
            }
        });

        Logger { writer: tx }
    }

    fn send(&self, level: &'static str, msg: String) {
        if self.writer.send(LogLine { level, msg }).is_err() {
            console(level, "log channel closed, dropping message");
        }
    }

    fn log_path(name: &str, dir: &str) -> Option<PathBuf> {
        let path = Path::new(dir);
        if !path.exists() {
            fs::create_dir_all(path).ok()?;
        }

        let mut log_path = PathBuf::from(path);
        log_path.push(format!("{}_{}.log", name, Local::now().format("%Y-%m-%d")));
        Some(log_path)
    }
}

fn console(level: &str, msg: &str) {
    println!("{} {} {}", Local::now().format("%F %X%.3f"), level, msg);
}

pub fn debug(msg: impl Into<String>) {
    logger().send("DEBUG", msg.into());
}

pub fn info(msg: impl Into<String>) {
    logger().send("INFO", msg.into());
}

pub fn warn(msg: impl Into<String>) {
    logger().send("WARN", msg.into());
}

pub fn error(msg: impl Into<String>) {
    logger().send("ERROR", msg.into());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_without_panicking() {
        info("quarter_engine logger smoke test".to_string());
        error(format!("{:?}", "formatted error"));
    }
}
