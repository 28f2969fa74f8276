//! Logging pipeline: dual-writes to stderr and a per-run log file.
//!
//! Registered as the global logger for the `log` facade, so every
//! `log::info!`/`log::warn!`/`log::error!` in the pipeline lands both on
//! the console and on disk.

use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Logger that writes timestamped lines to stderr and, when a log
/// directory is available, appends them to a per-run log file.
pub struct BuildLogger {
    file: Option<Mutex<File>>,
    level: LevelFilter,
}

impl BuildLogger {
    fn new(log_file: Option<File>, level: LevelFilter) -> Self {
        BuildLogger {
            file: log_file.map(Mutex::new),
            level,
        }
    }

    fn format_line(record: &Record) -> String {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        format!(
            "[{}] [{}] [{}] {}",
            timestamp,
            record.level(),
            record.target(),
            record.args()
        )
    }
}

impl Log for BuildLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = Self::format_line(record);

        // Keep debug-level toolchain output off the console; it still goes
        // to the log file in full.
        if record.level() < Level::Debug {
            eprintln!("{}", line);
        }

        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = writeln!(file, "{}", line);
            }
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        }
    }
}

/// Create the per-run log file path inside `log_dir`.
fn log_file_path(log_dir: &Path) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    log_dir.join(format!("build-{}.log", stamp))
}

/// Initialize the global logger.
///
/// With `log_dir` set, the directory is created and a per-run log file is
/// opened inside it; a file that cannot be opened degrades to
/// stderr-only logging rather than failing the run.
pub fn initialize_logging(log_dir: Option<&Path>) -> Result<(), SetLoggerError> {
    let file = log_dir.and_then(|dir| {
        if let Err(e) = fs::create_dir_all(dir) {
            eprintln!(
                "[logger] WARNING: cannot create log dir {}: {}",
                dir.display(),
                e
            );
            return None;
        }
        let path = log_file_path(dir);
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!(
                    "[logger] WARNING: cannot open log file {}: {}",
                    path.display(),
                    e
                );
                None
            }
        }
    });

    let logger = BuildLogger::new(file, LevelFilter::Debug);
    log::set_boxed_logger(Box::new(logger)).map(|()| log::set_max_level(LevelFilter::Debug))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_line_includes_level_and_target() {
        let line = BuildLogger::format_line(
            &Record::builder()
                .args(format_args!("hello"))
                .level(Level::Info)
                .target("pipeline")
                .build(),
        );
        assert!(line.contains("[INFO]"));
        assert!(line.contains("[pipeline]"));
        assert!(line.ends_with("hello"));
    }

    #[test]
    fn test_log_file_path_shape() {
        let dir = TempDir::new().unwrap();
        let path = log_file_path(dir.path());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("build-"));
        assert!(name.ends_with(".log"));
    }

    #[test]
    fn test_logger_writes_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.log");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .unwrap();
        let logger = BuildLogger::new(Some(file), LevelFilter::Debug);

        logger.log(
            &Record::builder()
                .args(format_args!("patched link base"))
                .level(Level::Info)
                .target("patcher")
                .build(),
        );
        logger.flush();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("patched link base"));
    }
}
