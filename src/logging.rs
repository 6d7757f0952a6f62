//! Ambient logging setup.
//!
//! Layers a size-rotated file sink under the standard `log` facade,
//! mirroring the reference implementation's
//! `RotatingFileHandler(maxBytes=5*1024*1024, backupCount=3)`, while also
//! printing to stderr for interactive runs via `env_logger`. Rotation and
//! write failures are themselves logged and never abort the pipeline.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Matches the reference's `RotatingFileHandler(maxBytes=5*1024*1024, ...)`.
const MAX_LOG_BYTES: u64 = 5 * 1024 * 1024;
/// Matches the reference's `backupCount=3`.
const MAX_BACKUPS: u32 = 3;

struct RotatingFile {
    dir: PathBuf,
    stem: &'static str,
    file: File,
    written: u64,
}

impl RotatingFile {
    fn open(dir: &Path, stem: &'static str) -> std::io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{stem}.log"));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata().map(|m| m.len()).unwrap_or(0);
        Ok(Self {
            dir: dir.to_path_buf(),
            stem,
            file,
            written,
        })
    }

    fn rotate(&mut self) -> std::io::Result<()> {
        for idx in (1..MAX_BACKUPS).rev() {
            let from = self.dir.join(format!("{}.log.{}", self.stem, idx));
            let to = self.dir.join(format!("{}.log.{}", self.stem, idx + 1));
            if from.exists() {
                let _ = fs::rename(&from, &to);
            }
        }
        let primary = self.dir.join(format!("{}.log", self.stem));
        let first_backup = self.dir.join(format!("{}.log.1", self.stem));
        fs::rename(&primary, &first_backup)?;
        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&primary)?;
        self.written = 0;
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        if self.written >= MAX_LOG_BYTES {
            self.rotate()?;
        }
        self.written += line.len() as u64 + 1;
        writeln!(self.file, "{line}")?;
        self.file.flush()
    }
}

struct FileLogger {
    inner: Mutex<RotatingFile>,
    level: log::LevelFilter,
}

impl log::Log for FileLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "{} - {} - {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.args()
        );
        eprintln!("{line}");
        if let Ok(mut inner) = self.inner.lock() {
            if let Err(e) = inner.write_line(&line) {
                eprintln!("webcam-rng: failed to write log file: {e}");
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            let _ = inner.file.flush();
        }
    }
}

/// Initialises process-wide logging: a rotating file under `log_dir`, and
/// stderr output gated by `RUST_LOG` (default `info`). Safe to call once
/// per process; a second call is a no-op (matches `env_logger`'s own
/// idempotence contract).
pub fn init(log_dir: &Path) {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(log::LevelFilter::Info);

    match RotatingFile::open(log_dir, "webcam_rng") {
        Ok(rotating) => {
            let logger = FileLogger {
                inner: Mutex::new(rotating),
                level,
            };
            if log::set_boxed_logger(Box::new(logger)).is_ok() {
                log::set_max_level(level);
            }
        }
        Err(e) => {
            eprintln!("webcam-rng: could not open log directory {log_dir:?}: {e}");
            let _ = env_logger::builder().filter_level(level).try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotates_past_the_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut rotating = RotatingFile::open(dir.path(), "test").unwrap();
        rotating.written = MAX_LOG_BYTES;
        rotating.write_line("triggers rotation").unwrap();
        assert!(dir.path().join("test.log.1").exists());
        assert!(rotating.written < MAX_LOG_BYTES);
    }
}
