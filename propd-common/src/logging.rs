//! Logging setup
//!
//! All components log through `tracing`. The subscriber writes to stderr
//! by default; an optional file sink is added for long-running imports.
//! The file sink rotates by size: when the active file would grow past
//! the limit it is renamed to `<name>.1`, older backups shift up, and a
//! fresh file is started, keeping a bounded number of backups.

use anyhow::Result;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Size-based rotation settings for the file sink
#[derive(Debug, Clone, Copy)]
pub struct LogRotation {
    /// Rotate when the active file would exceed this many bytes
    pub max_bytes: u64,
    /// Number of rotated files kept as `<name>.1` .. `<name>.N`
    pub backups: usize,
}

impl Default for LogRotation {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            backups: 3,
        }
    }
}

/// Append-only writer that rotates the file by size.
///
/// tracing-appender only rolls on time boundaries, so the size policy
/// lives here; the writer still goes through `non_blocking` so the
/// subscriber never waits on disk.
struct SizeRollingFile {
    path: PathBuf,
    file: File,
    written: u64,
    rotation: LogRotation,
}

impl SizeRollingFile {
    fn open(path: PathBuf, rotation: LogRotation) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path,
            file,
            written,
            rotation,
        })
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{index}"));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.rotation.backups == 0 {
            self.file = OpenOptions::new()
                .write(true)
                .truncate(true)
                .open(&self.path)?;
            self.written = 0;
            return Ok(());
        }

        // Shift name.1 .. name.N-1 up one slot, dropping the oldest
        for index in (1..self.rotation.backups).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                fs::rename(&from, self.backup_path(index + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1))?;

        self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

impl Write for SizeRollingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.rotation.max_bytes {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Map level spellings from other logging traditions onto tracing's.
/// Anything that is not a known alias passes through as a filter
/// directive.
fn normalize_level(level: &str) -> String {
    match level.to_ascii_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" => "error".to_string(),
        _ => level.to_string(),
    }
}

/// Initialize the global tracing subscriber.
///
/// `level` is a filter directive ("debug", "info", ...); "warning" and
/// "critical" are accepted as aliases for "warn" and "error". When
/// `log_file` is given, output goes to that file through a non-blocking
/// size-rotating appender; the returned guard must be held for the life
/// of the process so buffered lines are flushed on shutdown.
pub fn init_logging(
    level: &str,
    log_file: Option<&Path>,
    rotation: LogRotation,
) -> Result<Option<WorkerGuard>> {
    let level = normalize_level(level);
    let filter = EnvFilter::try_new(&level).or_else(|_| EnvFilter::try_new("info"))?;

    match log_file {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)?;
            }

            let appender = SizeRollingFile::open(path.to_path_buf(), rotation)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();

            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rotation(max_bytes: u64, backups: usize) -> LogRotation {
        LogRotation { max_bytes, backups }
    }

    #[test]
    fn test_rotation_shifts_backups_and_drops_oldest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("propd.log");
        let mut sink = SizeRollingFile::open(path.clone(), rotation(10, 2)).unwrap();

        // 9-byte lines against a 10-byte cap: every write after the
        // first forces a rotation
        sink.write_all(b"first-8!\n").unwrap();
        sink.write_all(b"second-8\n").unwrap();
        sink.write_all(b"third-8!\n").unwrap();
        sink.write_all(b"fourth-8\n").unwrap();
        sink.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "fourth-8\n");
        assert_eq!(
            fs::read_to_string(dir.path().join("propd.log.1")).unwrap(),
            "third-8!\n"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("propd.log.2")).unwrap(),
            "second-8\n"
        );
        assert!(
            !dir.path().join("propd.log.3").exists(),
            "oldest line fell off the end"
        );
    }

    #[test]
    fn test_reopened_sink_counts_existing_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("propd.log");
        {
            let mut sink = SizeRollingFile::open(path.clone(), rotation(10, 1)).unwrap();
            sink.write_all(b"123456789").unwrap();
        }

        let mut sink = SizeRollingFile::open(path.clone(), rotation(10, 1)).unwrap();
        sink.write_all(b"overflow").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "overflow");
        assert_eq!(
            fs::read_to_string(dir.path().join("propd.log.1")).unwrap(),
            "123456789"
        );
    }

    #[test]
    fn test_zero_backups_truncates_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("propd.log");
        let mut sink = SizeRollingFile::open(path.clone(), rotation(10, 0)).unwrap();

        sink.write_all(b"first-8!\n").unwrap();
        sink.write_all(b"second-8\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second-8\n");
        assert!(!dir.path().join("propd.log.1").exists());
    }

    #[test]
    fn test_level_aliases_normalized() {
        assert_eq!(normalize_level("WARNING"), "warn");
        assert_eq!(normalize_level("critical"), "error");
        assert_eq!(normalize_level("debug"), "debug");
        assert_eq!(normalize_level("propd_import=trace"), "propd_import=trace");
    }
}
