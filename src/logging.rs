use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::configuration::LoggingSettings;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Keeps the background log writer alive. Dropping it flushes pending lines to disk,
/// so hold it until the process exits.
pub struct LogGuard {
    _file: WorkerGuard,
}

/// Install the console and rotating-file subscribers. Call once, at startup.
pub fn init(settings: &LoggingSettings) -> Result<LogGuard> {
    let file = RotatingFile::open(
        &settings.dir,
        &settings.file_name,
        settings.max_bytes,
        settings.max_backups,
    )
    .with_context(|| format!("Failed to open log file in {}", settings.dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .context("Invalid log level")?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string())),
        )
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
                .with_writer(writer),
        )
        .try_init()
        .context("Failed to install the log subscriber")?;

    Ok(LogGuard { _file: guard })
}

/// A log file capped at `max_bytes`. When a write would cross the cap the file is
/// renamed to `<name>.1`, older backups shift up by one, and anything past
/// `max_backups` is removed.
pub struct RotatingFile {
    path: PathBuf,
    max_bytes: u64,
    max_backups: usize,
    file: File,
    written: u64,
}

impl RotatingFile {
    pub fn open(dir: &Path, file_name: &str, max_bytes: u64, max_backups: usize) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(file_name);
        let file = open_append(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path,
            max_bytes,
            max_backups,
            file,
            written,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.max_backups == 0 {
            self.file = OpenOptions::new()
                .write(true)
                .truncate(true)
                .open(&self.path)?;
            self.written = 0;
            return Ok(());
        }

        remove_if_exists(&self.backup_path(self.max_backups))?;
        for index in (1..self.max_backups).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                fs::rename(&from, self.backup_path(index + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1))?;

        self.file = open_append(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
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

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn line(n: usize) -> Vec<u8> {
        format!("{:0>9}\n", n).into_bytes()
    }

    #[test]
    fn test_creates_log_directory() -> io::Result<()> {
        let dir = TempDir::new()?;
        let logs = dir.path().join("logs");

        let file = RotatingFile::open(&logs, "news_collector.log", 100, 2)?;

        assert!(file.path().exists());
        assert_eq!(file.path(), logs.join("news_collector.log"));
        Ok(())
    }

    #[test]
    fn test_rotates_when_cap_is_crossed() -> io::Result<()> {
        let dir = TempDir::new()?;
        let mut file = RotatingFile::open(dir.path(), "app.log", 20, 3)?;

        // each line is 10 bytes, so two fit per file
        for n in 0..5 {
            file.write_all(&line(n))?;
        }
        file.flush()?;

        let current = fs::read_to_string(dir.path().join("app.log"))?;
        let first_backup = fs::read_to_string(dir.path().join("app.log.1"))?;
        let second_backup = fs::read_to_string(dir.path().join("app.log.2"))?;
        assert_eq!(current, "000000004\n");
        assert_eq!(first_backup, "000000002\n000000003\n");
        assert_eq!(second_backup, "000000000\n000000001\n");
        assert!(!dir.path().join("app.log.3").exists());
        Ok(())
    }

    #[test]
    fn test_keeps_at_most_max_backups() -> io::Result<()> {
        let dir = TempDir::new()?;
        let mut file = RotatingFile::open(dir.path(), "app.log", 10, 2)?;

        for n in 0..6 {
            file.write_all(&line(n))?;
        }
        file.flush()?;

        assert_eq!(fs::read_to_string(dir.path().join("app.log"))?, "000000005\n");
        assert_eq!(
            fs::read_to_string(dir.path().join("app.log.1"))?,
            "000000004\n"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("app.log.2"))?,
            "000000003\n"
        );
        assert!(!dir.path().join("app.log.3").exists());
        Ok(())
    }

    #[test]
    fn test_existing_size_counts_toward_cap() -> io::Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("app.log"), "0123456789012345")?;

        let mut file = RotatingFile::open(dir.path(), "app.log", 20, 1)?;
        file.write_all(&line(7))?;
        file.flush()?;

        assert_eq!(
            fs::read_to_string(dir.path().join("app.log.1"))?,
            "0123456789012345"
        );
        assert_eq!(fs::read_to_string(dir.path().join("app.log"))?, "000000007\n");
        Ok(())
    }

    #[test]
    fn test_zero_backups_truncates() -> io::Result<()> {
        let dir = TempDir::new()?;
        let mut file = RotatingFile::open(dir.path(), "app.log", 10, 0)?;

        file.write_all(&line(1))?;
        file.write_all(&line(2))?;
        file.flush()?;

        assert_eq!(fs::read_to_string(dir.path().join("app.log"))?, "000000002\n");
        assert!(!dir.path().join("app.log.1").exists());
        Ok(())
    }
}
