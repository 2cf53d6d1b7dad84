//! Logging setup
//!
//! JSON logs to stdout, optionally mirrored to a size-rotated file.

use anyhow::Context;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Rotate once the active file would exceed this size (10MB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Number of files kept, counting the active one
pub const DEFAULT_MAX_FILES: usize = 5;

/// Size-rotated log file
///
/// `app.log` is the active file; older output moves to `app.log.1`,
/// `app.log.2`, ... and anything beyond `max_files` is deleted.
#[derive(Debug, Clone)]
pub struct RollingFileWriter {
    inner: Arc<Mutex<RollingState>>,
}

#[derive(Debug)]
struct RollingState {
    path: PathBuf,
    file: File,
    size: u64,
    max_size: u64,
    max_files: usize,
}

impl RollingFileWriter {
    pub fn new(path: impl AsRef<Path>, max_size: u64, max_files: usize) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.file_name().is_none() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("log path has no file name: {}", path.display()),
            ));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = open_append(&path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            inner: Arc::new(Mutex::new(RollingState {
                path,
                file,
                size,
                max_size,
                max_files: max_files.max(1),
            })),
        })
    }

    pub fn with_defaults(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::new(path, DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_FILES)
    }

    fn state(&self) -> MutexGuard<'_, RollingState> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RollingState {
    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.max_files == 1 {
            fs::remove_file(&self.path)?;
        } else {
            let _ = fs::remove_file(self.numbered(self.max_files - 1));
            for index in (1..self.max_files - 1).rev() {
                let from = self.numbered(index);
                if from.exists() {
                    fs::rename(&from, self.numbered(index + 1))?;
                }
            }
            fs::rename(&self.path, self.numbered(1))?;
        }

        self.file = open_append(&self.path)?;
        self.size = 0;
        Ok(())
    }

    fn numbered(&self, index: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }
}

impl Write for RollingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state();
        if state.size > 0 && state.size + buf.len() as u64 > state.max_size {
            state.rotate()?;
        }
        let written = state.file.write(buf)?;
        state.size += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.state().file.flush()
    }
}

impl<'a> fmt::MakeWriter<'a> for RollingFileWriter {
    type Writer = RollingFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over `log_level` when set.
pub fn init_tracing(log_level: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let console_layer = fmt::layer().json().with_filter(filter());

    let file_layer = match log_file {
        Some(path) => {
            let writer = RollingFileWriter::with_defaults(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_filter(filter()),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if let Some(path) = log_file {
        tracing::info!(
            path = %path.display(),
            max_file_size = DEFAULT_MAX_FILE_SIZE,
            max_files = DEFAULT_MAX_FILES,
            "File logging enabled"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/logs/gateway.log");

        let _writer = RollingFileWriter::with_defaults(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_appends_to_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gateway.log");
        fs::write(&path, "earlier\n").unwrap();

        let mut writer = RollingFileWriter::with_defaults(&path).unwrap();
        writer.write_all(b"later\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "earlier\nlater\n");
    }

    #[test]
    fn test_rotation_keeps_bounded_history() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gateway.log");
        let mut writer = RollingFileWriter::new(&path, 64, 3).unwrap();

        for i in 0..20 {
            writeln!(writer, "line {:02}: credential token_1 rotated", i).unwrap();
        }
        writer.flush().unwrap();

        assert!(path.exists());
        assert!(dir.path().join("gateway.log.1").exists());
        assert!(dir.path().join("gateway.log.2").exists());
        assert!(!dir.path().join("gateway.log.3").exists());

        let active = fs::read_to_string(&path).unwrap();
        assert!(active.contains("line 19"));
        assert!(active.len() <= 64);
    }

    #[test]
    fn test_clones_share_one_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gateway.log");
        let mut first = RollingFileWriter::with_defaults(&path).unwrap();
        let mut second = first.clone();

        first.write_all(b"a\n").unwrap();
        second.write_all(b"b\n").unwrap();
        first.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\n");
    }
}
