//! Logging setup
//!
//! One-shot commands log to stderr at `warn` (overridable with `RUST_LOG`).
//! The daemon logs at the configured level to a size-rotated file under the
//! XDG state directory, and to stderr unless the progress line owns the terminal.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

/// Daemon log file name inside [`log_dir`]
pub const DAEMON_LOG_FILE: &str = "daemon.log";

/// Directory holding the daemon log (`$XDG_STATE_HOME/idlesw`, falling back to the data dir)
#[must_use]
pub fn log_dir() -> Option<PathBuf> {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|dir| dir.join("idlesw"))
}

/// Initialize logging for one-shot CLI commands
pub fn init_cli() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
}

/// Initialize daemon logging
///
/// Filter format `idlesw=LEVEL` keeps dependency crates quiet. The log file
/// rotates once it holds `max_bytes`. The returned guard must be held until
/// shutdown so buffered lines reach the file.
#[must_use]
pub fn init_daemon(log_level: &str, max_bytes: u64, to_stderr: bool) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("idlesw={log_level}")));

    let (file_layer, guard) = match log_dir() {
        Some(dir) => {
            let appender = RotatingFileAppender::new(dir, DAEMON_LOG_FILE, max_bytes);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    let stderr_layer = to_stderr.then(|| fmt::layer().with_writer(io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    guard
}

/// Daemon log writer: `daemon.log` plus a single `daemon.log.old` backup
///
/// Counts bytes as it writes instead of asking the filesystem each time. A
/// log deleted from under the daemon is created again on the next write.
/// Files are created with 0o600 permissions.
pub struct RotatingFileAppender {
    path: PathBuf,
    backup_path: PathBuf,
    max_bytes: u64,
    /// Open log and the number of bytes it holds
    current: Option<(File, u64)>,
}

impl RotatingFileAppender {
    /// Create an appender for `dir/filename`, rotating once it holds `max_bytes`
    pub fn new(dir: impl Into<PathBuf>, filename: &str, max_bytes: u64) -> Self {
        let dir = dir.into();
        Self {
            path: dir.join(filename),
            backup_path: dir.join(format!("{filename}.old")),
            max_bytes,
            current: None,
        }
    }

    fn create_private(path: &Path, truncate: bool) -> io::Result<File> {
        let mut options = fs::OpenOptions::new();
        options.create(true);
        if truncate {
            options.write(true).truncate(true);
        } else {
            options.append(true);
        }

        #[cfg(unix)]
        options.mode(0o600);

        options.open(path)
    }

    fn current(&mut self) -> io::Result<&mut (File, u64)> {
        if self.current.is_some() && !self.path.exists() {
            self.current = None;
        }

        if self.current.is_none() {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = Self::create_private(&self.path, false)?;
            let len = file.metadata()?.len();
            self.current = Some((file, len));
        }

        self.current
            .as_mut()
            .ok_or_else(|| io::Error::other("daemon log not open"))
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.current = None;
        fs::rename(&self.path, &self.backup_path)?;
        self.current = Some((Self::create_private(&self.path, true)?, 0));
        Ok(())
    }
}

impl Write for RotatingFileAppender {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let max_bytes = self.max_bytes;
        let written = self.current()?.1;
        if written >= max_bytes
            && let Err(e) = self.rotate()
        {
            eprintln!("Failed to rotate {}: {e}", self.path.display());
        }

        let (file, written) = self.current()?;
        file.write_all(buf)?;
        *written += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.current.as_mut() {
            Some((file, _)) => file.flush(),
            None => Ok(()),
        }
    }
}
