//! Logging init: file under XDG state dir, stderr when debugging or as a fallback.

use anyhow::Result;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

use crate::config::XDG_PREFIX;

/// Environment variable that turns on diagnostic trace to stderr.
pub const DEBUG_ENV: &str = "CLAUDE_SHIM_DEBUG";

const DEFAULT_FILTER: &str = "warn,shim_core=info,claude=info";

/// Writer that is either a file or stderr (used when file clone fails).
enum FileOrStderr {
    File(std::fs::File),
    Stderr,
}

impl io::Write for FileOrStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            FileOrStderr::File(f) => f.write(buf),
            FileOrStderr::Stderr => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            FileOrStderr::File(f) => f.flush(),
            FileOrStderr::Stderr => io::stderr().lock().flush(),
        }
    }
}

/// True when `CLAUDE_SHIM_DEBUG` is set to anything but empty or `0`.
pub fn debug_enabled() -> bool {
    debug_flag(std::env::var(DEBUG_ENV).ok().as_deref())
}

fn debug_flag(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some(v) if !v.is_empty() && v != "0")
}

/// Pick the subscriber for this process: stderr trace when debugging,
/// otherwise the state-dir log file, falling back to quiet stderr.
pub fn init() {
    if debug_enabled() {
        init_logging_debug();
        return;
    }
    if let Err(e) = init_logging() {
        init_logging_stderr();
        tracing::debug!("log file unavailable: {:#}", e);
    }
}

/// Initialize structured logging to `~/.local/state/claude-shim/shim.log`.
/// On failure (e.g. log dir unwritable), returns Err so the caller can fall back to stderr.
pub fn init_logging() -> Result<()> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix(XDG_PREFIX)?;
    let log_file_path: PathBuf = xdg_dirs.place_state_file("shim.log")?;
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)?;

    struct FileMakeWriter(std::fs::File);

    impl<'a> MakeWriter<'a> for FileMakeWriter {
        type Writer = FileOrStderr;

        fn make_writer(&'a self) -> Self::Writer {
            self.0
                .try_clone()
                .map(FileOrStderr::File)
                .unwrap_or(FileOrStderr::Stderr)
        }
    }

    let writer: BoxMakeWriter = BoxMakeWriter::new(FileMakeWriter(file));

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    tracing::debug!("logging to {}", log_file_path.display());

    Ok(())
}

/// Stderr at `warn` only, so the wrapped application's stderr stays clean.
pub fn init_logging_stderr() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

/// Full diagnostic trace to stderr (`CLAUDE_SHIM_DEBUG=1`).
pub fn init_logging_debug() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("debug,shim_core=trace,claude=trace"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
