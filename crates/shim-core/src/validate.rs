//! Binary validation: is the cached file really the application, and does it run?
//!
//! Fails closed. The positive check runs `<binary> --version` and looks for the
//! application's identity string, which rejects shims that answer with some
//! other program's banner (a bare JS runtime printing its own help, say).

use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crate::storage;

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const BUSY_RETRIES: u32 = 10;
/// Enough for any version banner.
const MAX_OUTPUT: usize = 64 * 1024;
/// Minimum wait for the output reader once the probe has exited.
const OUTPUT_GRACE: Duration = Duration::from_millis(100);

/// Why a binary was rejected.
#[derive(Debug, thiserror::Error)]
pub enum Invalid {
    #[error("binary is missing")]
    Missing,
    #[error("binary is not executable")]
    NotExecutable,
    #[error("could not run binary: {0}")]
    Spawn(#[from] io::Error),
    #[error("--version did not finish within {0:?}")]
    TimedOut(Duration),
    #[error("--version exited with {0}")]
    Exit(ExitStatus),
    #[error("--version printed {0:?}, not the expected identity")]
    WrongIdentity(String),
}

#[derive(Debug, Clone)]
pub struct Validator {
    /// Substring the real application prints for `--version`.
    pub identity_marker: String,
    pub timeout: Duration,
}

impl Validator {
    pub fn new(identity_marker: impl Into<String>, timeout: Duration) -> Self {
        Self {
            identity_marker: identity_marker.into(),
            timeout,
        }
    }

    pub fn from_config(cfg: &crate::config::ShimConfig) -> Self {
        Self::new(
            cfg.identity_marker.clone(),
            Duration::from_secs(cfg.validate_timeout_secs),
        )
    }

    pub fn validate(&self, path: &Path) -> bool {
        match self.check(path) {
            Ok(()) => true,
            Err(reason) => {
                tracing::info!(path = %path.display(), "binary failed validation: {}", reason);
                false
            }
        }
    }

    /// Like [`validate`](Self::validate) but says why.
    pub fn check(&self, path: &Path) -> Result<(), Invalid> {
        if !path.is_file() {
            return Err(Invalid::Missing);
        }
        if !storage::is_executable(path) {
            return Err(Invalid::NotExecutable);
        }
        let mut child = spawn_probe(path)?;
        let deadline = Instant::now() + self.timeout;
        // drain concurrently so a chatty binary cannot stall on a full pipe
        let output = child.stdout.take().map(drain_capped);
        let status = match wait_with_timeout(&mut child, self.timeout)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Invalid::TimedOut(self.timeout));
            }
        };
        let raw = match output {
            // a grandchild may still hold the pipe open after exit
            Some(rx) => match rx.recv_timeout(
                deadline
                    .saturating_duration_since(Instant::now())
                    .max(OUTPUT_GRACE),
            ) {
                Ok(raw) => raw?,
                Err(mpsc::RecvTimeoutError::Timeout) => return Err(Invalid::TimedOut(self.timeout)),
                Err(mpsc::RecvTimeoutError::Disconnected) => Vec::new(),
            },
            None => Vec::new(),
        };
        // non-UTF-8 output cannot contain the marker anyway
        let stdout = String::from_utf8_lossy(&raw);
        if !status.success() {
            return Err(Invalid::Exit(status));
        }
        if !stdout.contains(&self.identity_marker) {
            let first_line = stdout.lines().next().unwrap_or("").trim().to_string();
            return Err(Invalid::WrongIdentity(first_line));
        }
        Ok(())
    }
}

/// Read `out` to EOF on a helper thread, keeping the first
/// [`MAX_OUTPUT`] bytes and discarding the rest.
fn drain_capped<R: Read + Send + 'static>(mut out: R) -> mpsc::Receiver<io::Result<Vec<u8>>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut kept = Vec::new();
        let mut buf = [0u8; 8192];
        let result = loop {
            match out.read(&mut buf) {
                Ok(0) => break Ok(kept),
                Ok(n) => {
                    let room = MAX_OUTPUT.saturating_sub(kept.len());
                    kept.extend_from_slice(&buf[..n.min(room)]);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => break Err(e),
            }
        };
        let _ = tx.send(result);
    });
    rx
}

/// A file written a moment ago can still be "busy" if another thread forked
/// while it was open for writing; retry briefly instead of failing.
fn spawn_probe(path: &Path) -> io::Result<Child> {
    let mut attempt = 0;
    loop {
        let spawned = Command::new(path)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Err(e) if is_text_busy(&e) && attempt < BUSY_RETRIES => {
                attempt += 1;
                std::thread::sleep(POLL_INTERVAL * attempt);
            }
            other => return other,
        }
    }
}

#[cfg(unix)]
fn is_text_busy(e: &io::Error) -> bool {
    e.raw_os_error() == Some(libc::ETXTBSY)
}

#[cfg(not(unix))]
fn is_text_busy(_e: &io::Error) -> bool {
    false
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}
