//! Fire-and-forget background work.
//!
//! A background update runs as a separate OS process: the launcher re-executes
//! itself with [`BACKGROUND_FLAG`], null stdio, in its own session, and never
//! waits for it. No memory is shared; the child finds the install root the
//! same deterministic way the parent did.

use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::logging::DEBUG_ENV;

/// Reserved argument that turns the launcher into the background worker.
pub const BACKGROUND_FLAG: &str = "--shim-background-update";

/// Starts a background update and returns immediately.
pub trait Detach {
    /// Launch the staging of `version`. The caller neither joins nor
    /// observes the result; an error here only means the launch failed.
    fn spawn_update(&self, version: &str) -> io::Result<()>;
}

/// Production [`Detach`]: a disowned copy of the launcher executable.
#[derive(Debug, Clone)]
pub struct DetachedProcess {
    exe: PathBuf,
}

impl DetachedProcess {
    pub fn new(exe: impl Into<PathBuf>) -> Self {
        Self { exe: exe.into() }
    }

    pub fn current() -> io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    fn command(&self, version: &str) -> Command {
        let mut cmd = Command::new(&self.exe);
        cmd.arg(BACKGROUND_FLAG)
            .arg(version)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            // the worker's stderr is gone; keep its logs in the state-dir file
            .env_remove(DEBUG_ENV);
        detach(&mut cmd);
        cmd
    }
}

impl Detach for DetachedProcess {
    fn spawn_update(&self, version: &str) -> io::Result<()> {
        let child = self.command(version).spawn()?;
        tracing::debug!(pid = child.id(), %version, "background update started");
        // Dropping `Child` neither waits for nor kills the process.
        drop(child);
        Ok(())
    }
}

#[cfg(unix)]
fn detach(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    // SAFETY: setsid is async-signal-safe and touches no parent memory.
    unsafe {
        cmd.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

#[cfg(windows)]
fn detach(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;
    const DETACHED_PROCESS: u32 = 0x0000_0008;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    cmd.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(any(unix, windows)))]
fn detach(_cmd: &mut Command) {}
