//! Transfer control to the resolved binary.

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::Command;

/// Replace this process with `binary`, forwarding `args` and the standard
/// streams unchanged. On Unix this only returns if `exec` failed. Elsewhere
/// the binary runs as a child and its exit code is returned for the caller
/// to exit with.
pub fn hand_off(binary: &Path, args: &[OsString]) -> io::Result<i32> {
    let mut cmd = Command::new(binary);
    cmd.args(args);
    tracing::debug!(binary = %binary.display(), argc = args.len(), "handing off");
    run(cmd)
}

#[cfg(unix)]
fn run(mut cmd: Command) -> io::Result<i32> {
    use std::os::unix::process::CommandExt;
    Err(cmd.exec())
}

#[cfg(not(unix))]
fn run(mut cmd: Command) -> io::Result<i32> {
    let status = cmd.status()?;
    Ok(status.code().unwrap_or(1))
}
