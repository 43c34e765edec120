//! Detached worker: `claude --shim-background-update <version>`.
//!
//! Nobody waits for this process and its stdio is null, so every failure
//! ends up in the log file and the exit code is always 0.

use anyhow::Result;
use shim_core::fetch::CurlTransport;
use shim_core::lifecycle::Lifecycle;
use shim_core::oracle::is_valid_version;
use shim_core::platform::Platform;
use shim_core::spawn::Detach;
use std::io;

use super::Session;

/// The worker never starts further workers.
struct NoSpawn;

impl Detach for NoSpawn {
    fn spawn_update(&self, _version: &str) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "nested background update"))
    }
}

pub fn run_background_update(version: &str) -> i32 {
    if let Err(e) = stage(version) {
        tracing::warn!(%version, "background update not attempted: {:#}", e);
    }
    0
}

fn stage(version: &str) -> Result<()> {
    if !is_valid_version(version) {
        anyhow::bail!("refusing malformed version {:?}", version);
    }
    let platform = Platform::detect()?;
    let session = Session::open()?;
    let transport = CurlTransport::from_config(&session.cfg);
    let lifecycle = Lifecycle::new(&session.root, platform, &session.cfg, &transport, &NoSpawn)?;
    lifecycle.stage_update(version);
    Ok(())
}
