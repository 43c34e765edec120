//! Default path: make sure a valid binary exists, then become it.

use anyhow::{Context, Result};
use shim_core::fetch::CurlTransport;
use shim_core::handoff;
use shim_core::lifecycle::{Lifecycle, LifecycleError, LifecycleEvent};
use shim_core::platform::Platform;
use shim_core::spawn::DetachedProcess;
use std::ffi::OsString;

use super::Session;

pub fn run_launch(args: &[OsString]) -> Result<i32> {
    let platform = Platform::detect().map_err(LifecycleError::from)?;
    let session = Session::open()?;
    let transport = CurlTransport::from_config(&session.cfg);
    let version_transport = CurlTransport::for_version_check(&session.cfg);
    let spawner = DetachedProcess::current().context("cannot locate launcher executable")?;
    let lifecycle = Lifecycle::new(&session.root, platform, &session.cfg, &transport, &spawner)?
        .with_version_transport(&version_transport);

    let plan = lifecycle.run(&report)?;
    tracing::debug!(state = ?plan.state, version = ?plan.installed_version, "launch plan");

    let code = handoff::hand_off(&plan.binary, args)
        .with_context(|| format!("failed to execute {}", plan.binary.display()))?;
    Ok(code)
}

/// Only the blocking paths talk to the user; the rest goes to the log.
fn report(event: &LifecycleEvent) {
    match event {
        LifecycleEvent::Installing { version } => {
            eprintln!("Installing Claude Code {}...", version);
        }
        LifecycleEvent::Repairing { version } => {
            eprintln!("Cached Claude Code binary is invalid; reinstalling {}...", version);
        }
        LifecycleEvent::Installed { version } => {
            eprintln!("Claude Code {} installed.", version);
        }
        LifecycleEvent::AppliedStaged { version } => {
            tracing::info!(%version, "now running updated version");
        }
        LifecycleEvent::UpdateScheduled { version } => {
            tracing::info!(%version, "update downloading in the background");
        }
    }
}
