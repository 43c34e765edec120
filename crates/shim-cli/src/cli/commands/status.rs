//! `claude --shim-version` – launcher version and install status.

use anyhow::Result;
use shim_core::platform::Platform;
use shim_core::status::ShimStatus;
use shim_core::validate::Validator;

use super::Session;

pub fn run_status() -> Result<i32> {
    let session = Session::open()?;
    let platform = Platform::detect().map_err(|e| e.to_string());
    let status = ShimStatus::collect(
        &session.root,
        session.selection.source,
        platform,
        &Validator::from_config(&session.cfg),
    );
    println!("{}", status);
    Ok(0)
}
