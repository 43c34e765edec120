//! Command handlers, one per file.

mod background;
mod launch;
mod status;

pub use background::run_background_update;
pub use launch::run_launch;
pub use status::run_status;

use anyhow::{Context, Result};
use shim_core::config::{self, ShimConfig};
use shim_core::install_root::InstallRoot;
use shim_core::location::{self, LocationInputs, Selection};

/// Config plus the install root this invocation owns.
pub(crate) struct Session {
    pub cfg: ShimConfig,
    pub selection: Selection,
    pub root: InstallRoot,
}

impl Session {
    pub fn open() -> Result<Self> {
        let cfg = config::load()?;
        let inputs = LocationInputs::from_env().context("cannot determine install root")?;
        let selection = location::select(&inputs);
        let root = InstallRoot::new(selection.root.clone(), cfg.binary_name.clone());
        tracing::debug!(root = %root.dir().display(), source = ?selection.source, "session");
        Ok(Self {
            cfg,
            selection,
            root,
        })
    }
}
