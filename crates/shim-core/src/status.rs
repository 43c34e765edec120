//! Self-inspection report printed by `--shim-version`. Read-only: no network,
//! no writes.

use std::fmt;
use std::path::PathBuf;

use crate::install_root::InstallRoot;
use crate::location::RootSource;
use crate::markers::{self, LastCheck};
use crate::platform::Platform;
use crate::validate::Validator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedUpdate {
    None,
    Ready(String),
    Incomplete,
}

#[derive(Debug, Clone)]
pub struct ShimStatus {
    pub launcher_version: &'static str,
    pub platform: Result<Platform, String>,
    pub root: PathBuf,
    pub root_source: RootSource,
    pub binary: PathBuf,
    pub binary_present: bool,
    pub binary_valid: bool,
    pub installed_version: Option<String>,
    pub last_check: Option<LastCheck>,
    pub staged: StagedUpdate,
}

impl ShimStatus {
    pub fn collect(
        root: &InstallRoot,
        root_source: RootSource,
        platform: Result<Platform, String>,
        validator: &Validator,
    ) -> Self {
        let binary = root.binary();
        let binary_present = binary.exists();
        let binary_valid = binary_present && validator.validate(&binary);
        let staging = root.staging();
        let staged = if !staging.exists() {
            StagedUpdate::None
        } else if staging.is_complete() {
            match markers::read_version(&staging.version_tag()) {
                Some(v) => StagedUpdate::Ready(v),
                None => StagedUpdate::Incomplete,
            }
        } else {
            StagedUpdate::Incomplete
        };
        Self {
            launcher_version: env!("CARGO_PKG_VERSION"),
            platform,
            root: root.dir().to_path_buf(),
            root_source,
            binary,
            binary_present,
            binary_valid,
            installed_version: markers::read_version(&root.version_marker()),
            last_check: LastCheck::read(&root.last_check_marker()),
            staged,
        }
    }
}

impl fmt::Display for ShimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "claude-shim {}", self.launcher_version)?;
        match &self.platform {
            Ok(p) => writeln!(f, "platform:          {}", p)?,
            Err(e) => writeln!(f, "platform:          {}", e)?,
        }
        writeln!(
            f,
            "install root:      {} ({})",
            self.root.display(),
            match self.root_source {
                RootSource::ClaudeHome => "~/.claude",
                RootSource::UserCache => "~/.cache",
                RootSource::Prefix => "prefix",
            }
        )?;
        let binary_state = match (self.binary_present, self.binary_valid) {
            (false, _) => "not installed",
            (true, true) => "ok",
            (true, false) => "invalid (will be repaired on next run)",
        };
        writeln!(f, "binary:            {} [{}]", self.binary.display(), binary_state)?;
        writeln!(
            f,
            "installed version: {}",
            self.installed_version.as_deref().unwrap_or("-")
        )?;
        match &self.last_check {
            Some(lc) => writeln!(
                f,
                "last check:        {} (latest {})",
                lc.unix_secs(),
                lc.latest
            )?,
            None => writeln!(f, "last check:        never")?,
        }
        match &self.staged {
            StagedUpdate::None => write!(f, "staged update:     none"),
            StagedUpdate::Ready(v) => write!(f, "staged update:     {} (applied on next run)", v),
            StagedUpdate::Incomplete => write!(f, "staged update:     incomplete (will be discarded)"),
        }
    }
}
