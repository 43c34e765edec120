use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Public release bucket for the wrapped application.
pub const DEFAULT_BASE_URL: &str = "https://storage.googleapis.com/claude-code-dist-86c565f3-f756-42ad-8dfa-d59b1c096819/claude-code-releases";

/// Name of the XDG prefix used for config, state and log files.
pub const XDG_PREFIX: &str = "claude-shim";

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per download (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.5 = 500ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 0.5,
            max_delay_secs: 10,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_secs_f64(self.base_delay_secs.max(0.0)),
            max_delay: Duration::from_secs(self.max_delay_secs),
        }
    }
}

/// Launcher configuration loaded from `~/.config/claude-shim/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShimConfig {
    /// Release bucket root; `stable`, manifests and binaries live below it.
    pub base_url: String,
    /// File name of the cached application binary inside the install root.
    pub binary_name: String,
    /// Substring the application prints for `--version`.
    pub identity_marker: String,
    /// Minimum seconds between two remote version checks.
    pub check_interval_secs: u64,
    /// Fail instead of skipping verification when no manifest digest is available.
    pub require_checksum: bool,
    pub connect_timeout_secs: u64,
    pub transfer_timeout_secs: u64,
    /// Whole-request ceiling for the stable version query. A launch with a
    /// valid binary never waits longer than this on the network.
    pub version_check_timeout_secs: u64,
    /// Upper bound on the `--version` probe run by the validator.
    pub validate_timeout_secs: u64,
    /// Optional retry policy; if missing, built-in defaults are used.
    pub retry: Option<RetryConfig>,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            binary_name: default_binary_name().to_string(),
            identity_marker: "Claude Code".to_string(),
            check_interval_secs: 3600,
            require_checksum: false,
            connect_timeout_secs: 30,
            transfer_timeout_secs: 1800,
            version_check_timeout_secs: 5,
            validate_timeout_secs: 10,
            retry: None,
        }
    }
}

fn default_binary_name() -> &'static str {
    if cfg!(windows) {
        "claude.exe"
    } else {
        "claude"
    }
}

impl ShimConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone().unwrap_or_default().policy()
    }

    /// Reject configs whose `base_url` would produce broken endpoint URLs.
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.base_url)
            .with_context(|| format!("invalid base_url {:?}", self.base_url))?;
        if parsed.cannot_be_a_base() {
            anyhow::bail!("base_url {:?} cannot carry a path", self.base_url);
        }
        if self.binary_name.is_empty() || self.binary_name.contains(['/', '\\']) {
            anyhow::bail!("binary_name {:?} must be a plain file name", self.binary_name);
        }
        Ok(())
    }
}

pub fn config_path() -> Result<Option<PathBuf>> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix(XDG_PREFIX)?;
    Ok(xdg_dirs.find_config_file("config.toml"))
}

/// Load configuration from disk. A missing file yields defaults; nothing is written.
pub fn load() -> Result<ShimConfig> {
    match config_path()? {
        Some(path) => load_from_path(&path),
        None => Ok(ShimConfig::default()),
    }
}

pub fn load_from_path(path: &Path) -> Result<ShimConfig> {
    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ShimConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    tracing::debug!("loaded config from {}", path.display());
    Ok(cfg)
}
