//! `.version` and `.last-check` marker files.

use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::storage;

/// Installed version, or `None` if the marker is missing or blank.
pub fn read_version(path: &Path) -> Option<String> {
    let raw = fs::read_to_string(path).ok()?;
    let v = raw.lines().next().unwrap_or("").trim();
    (!v.is_empty()).then(|| v.to_string())
}

pub fn write_version(path: &Path, version: &str) -> io::Result<()> {
    storage::write_atomic(path, format!("{}\n", version).as_bytes())
}

/// When the oracle was last consulted and what it said.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastCheck {
    pub checked_at: SystemTime,
    pub latest: String,
}

impl LastCheck {
    pub fn new(checked_at: SystemTime, latest: impl Into<String>) -> Self {
        Self {
            checked_at,
            latest: latest.into(),
        }
    }

    /// Two lines: unix seconds, then version. Anything else is `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let mut lines = text.lines();
        let secs: u64 = lines.next()?.trim().parse().ok()?;
        let latest = lines.next()?.trim();
        if latest.is_empty() {
            return None;
        }
        // a u64 that SystemTime cannot hold is as malformed as text
        let checked_at = UNIX_EPOCH.checked_add(Duration::from_secs(secs))?;
        Some(Self {
            checked_at,
            latest: latest.to_string(),
        })
    }

    pub fn render(&self) -> String {
        let secs = self
            .checked_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        format!("{}\n{}\n", secs, self.latest)
    }

    /// Missing or malformed ⇒ `None` ("never checked").
    pub fn read(path: &Path) -> Option<Self> {
        let text = fs::read_to_string(path).ok()?;
        let parsed = Self::parse(&text);
        if parsed.is_none() {
            tracing::debug!("ignoring malformed {}", path.display());
        }
        parsed
    }

    pub fn write(&self, path: &Path) -> io::Result<()> {
        storage::write_atomic(path, self.render().as_bytes())
    }

    pub fn unix_secs(&self) -> u64 {
        self.checked_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}
