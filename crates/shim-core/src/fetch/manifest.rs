//! Per-version integrity manifest published next to the binaries.
//!
//! ```json
//! {"version": "1.0.43", "platforms": {"linux-x64": {"checksum": "<sha256>", "size": 1234}}}
//! ```

use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub platforms: HashMap<String, PlatformEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformEntry {
    /// Lowercase hex SHA-256 of the binary.
    #[serde(default)]
    pub checksum: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

impl Manifest {
    pub fn parse(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Expected digest for `platform`, if the manifest carries a usable one.
    pub fn checksum_for(&self, platform: &str) -> Option<&str> {
        self.platforms
            .get(platform)
            .and_then(|p| p.checksum.as_deref())
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    pub fn size_for(&self, platform: &str) -> Option<u64> {
        self.platforms.get(platform).and_then(|p| p.size)
    }
}
