//! On-disk layout of an install root.
//!
//! ```text
//! <root>/claude                 RealBinary (0755)
//! <root>/.version               installed version
//! <root>/.last-check            "<unix secs>\n<latest seen>\n"
//! <root>/.staging/claude        staged candidate
//! <root>/.staging/.version      staged version tag
//! <root>/.staging/.complete     empty sentinel, written last
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const VERSION_FILE: &str = ".version";
pub const LAST_CHECK_FILE: &str = ".last-check";
pub const STAGING_DIR: &str = ".staging";
pub const COMPLETE_FILE: &str = ".complete";

/// Handle on the directory that owns the cached binary and its metadata.
/// Every component takes one of these instead of computing paths itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRoot {
    dir: PathBuf,
    binary_name: String,
}

impl InstallRoot {
    pub fn new(dir: impl Into<PathBuf>, binary_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            binary_name: binary_name.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn binary_name(&self) -> &str {
        &self.binary_name
    }

    /// The RealBinary path.
    pub fn binary(&self) -> PathBuf {
        self.dir.join(&self.binary_name)
    }

    pub fn version_marker(&self) -> PathBuf {
        self.dir.join(VERSION_FILE)
    }

    pub fn last_check_marker(&self) -> PathBuf {
        self.dir.join(LAST_CHECK_FILE)
    }

    pub fn staging(&self) -> StagingArea {
        StagingArea {
            dir: self.dir.join(STAGING_DIR),
            binary_name: self.binary_name.clone(),
        }
    }

    /// Created lazily, right before the first write.
    pub fn ensure(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)
    }
}

/// Side directory where a background update is prepared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingArea {
    dir: PathBuf,
    binary_name: String,
}

impl StagingArea {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn binary(&self) -> PathBuf {
        self.dir.join(&self.binary_name)
    }

    pub fn version_tag(&self) -> PathBuf {
        self.dir.join(VERSION_FILE)
    }

    pub fn sentinel(&self) -> PathBuf {
        self.dir.join(COMPLETE_FILE)
    }

    pub fn exists(&self) -> bool {
        self.dir.exists()
    }

    /// The sentinel is the only proof that the staged pair is safe to apply.
    pub fn is_complete(&self) -> bool {
        self.sentinel().is_file()
    }
}
