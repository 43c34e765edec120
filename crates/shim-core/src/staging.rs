//! Staging and apply: background updates are prepared in `.staging/` and only
//! become the live binary through a rename on a later invocation.
//!
//! Write order inside the staging area is binary, version tag, then the
//! `.complete` sentinel, each fsynced. A staging area without the sentinel is
//! residue of an interrupted attempt and is deleted, never applied.

use std::fs;
use std::io;

use crate::fetch::{FetchError, Fetcher};
use crate::install_root::InstallRoot;
use crate::markers;
use crate::oracle::is_valid_version;
use crate::storage;
use crate::validate::{Invalid, Validator};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied { version: String },
    NothingStaged,
    /// An incomplete or inconsistent staging area was removed.
    Discarded,
}

impl ApplyOutcome {
    pub fn applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied { .. })
    }
}

/// Failure while obtaining a new binary, shared by install and staging.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("download failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("downloaded binary rejected: {0}")]
    Invalid(#[from] Invalid),
}

/// Move a completed staged update into place. Anything short of sentinel +
/// binary + non-empty version tag is discarded instead.
pub fn apply_staged(root: &InstallRoot) -> io::Result<ApplyOutcome> {
    let staging = root.staging();
    if !staging.exists() {
        return Ok(ApplyOutcome::NothingStaged);
    }
    let tag = markers::read_version(&staging.version_tag()).filter(|v| is_valid_version(v));
    let version = match tag {
        Some(v) if staging.is_complete() && staging.binary().is_file() => v,
        _ => {
            tracing::info!(dir = %staging.dir().display(), "discarding incomplete staged update");
            storage::remove_dir_if_exists(staging.dir())?;
            return Ok(ApplyOutcome::Discarded);
        }
    };

    root.ensure()?;
    fs::rename(staging.binary(), root.binary())?;
    storage::set_executable(&root.binary())?;
    markers::write_version(&root.version_marker(), &version)?;
    storage::remove_dir_if_exists(staging.dir())?;
    storage::sync_dir(root.dir())?;
    tracing::info!(%version, "applied staged update");
    Ok(ApplyOutcome::Applied { version })
}

/// Delete a staging area that never got its sentinel. Returns whether one was removed.
pub fn clean_stale(root: &InstallRoot) -> io::Result<bool> {
    let staging = root.staging();
    if !staging.exists() || staging.is_complete() {
        return Ok(false);
    }
    tracing::info!(dir = %staging.dir().display(), "removing abandoned staging area");
    storage::remove_dir_if_exists(staging.dir())?;
    Ok(true)
}

/// Download, verify and stage `version`. On any error the whole staging
/// area is removed before returning.
pub fn background_update(
    root: &InstallRoot,
    version: &str,
    fetcher: &Fetcher<'_>,
    validator: &Validator,
) -> Result<(), UpdateError> {
    let staging = root.staging();
    storage::remove_dir_if_exists(staging.dir())?;
    fs::create_dir_all(staging.dir())?;

    let staged = (|| -> Result<(), UpdateError> {
        let (temp, verification) = fetcher.download_verified(version, staging.dir())?;
        tracing::debug!(?verification, "staged download verified");
        let sealed = storage::seal_executable(temp)?;
        validator.check(&sealed)?;
        storage::persist(sealed, &staging.binary())?;
        storage::write_durable(&staging.version_tag(), version.as_bytes())?;
        storage::sync_dir(staging.dir())?;
        // sentinel strictly last
        storage::write_durable(&staging.sentinel(), b"")?;
        storage::sync_dir(staging.dir())?;
        Ok(())
    })();

    if let Err(e) = staged {
        if let Err(cleanup) = storage::remove_dir_if_exists(staging.dir()) {
            tracing::warn!("could not remove staging area: {}", cleanup);
        }
        return Err(e);
    }
    tracing::info!(%version, "update staged");
    Ok(())
}

/// Entry point of the detached worker: failures are logged, never raised.
pub fn run_background_update(
    root: &InstallRoot,
    version: &str,
    fetcher: &Fetcher<'_>,
    validator: &Validator,
) {
    if let Err(e) = background_update(root, version, fetcher, validator) {
        tracing::warn!(%version, "background update failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage_by_hand(root: &InstallRoot, version: Option<&str>, sentinel: bool) {
        let staging = root.staging();
        fs::create_dir_all(staging.dir()).unwrap();
        fs::write(staging.binary(), format!("staged {:?}", version)).unwrap();
        if let Some(v) = version {
            fs::write(staging.version_tag(), v).unwrap();
        }
        if sentinel {
            fs::write(staging.sentinel(), b"").unwrap();
        }
    }

    #[test]
    fn nothing_staged() {
        let dir = tempfile::tempdir().unwrap();
        let root = InstallRoot::new(dir.path(), "claude");
        assert_eq!(apply_staged(&root).unwrap(), ApplyOutcome::NothingStaged);
    }

    #[test]
    fn complete_staging_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let root = InstallRoot::new(dir.path().join("root"), "claude");
        stage_by_hand(&root, Some("2.0.0"), true);
        let out = apply_staged(&root).unwrap();
        assert_eq!(
            out,
            ApplyOutcome::Applied {
                version: "2.0.0".into()
            }
        );
        assert!(out.applied());
        assert_eq!(fs::read_to_string(root.binary()).unwrap(), "staged Some(\"2.0.0\")");
        assert_eq!(markers::read_version(&root.version_marker()).as_deref(), Some("2.0.0"));
        assert!(!root.staging().exists());
        assert!(storage::is_executable(&root.binary()) || cfg!(not(unix)));
    }

    #[test]
    fn missing_sentinel_or_tag_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let root = InstallRoot::new(dir.path(), "claude");
        fs::write(root.binary(), b"live").unwrap();

        stage_by_hand(&root, Some("2.0.0"), false);
        assert_eq!(apply_staged(&root).unwrap(), ApplyOutcome::Discarded);
        assert!(!root.staging().exists());

        stage_by_hand(&root, Some("  "), true);
        assert_eq!(apply_staged(&root).unwrap(), ApplyOutcome::Discarded);

        stage_by_hand(&root, None, true);
        assert_eq!(apply_staged(&root).unwrap(), ApplyOutcome::Discarded);

        assert_eq!(fs::read(root.binary()).unwrap(), b"live");
    }

    #[test]
    fn clean_stale_only_touches_incomplete_areas() {
        let dir = tempfile::tempdir().unwrap();
        let root = InstallRoot::new(dir.path(), "claude");
        assert!(!clean_stale(&root).unwrap());

        stage_by_hand(&root, Some("2.0.0"), true);
        assert!(!clean_stale(&root).unwrap());
        assert!(root.staging().exists());

        fs::remove_file(root.staging().sentinel()).unwrap();
        assert!(clean_stale(&root).unwrap());
        assert!(!root.staging().exists());
    }
}
