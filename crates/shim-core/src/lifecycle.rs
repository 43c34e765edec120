//! Lifecycle controller: decides, once per invocation, which binary to run
//! and whether anything must be installed, repaired or updated first.
//!
//! Order of a run:
//! 1. apply a completed staged update (no network)
//! 2. drop an abandoned staging area
//! 3. classify RealBinary: absent, corrupt or valid
//! 4. absent/corrupt: blocking install of the latest version
//! 5. valid: throttled version check, maybe a detached background update
//!
//! Only step 4 can fail the invocation. Everything else degrades to "run what
//! is there".

use std::io;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::config::ShimConfig;
use crate::fetch::{Endpoints, Fetcher, Transport};
use crate::install_root::InstallRoot;
use crate::markers::{self, LastCheck};
use crate::oracle::{should_check, VersionOracle};
use crate::platform::{Platform, PlatformError};
use crate::spawn::Detach;
use crate::staging::{self, ApplyOutcome, UpdateError};
use crate::storage;
use crate::validate::Validator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    NoBinary,
    Corrupt,
    ValidFresh,
    /// Valid, and the throttle allows asking for a newer version.
    ValidStaleCheckDue,
    /// Valid, last check saw a newer version, but it is too soon to act again.
    ValidStaleThrottled,
}

/// Progress notifications for the user-facing side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    AppliedStaged { version: String },
    Installing { version: String },
    Repairing { version: String },
    Installed { version: String },
    UpdateScheduled { version: String },
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error("invalid base_url: {0}")]
    BaseUrl(#[from] url::ParseError),
    #[error("no usable binary and the latest version could not be determined (is the network reachable?)")]
    VersionUnavailable,
    #[error("installing version {version} failed: {source}")]
    Install {
        version: String,
        #[source]
        source: UpdateError,
    },
    #[error("removing corrupt binary: {0}")]
    Cleanup(#[source] io::Error),
}

/// What the run decided; `binary` is what to hand off to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub binary: PathBuf,
    pub state: LifecycleState,
    pub installed_version: Option<String>,
    pub update_scheduled: Option<String>,
}

pub struct Lifecycle<'a> {
    root: &'a InstallRoot,
    platform: Platform,
    config: &'a ShimConfig,
    transport: &'a dyn Transport,
    /// Used for the stable version query; defaults to `transport`.
    version_transport: &'a dyn Transport,
    spawner: &'a dyn Detach,
    endpoints: Endpoints,
    validator: Validator,
}

impl<'a> Lifecycle<'a> {
    pub fn new(
        root: &'a InstallRoot,
        platform: Platform,
        config: &'a ShimConfig,
        transport: &'a dyn Transport,
        spawner: &'a dyn Detach,
    ) -> Result<Self, LifecycleError> {
        Ok(Self {
            root,
            platform,
            config,
            transport,
            version_transport: transport,
            spawner,
            endpoints: Endpoints::new(&config.base_url)?,
            validator: Validator::from_config(config),
        })
    }

    /// Ask for the latest version over a different (typically shorter
    /// fused) transport than the one used for downloads.
    pub fn with_version_transport(mut self, transport: &'a dyn Transport) -> Self {
        self.version_transport = transport;
        self
    }

    fn oracle(&self) -> VersionOracle<'_> {
        VersionOracle::new(self.version_transport, &self.endpoints)
    }

    pub fn fetcher(&self) -> Fetcher<'_> {
        Fetcher {
            transport: self.transport,
            endpoints: &self.endpoints,
            platform: &self.platform,
            binary_name: self.root.binary_name(),
            policy: self.config.retry_policy(),
            require_checksum: self.config.require_checksum,
        }
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn run(&self, on_event: &dyn Fn(&LifecycleEvent)) -> Result<LaunchPlan, LifecycleError> {
        self.run_at(SystemTime::now(), on_event)
    }

    /// [`run`](Self::run) with an explicit clock, for the throttle.
    pub fn run_at(
        &self,
        now: SystemTime,
        on_event: &dyn Fn(&LifecycleEvent),
    ) -> Result<LaunchPlan, LifecycleError> {
        match staging::apply_staged(self.root) {
            Ok(ApplyOutcome::Applied { version }) => {
                on_event(&LifecycleEvent::AppliedStaged {
                    version: version.clone(),
                });
                return Ok(self.plan(LifecycleState::ValidFresh, Some(version), None));
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("applying staged update failed: {}", e),
        }
        if let Err(e) = staging::clean_stale(self.root) {
            tracing::warn!("cleaning staging area failed: {}", e);
        }

        let binary = self.root.binary();
        if !binary.exists() {
            return self.install_blocking(LifecycleState::NoBinary, now, on_event);
        }
        if !self.validator.validate(&binary) {
            return self.install_blocking(LifecycleState::Corrupt, now, on_event);
        }
        Ok(self.check_for_update(now, on_event))
    }

    fn plan(
        &self,
        state: LifecycleState,
        installed_version: Option<String>,
        update_scheduled: Option<String>,
    ) -> LaunchPlan {
        LaunchPlan {
            binary: self.root.binary(),
            state,
            installed_version,
            update_scheduled,
        }
    }

    /// NoBinary / Corrupt: the user waits for a fresh install.
    fn install_blocking(
        &self,
        state: LifecycleState,
        now: SystemTime,
        on_event: &dyn Fn(&LifecycleEvent),
    ) -> Result<LaunchPlan, LifecycleError> {
        let version = self
            .oracle()
            .get_latest()
            .ok_or(LifecycleError::VersionUnavailable)?;

        if state == LifecycleState::Corrupt {
            on_event(&LifecycleEvent::Repairing {
                version: version.clone(),
            });
            storage::remove_file_if_exists(&self.root.binary()).map_err(LifecycleError::Cleanup)?;
            storage::remove_file_if_exists(&self.root.version_marker())
                .map_err(LifecycleError::Cleanup)?;
        } else {
            on_event(&LifecycleEvent::Installing {
                version: version.clone(),
            });
        }

        self.install(&version)
            .map_err(|source| LifecycleError::Install {
                version: version.clone(),
                source,
            })?;
        on_event(&LifecycleEvent::Installed {
            version: version.clone(),
        });

        if let Err(e) = LastCheck::new(now, version.clone()).write(&self.root.last_check_marker()) {
            tracing::warn!("recording last check failed: {}", e);
        }
        Ok(self.plan(state, Some(version), None))
    }

    /// Download straight into the root (same filesystem as RealBinary), check
    /// it runs, then rename it into place.
    fn install(&self, version: &str) -> Result<(), UpdateError> {
        self.root.ensure()?;
        let (temp, verification) = self.fetcher().download_verified(version, self.root.dir())?;
        tracing::debug!(?verification, "install download verified");
        let sealed = storage::seal_executable(temp)?;
        self.validator.check(&sealed)?;
        storage::persist(sealed, &self.root.binary())?;
        markers::write_version(&self.root.version_marker(), version)?;
        tracing::info!(%version, root = %self.root.dir().display(), "installed");
        Ok(())
    }

    /// Valid binary: never blocks on more than one version request.
    fn check_for_update(&self, now: SystemTime, on_event: &dyn Fn(&LifecycleEvent)) -> LaunchPlan {
        let installed = markers::read_version(&self.root.version_marker());
        let last = LastCheck::read(&self.root.last_check_marker());

        if !should_check(last.as_ref(), self.config.check_interval(), now) {
            let state = match &last {
                Some(lc) if installed.as_deref() != Some(lc.latest.as_str()) => {
                    tracing::debug!(latest = %lc.latest, "newer version known, check throttled");
                    LifecycleState::ValidStaleThrottled
                }
                _ => LifecycleState::ValidFresh,
            };
            return self.plan(state, installed, None);
        }

        let latest = match self.oracle().get_latest() {
            Some(v) => v,
            None => return self.plan(LifecycleState::ValidStaleCheckDue, installed, None),
        };
        if let Err(e) = LastCheck::new(now, latest.clone()).write(&self.root.last_check_marker()) {
            tracing::warn!("recording last check failed: {}", e);
        }
        if installed.as_deref() == Some(latest.as_str()) {
            return self.plan(LifecycleState::ValidStaleCheckDue, installed, None);
        }

        match self.spawner.spawn_update(&latest) {
            Ok(()) => {
                on_event(&LifecycleEvent::UpdateScheduled {
                    version: latest.clone(),
                });
                self.plan(LifecycleState::ValidStaleCheckDue, installed, Some(latest))
            }
            Err(e) => {
                tracing::warn!("could not start background update: {}", e);
                self.plan(LifecycleState::ValidStaleCheckDue, installed, None)
            }
        }
    }

    /// Body of the detached worker: stage `version` for the next invocation.
    pub fn stage_update(&self, version: &str) {
        staging::run_background_update(self.root, version, &self.fetcher(), &self.validator);
    }
}
