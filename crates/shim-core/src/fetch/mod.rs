//! Fetcher: downloads over a pluggable transport, verifies against the
//! release manifest and leaves the artifact in a temp file the caller
//! either persists into place or drops.

mod http;
mod error;
mod manifest;

pub use http::CurlTransport;
pub use error::FetchError;
pub use manifest::{Manifest, PlatformEntry};

use crate::checksum;
use crate::platform::Platform;
use crate::retry::{run_with_retry, RetryPolicy};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use url::Url;

/// Prefix of in-flight download files; never a final name.
pub const TEMP_PREFIX: &str = ".download-";

/// Moves bytes from a URL into a sink. `CurlTransport` is the production
/// implementation; tests plug in in-memory transports.
pub trait Transport {
    /// GET `url` and stream the body into `sink`. Returns the number of bytes written.
    fn get(&self, url: &str, sink: &mut dyn Write) -> Result<u64, FetchError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str, sink: &mut dyn Write) -> Result<u64, FetchError> {
        (**self).get(url, sink)
    }
}

/// Remote layout of the release bucket.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase);
        }
        Ok(Self { base })
    }

    fn join(&self, segments: &[&str]) -> String {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.into()
    }

    /// Bare version string of the current stable release.
    pub fn stable(&self) -> String {
        self.join(&["stable"])
    }

    pub fn manifest(&self, version: &str) -> String {
        self.join(&[version, "manifest.json"])
    }

    pub fn binary(&self, version: &str, platform: &Platform, binary_name: &str) -> String {
        self.join(&[version, platform.key(), binary_name])
    }
}

/// Outcome of checking a download against the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Verified { digest: String },
    /// Trust-on-first-use: no manifest digest to compare against.
    Skipped { reason: String },
}

/// GET `url` into memory.
pub fn fetch(transport: &dyn Transport, url: &str) -> Result<Vec<u8>, FetchError> {
    let mut body = Vec::new();
    transport.get(url, &mut body)?;
    Ok(body)
}

/// GET `url` into a fresh temp file inside `dir`. Each attempt starts from a
/// new file; a failed attempt's file is removed when it is dropped.
pub fn fetch_to_temp(
    transport: &dyn Transport,
    url: &str,
    dir: &Path,
    policy: &RetryPolicy,
) -> Result<NamedTempFile, FetchError> {
    run_with_retry(policy, || {
        let mut temp = tempfile::Builder::new().prefix(TEMP_PREFIX).tempfile_in(dir)?;
        let n = transport.get(url, temp.as_file_mut())?;
        temp.as_file_mut().flush()?;
        temp.as_file().sync_all()?;
        tracing::debug!(url, bytes = n, path = %temp.path().display(), "downloaded");
        Ok(temp)
    })
}

/// Fetch and parse the manifest for `version`. Any failure means "no manifest".
pub fn fetch_manifest(
    transport: &dyn Transport,
    endpoints: &Endpoints,
    version: &str,
    policy: &RetryPolicy,
) -> Option<Manifest> {
    let url = endpoints.manifest(version);
    let body = match run_with_retry(policy, || fetch(transport, &url)) {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!("manifest unavailable for {}: {}", version, e);
            return None;
        }
    };
    match Manifest::parse(&body) {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!("manifest for {} is unparseable: {}", version, e);
            None
        }
    }
}

/// Compare the file at `path` with the manifest entry for `platform`.
///
/// A missing or unparseable manifest (or missing platform entry) skips
/// verification unless `require` is set. A mismatch is always an error.
pub fn verify(
    path: &Path,
    manifest: Option<&Manifest>,
    platform: &Platform,
    require: bool,
) -> Result<Verification, FetchError> {
    let key = platform.key();
    let expected = match manifest.and_then(|m| m.checksum_for(key)) {
        Some(c) => c,
        None => {
            if require {
                return Err(FetchError::ManifestRequired(key.to_string()));
            }
            let reason = if manifest.is_none() {
                "manifest unavailable".to_string()
            } else {
                format!("manifest has no checksum for {}", key)
            };
            tracing::warn!("skipping checksum verification: {}", reason);
            return Ok(Verification::Skipped { reason });
        }
    };

    if let Some(expected_size) = manifest.and_then(|m| m.size_for(key)) {
        let actual = std::fs::metadata(path)?.len();
        if actual != expected_size {
            return Err(FetchError::SizeMismatch {
                expected: expected_size,
                actual,
            });
        }
    }

    let actual = checksum::sha256_path(path)?;
    if !checksum::digests_match(expected, &actual) {
        return Err(FetchError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(Verification::Verified { digest: actual })
}

/// Everything needed to pull one platform binary from the release bucket.
pub struct Fetcher<'a> {
    pub transport: &'a dyn Transport,
    pub endpoints: &'a Endpoints,
    pub platform: &'a Platform,
    pub binary_name: &'a str,
    pub policy: RetryPolicy,
    pub require_checksum: bool,
}

impl Fetcher<'_> {
    /// Download `version` into a temp file in `dir` and verify it. On any
    /// failure the temp file is gone by the time the error is returned.
    pub fn download_verified(
        &self,
        version: &str,
        dir: &Path,
    ) -> Result<(NamedTempFile, Verification), FetchError> {
        let manifest = fetch_manifest(self.transport, self.endpoints, version, &self.policy);
        let url = self.endpoints.binary(version, self.platform, self.binary_name);
        let temp = fetch_to_temp(self.transport, &url, dir, &self.policy)?;
        let verification = verify(
            temp.path(),
            manifest.as_ref(),
            self.platform,
            self.require_checksum,
        )?;
        Ok((temp, verification))
    }
}
