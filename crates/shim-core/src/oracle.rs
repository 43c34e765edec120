//! Version oracle: what is the current stable release, and is it time to ask?

use std::time::{Duration, SystemTime};

use crate::fetch::{self, Endpoints, Transport};
use crate::markers::LastCheck;

const MAX_VERSION_LEN: usize = 64;

/// Version identifiers end up in URLs and file contents; keep them boring.
pub fn is_valid_version(v: &str) -> bool {
    !v.is_empty()
        && v.len() <= MAX_VERSION_LEN
        && v.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+'))
        && !v.starts_with('.')
}

/// The stable endpoint returns a bare version string, maybe with a newline.
pub fn parse_version(body: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(body).ok()?.trim();
    is_valid_version(text).then(|| text.to_string())
}

/// Throttle: only ask again once `interval` has passed since the last
/// recorded check. No marker, or a timestamp in the future, means ask.
pub fn should_check(last: Option<&LastCheck>, interval: Duration, now: SystemTime) -> bool {
    match last {
        None => true,
        Some(lc) => match now.duration_since(lc.checked_at) {
            Ok(elapsed) => elapsed >= interval,
            Err(_) => true,
        },
    }
}

pub struct VersionOracle<'a> {
    transport: &'a dyn Transport,
    endpoints: &'a Endpoints,
}

impl<'a> VersionOracle<'a> {
    pub fn new(transport: &'a dyn Transport, endpoints: &'a Endpoints) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    /// One request, no retries. `None` means "unknown": keep the current state.
    pub fn get_latest(&self) -> Option<String> {
        let url = self.endpoints.stable();
        match fetch::fetch(self.transport, &url) {
            Ok(body) => {
                let version = parse_version(&body);
                if version.is_none() {
                    tracing::warn!("stable endpoint returned no usable version");
                }
                version
            }
            Err(e) => {
                tracing::warn!("version check failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    #[test]
    fn version_parsing() {
        assert_eq!(parse_version(b"1.0.43\n").as_deref(), Some("1.0.43"));
        assert_eq!(parse_version(b"  2.0.0-beta.1+build7  ").as_deref(), Some("2.0.0-beta.1+build7"));
        assert_eq!(parse_version(b""), None);
        assert_eq!(parse_version(b"\n"), None);
        assert_eq!(parse_version(b"../../etc/passwd"), None);
        assert_eq!(parse_version(b"<html>error</html>"), None);
        assert_eq!(parse_version(&[0xff, 0xfe]), None);
    }

    #[test]
    fn throttle_window() {
        let t0 = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let hour = Duration::from_secs(3600);
        let lc = LastCheck::new(t0, "1.0.0");
        assert!(should_check(None, hour, t0));
        assert!(!should_check(Some(&lc), hour, t0 + Duration::from_secs(10)));
        assert!(!should_check(Some(&lc), hour, t0 + Duration::from_secs(3599)));
        assert!(should_check(Some(&lc), hour, t0 + hour));
        // clock went backwards
        assert!(should_check(Some(&lc), hour, t0 - Duration::from_secs(5)));
    }
}
