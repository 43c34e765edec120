//! libcurl-backed transport: a single GET streamed into the caller's sink.

use super::{FetchError, Transport};
use std::io::{self, Write};
use std::time::Duration;

const LOW_SPEED_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
pub struct CurlTransport {
    pub connect_timeout: Duration,
    /// Whole-transfer ceiling; the binary is large, so this is generous.
    pub timeout: Duration,
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            timeout: Duration::from_secs(1800),
        }
    }
}

impl CurlTransport {
    pub fn from_config(cfg: &crate::config::ShimConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            timeout: Duration::from_secs(cfg.transfer_timeout_secs),
        }
    }

    /// Short-fused transport for the stable version query: a stalled server
    /// turns into "unknown" instead of holding up the launch.
    pub fn for_version_check(cfg: &crate::config::ShimConfig) -> Self {
        let timeout = Duration::from_secs(cfg.version_check_timeout_secs.max(1));
        Self {
            connect_timeout: timeout.min(Duration::from_secs(cfg.connect_timeout_secs.max(1))),
            timeout,
        }
    }
}

impl Transport for CurlTransport {
    fn get(&self, url: &str, sink: &mut dyn Write) -> Result<u64, FetchError> {
        let mut written = 0u64;
        let mut sink_err: Option<io::Error> = None;

        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.fail_on_error(false)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.low_speed_limit(1024)?;
        easy.low_speed_time(LOW_SPEED_WINDOW.min(self.timeout))?;
        easy.timeout(self.timeout)?;
        easy.useragent(concat!("claude-shim/", env!("CARGO_PKG_VERSION")))?;

        let performed = {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| match sink.write_all(data) {
                Ok(()) => {
                    written += data.len() as u64;
                    Ok(data.len())
                }
                Err(e) => {
                    sink_err = Some(e);
                    Ok(0) // abort transfer
                }
            })?;
            transfer.perform()
        };
        if let Some(e) = sink_err {
            return Err(FetchError::Io(e));
        }
        performed?;

        let status = easy.response_code()?;
        // file:// URLs report 0
        if status != 0 && !(200..300).contains(&status) {
            return Err(FetchError::Http {
                url: url.to_string(),
                status,
            });
        }
        Ok(written)
    }
}
