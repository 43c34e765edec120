//! Fetch failure type shared by transports, verification and the retry loop.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection, TLS, ...).
    #[error("curl: {0}")]
    Curl(#[from] curl::Error),
    /// HTTP response had a non-2xx status.
    #[error("GET {url} returned HTTP {status}")]
    Http { url: String, status: u32 },
    /// Writing the body to disk failed (disk full, permission denied). Not retried.
    #[error("storage: {0}")]
    Io(#[from] io::Error),
    #[error("checksum mismatch: manifest says {expected}, download is {actual}")]
    ChecksumMismatch { expected: String, actual: String },
    #[error("size mismatch: manifest says {expected} bytes, download is {actual}")]
    SizeMismatch { expected: u64, actual: u64 },
    /// Verification could not run and `require_checksum` forbids skipping it.
    #[error("no checksum available for {0} and require_checksum is set")]
    ManifestRequired(String),
}
