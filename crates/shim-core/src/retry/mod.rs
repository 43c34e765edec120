//! Retry and backoff for downloads.
//!
//! Classifies fetch failures (timeouts, throttling, connection drops) and
//! decides exponential backoff so the install and staging paths share one
//! policy. The stable-version query deliberately bypasses this.

mod classify;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
