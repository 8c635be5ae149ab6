//! Shared HTTP client construction for search and fetch traffic.
//!
//! Both collaborators talk to remote hosts through `reqwest`; this module
//! keeps their timeout and User-Agent policy in one place.

use std::time::Duration;

use reqwest::Client;
use tracing::debug;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large images).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/imgharvest";

/// Timeout settings applied to every client built by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,
    /// Whole-request timeout in seconds.
    pub read_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect_secs: CONNECT_TIMEOUT_SECS,
            read_secs: READ_TIMEOUT_SECS,
        }
    }
}

/// Default User-Agent (identifies the tool and its version).
#[must_use]
pub fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("imgharvest/{version} (+{PROJECT_UA_URL})")
}

/// Builds a `reqwest` client with the given timeouts.
///
/// # Errors
///
/// Returns the underlying `reqwest::Error` if the TLS backend or system
/// configuration cannot be initialized.
pub fn build_client(timeouts: HttpTimeouts) -> Result<Client, reqwest::Error> {
    debug!(
        connect_secs = timeouts.connect_secs,
        read_secs = timeouts.read_secs,
        "building HTTP client"
    );
    Client::builder()
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .timeout(Duration::from_secs(timeouts.read_secs))
        .gzip(true)
        .user_agent(default_user_agent())
        .build()
}
