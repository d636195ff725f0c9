//! Core data types for reachability checking.
//!
//! This module defines the normalized [`Domain`] newtype, the two-valued
//! [`ProbeResult`], the end-of-run [`Summary`], and the [`CheckConfig`] that
//! tunes the scheduler and the HTTP probe.

use crate::extract::is_valid_hostname;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

/// A normalized hostname.
///
/// Always lowercase, without scheme, `www.` prefix, path, port or query, and
/// matching the minimal hostname shape (labels of letters, digits, hyphens
/// and dots, ending in a top-level label of two or more letters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Domain(String);

impl Domain {
    /// Validate an already-stripped candidate and wrap it.
    ///
    /// The candidate is lowercased; nothing else is removed. Use
    /// [`extract_domains`](crate::extract_domains) for raw list-file lines.
    pub fn parse(candidate: &str) -> Option<Self> {
        let candidate = candidate.trim();
        if is_valid_hostname(candidate) {
            Some(Self(candidate.to_lowercase()))
        } else {
            None
        }
    }

    /// The hostname as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Domain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Outcome of probing one domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeResult {
    /// Some attempt completed a connection and got a response back
    Accessible,
    /// Every attempt failed, timed out or was aborted
    Blocked,
}

impl ProbeResult {
    pub fn is_accessible(self) -> bool {
        matches!(self, ProbeResult::Accessible)
    }
}

impl From<bool> for ProbeResult {
    fn from(accessible: bool) -> Self {
        if accessible {
            ProbeResult::Accessible
        } else {
            ProbeResult::Blocked
        }
    }
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeResult::Accessible => write!(f, "accessible"),
            ProbeResult::Blocked => write!(f, "blocked"),
        }
    }
}

/// Final tally of a run.
///
/// A cancelled run reports the counters accumulated up to the point the
/// cancellation was observed, so `checked < total` whenever at least one
/// chunk was never dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub checked: usize,
    pub accessible: usize,
    pub blocked: usize,
    /// Whether the run stopped because of a cancellation request
    pub cancelled: bool,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl Summary {
    /// Whether every domain of the run was checked.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.checked == self.total
    }
}

/// Configuration options for a probe run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Maximum number of probes in flight (the chunk size)
    /// Default: 50, Range: 1-100
    pub concurrency: usize,

    /// Timeout for each individual probe attempt
    /// Default: 2000 ms
    #[serde(skip)]
    pub timeout: Duration,

    /// Pause between two chunks
    /// Default: 50 ms
    #[serde(skip)]
    pub chunk_delay: Duration,

    /// Only count 2xx responses as reachable.
    /// Default: false (any completed response counts)
    pub strict_status: bool,

    /// Path requested on every probed host
    /// Default: "/favicon.ico"
    pub probe_path: String,

    /// Custom User-Agent header for probe requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Port used for the HTTPS attempt instead of 443
    #[serde(skip_serializing_if = "Option::is_none")]
    pub https_port: Option<u16>,

    /// Port used for the HTTP attempt instead of 80
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_port: Option<u16>,

    /// Static DNS overrides applied to the probe client
    #[serde(skip)]
    pub resolve: Vec<(String, SocketAddr)>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            concurrency: 50,
            timeout: Duration::from_millis(2000),
            chunk_delay: Duration::from_millis(50),
            strict_status: false,
            probe_path: "/favicon.ico".to_string(),
            user_agent: None,
            https_port: None,
            http_port: None,
            resolve: Vec::new(),
        }
    }
}

impl CheckConfig {
    /// Set the number of probes in flight.
    ///
    /// Automatically capped at 100 to prevent resource exhaustion.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, 100);
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the pause between chunks.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Require a 2xx status for a domain to count as accessible.
    pub fn with_strict_status(mut self, strict: bool) -> Self {
        self.strict_status = strict;
        self
    }

    /// Set the path requested on every host.
    pub fn with_probe_path<P: Into<String>>(mut self, path: P) -> Self {
        self.probe_path = path.into();
        self
    }

    pub fn with_user_agent<U: Into<String>>(mut self, user_agent: U) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Override the ports used for the HTTPS and HTTP attempts.
    pub fn with_ports(mut self, https_port: Option<u16>, http_port: Option<u16>) -> Self {
        self.https_port = https_port;
        self.http_port = http_port;
        self
    }

    /// Pin a hostname to a fixed address, bypassing DNS.
    pub fn with_resolve<H: Into<String>>(mut self, host: H, addr: SocketAddr) -> Self {
        self.resolve.push((host.into(), addr));
        self
    }
}
