//! Error handling for reachability probing.
//!
//! Setup-level failures (nothing to check, a run already in flight, bad
//! configuration) are surfaced to the caller. Per-attempt failures are
//! represented here too, but the probe collapses them into
//! [`ProbeResult::Blocked`](crate::ProbeResult::Blocked) before they can leave
//! the scheduler.

use std::fmt;
use std::time::Duration;

/// Main error type for reachability checking.
#[derive(Debug, Clone, PartialEq)]
pub enum ReachCheckError {
    /// The input text contained no valid domain names
    ExtractionEmpty {
        /// Where the text came from (file name, "input", ...)
        source: String,
    },

    /// A run is already active on this prober
    AlreadyRunning,

    /// A single probe attempt exceeded its timeout
    ProbeTimeout {
        domain: String,
        duration: Duration,
    },

    /// A single probe attempt failed at the transport layer
    /// (DNS failure, refused/reset connection, TLS failure)
    ProbeTransportFailure {
        domain: String,
        message: String,
    },

    /// A response arrived but strict mode requires a 2xx status
    UnexpectedStatus {
        domain: String,
        status: u16,
    },

    /// A probe attempt was aborted because the run was cancelled
    Cancelled,

    /// Configuration errors (invalid settings, unparsable files)
    ConfigError {
        message: String,
    },

    /// File I/O errors when reading list or configuration files
    FileError {
        path: String,
        message: String,
    },

    /// Generic internal errors that don't fit other categories
    Internal {
        message: String,
    },
}

impl ReachCheckError {
    /// Create a new "nothing to check" error.
    pub fn extraction_empty<S: Into<String>>(source: S) -> Self {
        Self::ExtractionEmpty {
            source: source.into(),
        }
    }

    /// Create a new probe timeout error.
    pub fn probe_timeout<D: Into<String>>(domain: D, duration: Duration) -> Self {
        Self::ProbeTimeout {
            domain: domain.into(),
            duration,
        }
    }

    /// Create a new transport failure error.
    pub fn transport<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::ProbeTransportFailure {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error belongs to a single probe attempt.
    ///
    /// Attempt-level errors are absorbed into a `Blocked` classification;
    /// everything else is a setup error the caller has to handle.
    pub fn is_attempt_failure(&self) -> bool {
        matches!(
            self,
            Self::ProbeTimeout { .. }
                | Self::ProbeTransportFailure { .. }
                | Self::UnexpectedStatus { .. }
                | Self::Cancelled
        )
    }
}

impl fmt::Display for ReachCheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExtractionEmpty { source } => {
                write!(f, "No domains found in {}", source)
            }
            Self::AlreadyRunning => {
                write!(f, "A domain check is already running")
            }
            Self::ProbeTimeout { domain, duration } => {
                write!(f, "Probe of '{}' timed out after {:?}", domain, duration)
            }
            Self::ProbeTransportFailure { domain, message } => {
                write!(f, "Probe of '{}' failed: {}", domain, message)
            }
            Self::UnexpectedStatus { domain, status } => {
                write!(f, "Probe of '{}' got HTTP {} (strict mode requires 2xx)", domain, status)
            }
            Self::Cancelled => {
                write!(f, "Probe cancelled")
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for ReachCheckError {}

impl From<std::io::Error> for ReachCheckError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

impl From<toml::de::Error> for ReachCheckError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigError {
            message: format!("Failed to parse TOML configuration: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_failures_are_classified() {
        assert!(ReachCheckError::probe_timeout("a.com", Duration::from_secs(2)).is_attempt_failure());
        assert!(ReachCheckError::transport("a.com", "refused").is_attempt_failure());
        assert!(ReachCheckError::Cancelled.is_attempt_failure());
        assert!(!ReachCheckError::AlreadyRunning.is_attempt_failure());
        assert!(!ReachCheckError::extraction_empty("input").is_attempt_failure());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ReachCheckError::extraction_empty("blocked.list").to_string(),
            "No domains found in blocked.list"
        );
        assert_eq!(
            ReachCheckError::AlreadyRunning.to_string(),
            "A domain check is already running"
        );
        assert_eq!(
            ReachCheckError::transport("a.com", "connection refused").to_string(),
            "Probe of 'a.com' failed: connection refused"
        );
    }
}
