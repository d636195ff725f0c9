//! Single-domain reachability probes.
//!
//! A probe answers one question: did any application-layer exchange with the
//! domain complete? The HTTP implementation tries HTTPS first and falls back
//! to plain HTTP once. Every failure mode (timeout, DNS, refused or reset
//! connections, TLS errors, cancellation) ends up as
//! [`ProbeResult::Blocked`]; nothing is raised to the caller.

use crate::error::ReachCheckError;
use crate::types::{CheckConfig, Domain, ProbeResult};
use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One reachability check for one domain.
///
/// Implementations must resolve every failure to `Blocked` and should stop
/// promptly once `cancel` fires.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn probe(&self, domain: &Domain, cancel: &CancellationToken) -> ProbeResult;
}

#[async_trait]
impl<P> ReachabilityProbe for Arc<P>
where
    P: ReachabilityProbe + ?Sized,
{
    async fn probe(&self, domain: &Domain, cancel: &CancellationToken) -> ProbeResult {
        (**self).probe(domain, cancel).await
    }
}

/// URL scheme of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Https,
    Http,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Https => write!(f, "https"),
            Scheme::Http => write!(f, "http"),
        }
    }
}

/// Probe that issues a `HEAD` request for a small asset, HTTPS first.
///
/// In the default lenient mode any response, whatever its status, proves the
/// connection completed and the domain counts as accessible. With
/// `strict_status` only a 2xx response counts.
#[derive(Clone)]
pub struct HttpProbe {
    /// HTTP client shared by every attempt
    http_client: reqwest::Client,
    /// Bound on each individual attempt
    timeout: Duration,
    strict_status: bool,
    path: String,
    https_port: Option<u16>,
    http_port: Option<u16>,
}

impl HttpProbe {
    /// Create a probe with default settings.
    pub fn new() -> Result<Self, ReachCheckError> {
        Self::with_config(&CheckConfig::default())
    }

    /// Create a probe from a run configuration.
    pub fn with_config(config: &CheckConfig) -> Result<Self, ReachCheckError> {
        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("reach-check/{}", env!("CARGO_PKG_VERSION")));

        // Reachability is judged from this host, so system proxies are ignored
        // and redirects are answers in their own right.
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout + Duration::from_millis(500))
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .user_agent(user_agent);

        for (host, addr) in &config.resolve {
            builder = builder.resolve(host, *addr);
        }

        let http_client = builder.build().map_err(|e| {
            ReachCheckError::internal(format!("Failed to create probe HTTP client: {}", e))
        })?;

        let path = if config.probe_path.starts_with('/') {
            config.probe_path.clone()
        } else {
            format!("/{}", config.probe_path)
        };

        Ok(Self {
            http_client,
            timeout: config.timeout,
            strict_status: config.strict_status,
            path,
            https_port: config.https_port,
            http_port: config.http_port,
        })
    }

    /// Build the URL requested for `domain` over `scheme`.
    pub fn url_for(&self, scheme: Scheme, domain: &Domain) -> String {
        let port = match scheme {
            Scheme::Https => self.https_port,
            Scheme::Http => self.http_port,
        };

        match port {
            Some(port) => format!("{}://{}:{}{}", scheme, domain, port, self.path),
            None => format!("{}://{}{}", scheme, domain, self.path),
        }
    }

    /// Make one attempt over `scheme`.
    ///
    /// `Ok(())` means the attempt counts as a completed exchange.
    async fn attempt(
        &self,
        scheme: Scheme,
        domain: &Domain,
        cancel: &CancellationToken,
    ) -> Result<(), ReachCheckError> {
        let url = self.url_for(scheme, domain);
        let request = self
            .http_client
            .head(&url)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send();

        // Dropping the request future on cancellation closes the connection.
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReachCheckError::Cancelled),
            outcome = tokio::time::timeout(self.timeout, request) => match outcome {
                Err(_) => return Err(ReachCheckError::probe_timeout(domain.as_str(), self.timeout)),
                Ok(Err(e)) if e.is_timeout() => {
                    return Err(ReachCheckError::probe_timeout(domain.as_str(), self.timeout))
                }
                Ok(Err(e)) => return Err(ReachCheckError::transport(domain.as_str(), e.to_string())),
                Ok(Ok(response)) => response,
            },
        };

        let status = response.status();
        if self.strict_status && !status.is_success() {
            return Err(ReachCheckError::UnexpectedStatus {
                domain: domain.to_string(),
                status: status.as_u16(),
            });
        }

        debug!(%domain, %scheme, status = status.as_u16(), "probe attempt completed");
        Ok(())
    }
}

#[async_trait]
impl ReachabilityProbe for HttpProbe {
    async fn probe(&self, domain: &Domain, cancel: &CancellationToken) -> ProbeResult {
        first_completed(domain, move |scheme| self.attempt(scheme, domain, cancel)).await
    }
}

/// Run `attempt` over HTTPS, then HTTP, stopping at the first completed
/// exchange. A cancelled attempt ends the sequence as `Blocked`.
async fn first_completed<F, Fut>(domain: &Domain, mut attempt: F) -> ProbeResult
where
    F: FnMut(Scheme) -> Fut,
    Fut: Future<Output = Result<(), ReachCheckError>>,
{
    for scheme in [Scheme::Https, Scheme::Http] {
        match attempt(scheme).await {
            Ok(()) => return ProbeResult::Accessible,
            Err(ReachCheckError::Cancelled) => {
                debug!(%domain, %scheme, "probe attempt aborted");
                return ProbeResult::Blocked;
            }
            Err(e) => {
                debug!(%domain, %scheme, error = %e, "probe attempt failed");
            }
        }
    }

    ProbeResult::Blocked
}
