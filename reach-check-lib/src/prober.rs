//! The prober control surface: start, cancel, and is-running.
//!
//! A [`DomainProber`] owns at most one active run. Clones share the active
//! slot, so one task can drive a run while another cancels it or polls its
//! status. Separate `DomainProber` instances are fully independent.

use crate::error::ReachCheckError;
use crate::extract::extract_domains;
use crate::probe::{HttpProbe, ReachabilityProbe};
use crate::progress::ProgressReporter;
use crate::scheduler::BoundedScheduler;
use crate::types::{CheckConfig, Domain, Summary};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

type ActiveSlot = Arc<Mutex<Option<CancellationToken>>>;

/// Entry point for reachability runs.
///
/// # Example
///
/// ```rust,no_run
/// use reach_check_lib::{DomainProber, ProgressEvent};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let prober = DomainProber::new()?;
///     let mut print = |event: &ProgressEvent| {
///         println!("[{}/{}] {} {}", event.checked, event.total, event.domain, event.result);
///     };
///     let summary = prober.check_text("example.com\nexample.org\n", &mut print).await?;
///     println!("{} accessible, {} blocked", summary.accessible, summary.blocked);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct DomainProber {
    config: CheckConfig,
    probe: Arc<dyn ReachabilityProbe>,
    active: ActiveSlot,
}

impl DomainProber {
    /// Create a prober with the default configuration and HTTP probe.
    pub fn new() -> Result<Self, ReachCheckError> {
        Self::with_config(CheckConfig::default())
    }

    /// Create a prober using the HTTP probe built from `config`.
    pub fn with_config(config: CheckConfig) -> Result<Self, ReachCheckError> {
        let probe = HttpProbe::with_config(&config)?;
        Ok(Self::with_probe(config, probe))
    }

    /// Create a prober around a custom probe implementation.
    pub fn with_probe<P>(config: CheckConfig, probe: P) -> Self
    where
        P: ReachabilityProbe + 'static,
    {
        Self {
            config,
            probe: Arc::new(probe),
            active: Arc::new(Mutex::new(None)),
        }
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// Whether a run is currently in flight.
    pub fn is_running(&self) -> bool {
        lock(&self.active).is_some()
    }

    /// Signal the active run to stop.
    ///
    /// Returns `false` if there was nothing to cancel. The run itself returns
    /// its partial summary once it observes the signal.
    pub fn cancel(&self) -> bool {
        match lock(&self.active).as_ref() {
            Some(token) => {
                info!("cancelling active reachability run");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Probe `domains`, reporting each settled domain to `reporter`.
    ///
    /// # Errors
    ///
    /// - [`ReachCheckError::AlreadyRunning`] if another run is in flight on
    ///   this prober (or one of its clones); that run is left untouched.
    /// - [`ReachCheckError::ExtractionEmpty`] if `domains` is empty.
    ///
    /// Per-domain failures never surface here; they are counted as blocked.
    pub async fn start<R>(&self, domains: &[Domain], reporter: &mut R) -> Result<Summary, ReachCheckError>
    where
        R: ProgressReporter + ?Sized,
    {
        let run = ActiveRun::claim(&self.active)?;

        if domains.is_empty() {
            return Err(ReachCheckError::extraction_empty("input"));
        }

        let scheduler = BoundedScheduler::new(self.probe.as_ref(), &self.config);
        let summary = scheduler.run(domains, reporter, &run.token).await;
        Ok(summary)
    }

    /// Extract domains from list-file text and probe them.
    pub async fn check_text<R>(&self, text: &str, reporter: &mut R) -> Result<Summary, ReachCheckError>
    where
        R: ProgressReporter + ?Sized,
    {
        let domains = extract_domains(text);
        debug!(count = domains.len(), "extracted domains");
        self.start(&domains, reporter).await
    }
}

/// Occupies the active slot for the duration of a run and frees it on drop,
/// including when the run future itself is dropped.
struct ActiveRun {
    slot: ActiveSlot,
    token: CancellationToken,
}

impl ActiveRun {
    fn claim(slot: &ActiveSlot) -> Result<Self, ReachCheckError> {
        let mut active = lock(slot);
        if active.is_some() {
            return Err(ReachCheckError::AlreadyRunning);
        }

        let token = CancellationToken::new();
        *active = Some(token.clone());
        Ok(Self {
            slot: Arc::clone(slot),
            token,
        })
    }
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        *lock(&self.slot) = None;
    }
}

fn lock(slot: &ActiveSlot) -> MutexGuard<'_, Option<CancellationToken>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
