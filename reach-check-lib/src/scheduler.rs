//! Chunked, cancellable dispatch of probes over a domain set.
//!
//! The scheduler splits the input into chunks of `concurrency` domains and
//! runs one chunk at a time. The chunk boundary is the concurrency bound: a
//! chunk is fully settled before the next one is dispatched, so no more than
//! `concurrency` probes are ever in flight. Cancellation is checked before
//! every chunk, during the pause between chunks and while a chunk settles.

use crate::cache::ProbeCache;
use crate::probe::ReachabilityProbe;
use crate::progress::{ProgressCounters, ProgressReporter};
use crate::types::{CheckConfig, Domain, ProbeResult, Summary};
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Mutable state of one run: the outcome cache and the counters.
///
/// Only the scheduler's settlement step writes to it.
#[derive(Debug)]
pub struct RunState {
    cache: ProbeCache,
    counters: ProgressCounters,
    probes_launched: usize,
}

impl RunState {
    pub fn new(total: usize) -> Self {
        Self {
            cache: ProbeCache::with_capacity(total),
            counters: ProgressCounters::new(total),
            probes_launched: 0,
        }
    }

    pub fn cache(&self) -> &ProbeCache {
        &self.cache
    }

    pub fn counters(&self) -> &ProgressCounters {
        &self.counters
    }

    /// Number of network probes started so far (cache hits excluded).
    pub fn probes_launched(&self) -> usize {
        self.probes_launched
    }

    /// Count `occurrences` resolutions of `domain` and report each one.
    ///
    /// Returns `false` as soon as cancellation is observed; occurrences not
    /// yet reported by then are neither counted nor reported.
    fn settle<R>(
        &mut self,
        domain: &Domain,
        result: ProbeResult,
        occurrences: usize,
        reporter: &mut R,
        cancel: &CancellationToken,
    ) -> bool
    where
        R: ProgressReporter + ?Sized,
    {
        for _ in 0..occurrences {
            if cancel.is_cancelled() {
                return false;
            }
            let event = self.counters.record(domain.clone(), result);
            reporter.on_result(&event);
        }
        true
    }
}

/// Drives a domain set through a probe, one chunk at a time.
pub struct BoundedScheduler<'a> {
    probe: &'a dyn ReachabilityProbe,
    concurrency: usize,
    chunk_delay: Duration,
}

impl<'a> BoundedScheduler<'a> {
    pub fn new(probe: &'a dyn ReachabilityProbe, config: &CheckConfig) -> Self {
        Self {
            probe,
            concurrency: config.concurrency.max(1),
            chunk_delay: config.chunk_delay,
        }
    }

    /// Probe every domain and return the final tally.
    ///
    /// `reporter` is called once per domain occurrence as results settle.
    /// When `cancel` fires, the current chunk's outstanding probes are
    /// dropped (aborting their requests), nothing further is reported, and the
    /// summary accumulated so far is returned with `cancelled` set.
    pub async fn run<R>(
        &self,
        domains: &[Domain],
        reporter: &mut R,
        cancel: &CancellationToken,
    ) -> Summary
    where
        R: ProgressReporter + ?Sized,
    {
        let (summary, _) = self.run_with_state(domains, reporter, cancel).await;
        summary
    }

    /// Like [`run`](Self::run), also handing back the run state.
    pub async fn run_with_state<R>(
        &self,
        domains: &[Domain],
        reporter: &mut R,
        cancel: &CancellationToken,
    ) -> (Summary, RunState)
    where
        R: ProgressReporter + ?Sized,
    {
        let started = Instant::now();
        let mut state = RunState::new(domains.len());
        let chunk_count = domains.len().div_ceil(self.concurrency);
        let mut cancelled = false;

        info!(
            total = domains.len(),
            chunks = chunk_count,
            concurrency = self.concurrency,
            "starting reachability run"
        );

        for (index, chunk) in domains.chunks(self.concurrency).enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            debug!(chunk = index + 1, of = chunk_count, size = chunk.len(), "dispatching chunk");
            if !self.run_chunk(chunk, &mut state, reporter, cancel).await {
                cancelled = true;
                break;
            }

            let is_last = index + 1 == chunk_count;
            if !is_last && !self.chunk_delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        cancelled = true;
                        break;
                    }
                    _ = tokio::time::sleep(self.chunk_delay) => {}
                }
            }
        }

        let summary = Summary {
            total: state.counters.total(),
            checked: state.counters.checked(),
            accessible: state.counters.accessible(),
            blocked: state.counters.blocked(),
            cancelled,
            elapsed: started.elapsed(),
        };

        if cancelled {
            warn!(
                checked = summary.checked,
                total = summary.total,
                "reachability run cancelled"
            );
        } else {
            info!(
                accessible = summary.accessible,
                blocked = summary.blocked,
                probes = state.probes_launched,
                elapsed_ms = summary.elapsed.as_millis() as u64,
                "reachability run finished"
            );
        }

        (summary, state)
    }

    /// Dispatch and settle one chunk. Returns `false` if cancellation was
    /// observed before the chunk fully settled.
    async fn run_chunk<R>(
        &self,
        chunk: &[Domain],
        state: &mut RunState,
        reporter: &mut R,
        cancel: &CancellationToken,
    ) -> bool
    where
        R: ProgressReporter + ?Sized,
    {
        // Occurrences per domain that still needs a network probe; repeated
        // entries inside one chunk share a single probe.
        let mut pending: HashMap<Domain, usize> = HashMap::new();
        let mut in_flight = FuturesUnordered::new();

        for domain in chunk {
            if let Some(result) = state.cache.get(domain) {
                if !state.settle(domain, result, 1, reporter, cancel) {
                    return false;
                }
                continue;
            }

            let occurrences = pending.entry(domain.clone()).or_insert(0);
            *occurrences += 1;
            if *occurrences > 1 {
                continue;
            }

            state.probes_launched += 1;
            let probe = self.probe;
            let domain = domain.clone();
            in_flight.push(async move {
                // A panicking probe is a failed probe, not a failed run.
                let result = AssertUnwindSafe(probe.probe(&domain, cancel))
                    .catch_unwind()
                    .await
                    .unwrap_or(ProbeResult::Blocked);
                (domain, result)
            });
        }

        while let Some((domain, result)) = in_flight.next().await {
            if cancel.is_cancelled() {
                // Dropping the remaining futures aborts their requests.
                return false;
            }

            state.cache.put(domain.clone(), result);
            let occurrences = pending.remove(&domain).unwrap_or(1);
            if !state.settle(&domain, result, occurrences, reporter, cancel) {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressEvent;
    use async_trait::async_trait;

    /// Accessible iff the domain's first label has an even length.
    struct ParityProbe;

    #[async_trait]
    impl ReachabilityProbe for ParityProbe {
        async fn probe(&self, domain: &Domain, _cancel: &CancellationToken) -> ProbeResult {
            let label = domain.as_str().split('.').next().unwrap_or_default();
            ProbeResult::from(label.len() % 2 == 0)
        }
    }

    struct PanickingProbe;

    #[async_trait]
    impl ReachabilityProbe for PanickingProbe {
        async fn probe(&self, domain: &Domain, _cancel: &CancellationToken) -> ProbeResult {
            if domain.as_str().starts_with("boom") {
                panic!("probe exploded");
            }
            ProbeResult::Accessible
        }
    }

    fn domains(names: &[&str]) -> Vec<Domain> {
        names.iter().map(|n| Domain::parse(n).unwrap()).collect()
    }

    fn config(concurrency: usize) -> CheckConfig {
        CheckConfig::default()
            .with_concurrency(concurrency)
            .with_chunk_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_run_counts_every_domain() {
        let probe = ParityProbe;
        let scheduler = BoundedScheduler::new(&probe, &config(2));
        let input = domains(&["ab.com", "abc.com", "abcd.com", "a.com", "xy.org"]);

        let mut events: Vec<ProgressEvent> = Vec::new();
        let mut reporter = |event: &ProgressEvent| events.push(event.clone());
        let summary = scheduler
            .run(&input, &mut reporter, &CancellationToken::new())
            .await;

        assert_eq!(summary.total, 5);
        assert_eq!(summary.checked, 5);
        assert_eq!(summary.accessible, 3);
        assert_eq!(summary.blocked, 2);
        assert!(!summary.cancelled);
        assert!(summary.is_complete());

        assert_eq!(events.len(), 5);
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.checked, i + 1);
            assert_eq!(event.accessible + event.blocked, event.checked);
        }
    }

    #[tokio::test]
    async fn test_duplicates_in_one_chunk_share_a_probe() {
        let probe = ParityProbe;
        let scheduler = BoundedScheduler::new(&probe, &config(10));
        let input = domains(&["ab.com", "ab.com", "cd.com"]);

        let (summary, state) = scheduler
            .run_with_state(&input, &mut crate::progress::NoopReporter, &CancellationToken::new())
            .await;

        assert_eq!(summary.checked, 3);
        assert_eq!(summary.accessible, 3);
        assert_eq!(state.probes_launched(), 2);
        assert_eq!(state.cache().len(), 2);
    }

    #[tokio::test]
    async fn test_cache_hits_across_chunks() {
        let probe = ParityProbe;
        let scheduler = BoundedScheduler::new(&probe, &config(1));
        let input = domains(&["ab.com", "abc.com", "ab.com", "abc.com"]);

        let (summary, state) = scheduler
            .run_with_state(&input, &mut crate::progress::NoopReporter, &CancellationToken::new())
            .await;

        assert_eq!(summary.checked, 4);
        assert_eq!(summary.accessible, 2);
        assert_eq!(summary.blocked, 2);
        assert_eq!(state.probes_launched(), 2);
    }

    #[tokio::test]
    async fn test_panicking_probe_is_blocked_without_aborting_siblings() {
        let probe = PanickingProbe;
        let scheduler = BoundedScheduler::new(&probe, &config(5));
        let input = domains(&["boom.com", "fine.com", "also-fine.com"]);

        let summary = scheduler
            .run(&input, &mut crate::progress::NoopReporter, &CancellationToken::new())
            .await;

        assert_eq!(summary.checked, 3);
        assert_eq!(summary.blocked, 1);
        assert_eq!(summary.accessible, 2);
    }

    #[tokio::test]
    async fn test_pre_cancelled_run_checks_nothing() {
        let probe = ParityProbe;
        let scheduler = BoundedScheduler::new(&probe, &config(2));
        let input = domains(&["ab.com", "cd.com", "ef.com"]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut calls = 0usize;
        let mut reporter = |_: &ProgressEvent| calls += 1;
        let summary = scheduler.run(&input, &mut reporter, &cancel).await;

        assert!(summary.cancelled);
        assert_eq!(summary.checked, 0);
        assert_eq!(summary.total, 3);
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_cancel_between_duplicate_reports_stops_reporting() {
        let parity = ParityProbe;
        let scheduler = BoundedScheduler::new(&parity, &config(10));
        let input = domains(&["ab.com", "ab.com", "ab.com"]);
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        let mut reported = 0usize;
        let mut reporter = |event: &ProgressEvent| {
            reported += 1;
            if event.checked == 1 {
                canceller.cancel();
            }
        };
        let summary = scheduler.run(&input, &mut reporter, &cancel).await;

        assert!(summary.cancelled);
        assert_eq!(summary.checked, 1);
        assert_eq!(summary.accessible + summary.blocked, 1);
        assert_eq!(reported, 1);
    }

    #[tokio::test]
    async fn test_cancel_during_cache_hits_stops_reporting() {
        let parity = ParityProbe;
        let scheduler = BoundedScheduler::new(&parity, &config(1));
        // Chunks of one: the second and third entries are cache hits.
        let input = domains(&["ab.com", "ab.com", "ab.com"]);
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        let mut reported = 0usize;
        let mut reporter = |event: &ProgressEvent| {
            reported += 1;
            if event.checked == 2 {
                canceller.cancel();
            }
        };
        let summary = scheduler.run(&input, &mut reporter, &cancel).await;

        assert!(summary.cancelled);
        assert_eq!(summary.checked, 2);
        assert_eq!(reported, 2);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let probe = ParityProbe;
        let scheduler = BoundedScheduler::new(&probe, &config(2));
        let summary = scheduler
            .run(&[], &mut crate::progress::NoopReporter, &CancellationToken::new())
            .await;

        assert_eq!(summary.total, 0);
        assert_eq!(summary.checked, 0);
        assert!(summary.is_complete());
    }
}
