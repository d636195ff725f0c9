//! Running counters and per-domain progress events.
//!
//! Counters are only ever advanced by the scheduler while it settles a
//! finished probe; reporters receive immutable snapshots.

use crate::types::{Domain, ProbeResult};
use serde::Serialize;
use tokio::sync::mpsc;

/// Snapshot emitted once per resolved domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub domain: Domain,
    pub result: ProbeResult,
    pub checked: usize,
    pub total: usize,
    pub accessible: usize,
    pub blocked: usize,
}

impl ProgressEvent {
    /// Completion percentage, rounded to the nearest integer.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.checked as f64 / self.total as f64) * 100.0).round() as u8
    }
}

/// Sink for progress events.
///
/// Called from the scheduler's settlement step, one event at a time, in the
/// order probes finish (not necessarily input order).
pub trait ProgressReporter {
    fn on_result(&mut self, event: &ProgressEvent);
}

impl<F> ProgressReporter for F
where
    F: FnMut(&ProgressEvent),
{
    fn on_result(&mut self, event: &ProgressEvent) {
        self(event)
    }
}

/// Reporter that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_result(&mut self, _event: &ProgressEvent) {}
}

/// Forwards events into an unbounded channel so a presentation layer can
/// consume them as a stream.
///
/// A dropped receiver is not an error; events are silently discarded.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    sender: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelReporter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ProgressReporter for ChannelReporter {
    fn on_result(&mut self, event: &ProgressEvent) {
        let _ = self.sender.send(event.clone());
    }
}

/// Monotonic run counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressCounters {
    total: usize,
    checked: usize,
    accessible: usize,
    blocked: usize,
}

impl ProgressCounters {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// Count one resolved domain and return the resulting snapshot.
    pub fn record(&mut self, domain: Domain, result: ProbeResult) -> ProgressEvent {
        debug_assert!(self.checked < self.total, "more results than domains");
        self.checked += 1;
        match result {
            ProbeResult::Accessible => self.accessible += 1,
            ProbeResult::Blocked => self.blocked += 1,
        }

        ProgressEvent {
            domain,
            result,
            checked: self.checked,
            total: self.total,
            accessible: self.accessible,
            blocked: self.blocked,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn checked(&self) -> usize {
        self.checked
    }

    pub fn accessible(&self) -> usize {
        self.accessible
    }

    pub fn blocked(&self) -> usize {
        self.blocked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain(name: &str) -> Domain {
        Domain::parse(name).unwrap()
    }

    #[test]
    fn test_counters_stay_consistent() {
        let mut counters = ProgressCounters::new(3);

        let first = counters.record(domain("a.com"), ProbeResult::Accessible);
        assert_eq!((first.checked, first.accessible, first.blocked), (1, 1, 0));

        let second = counters.record(domain("b.com"), ProbeResult::Blocked);
        assert_eq!((second.checked, second.accessible, second.blocked), (2, 1, 1));
        assert_eq!(second.accessible + second.blocked, second.checked);
        assert!(second.checked <= second.total);
    }

    #[test]
    fn test_percent_rounds() {
        let mut counters = ProgressCounters::new(3);
        let event = counters.record(domain("a.com"), ProbeResult::Blocked);
        assert_eq!(event.percent(), 33);
        let event = counters.record(domain("b.com"), ProbeResult::Blocked);
        assert_eq!(event.percent(), 67);
        let event = counters.record(domain("c.com"), ProbeResult::Blocked);
        assert_eq!(event.percent(), 100);
    }

    #[test]
    fn test_closure_reporter() {
        let mut seen = Vec::new();
        {
            let mut reporter = |event: &ProgressEvent| seen.push(event.domain.to_string());
            let mut counters = ProgressCounters::new(1);
            reporter.on_result(&counters.record(domain("a.com"), ProbeResult::Accessible));
        }
        assert_eq!(seen, vec!["a.com"]);
    }

    #[tokio::test]
    async fn test_channel_reporter_forwards_events() {
        let (mut reporter, mut receiver) = ChannelReporter::new();
        let mut counters = ProgressCounters::new(1);
        reporter.on_result(&counters.record(domain("a.com"), ProbeResult::Blocked));
        drop(reporter);

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.domain.as_str(), "a.com");
        assert_eq!(event.result, ProbeResult::Blocked);
        assert!(receiver.recv().await.is_none());
    }
}
