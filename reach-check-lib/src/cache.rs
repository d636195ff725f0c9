//! Per-run memo of probe outcomes.

use crate::types::{Domain, ProbeResult};
use std::collections::HashMap;

/// Memoizes probe outcomes for the lifetime of one run.
///
/// Owned by the run state and written only from the scheduler's settlement
/// step. There is no eviction: a run never holds more entries than it has
/// distinct domains, and the cache is dropped with the run.
#[derive(Debug, Default)]
pub struct ProbeCache {
    entries: HashMap<Domain, ProbeResult>,
}

impl ProbeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size the cache for a run of `capacity` domains.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    pub fn get(&self, domain: &Domain) -> Option<ProbeResult> {
        self.entries.get(domain).copied()
    }

    /// Record an outcome. A later `put` for the same domain overwrites it.
    pub fn put(&mut self, domain: Domain, result: ProbeResult) {
        self.entries.insert(domain, result);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_put() {
        let mut cache = ProbeCache::new();
        let domain = Domain::parse("example.com").unwrap();

        assert_eq!(cache.get(&domain), None);
        cache.put(domain.clone(), ProbeResult::Accessible);
        assert_eq!(cache.get(&domain), Some(ProbeResult::Accessible));
        assert_eq!(cache.len(), 1);

        cache.put(domain.clone(), ProbeResult::Blocked);
        assert_eq!(cache.get(&domain), Some(ProbeResult::Blocked));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut cache = ProbeCache::with_capacity(4);
        cache.put(Domain::parse("a.com").unwrap(), ProbeResult::Blocked);
        cache.put(Domain::parse("b.com").unwrap(), ProbeResult::Accessible);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }
}
