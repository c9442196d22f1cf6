//! Counters for validation throughput reporting.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// A thread-safe counter collection, keyed by a fixed set of names.
pub struct StatsCounter {
    counters: HashMap<&'static str, AtomicU64>,
}

impl StatsCounter {
    pub fn new(names: &[&'static str]) -> Self {
        let mut counters = HashMap::new();
        for &name in names {
            counters.insert(name, AtomicU64::new(0));
        }
        Self { counters }
    }

    pub fn increment(&self, name: &str) {
        self.add(name, 1);
    }

    pub fn add(&self, name: &str, value: u64) {
        if let Some(counter) = self.counters.get(name) {
            counter.fetch_add(value, Ordering::Relaxed);
        }
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counters
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> HashMap<&'static str, u64> {
        self.counters
            .iter()
            .map(|(&k, v)| (k, v.load(Ordering::Relaxed)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_known_names_and_ignores_unknown() {
        let stats = StatsCounter::new(&["accepted", "rejected"]);
        stats.increment("accepted");
        stats.add("accepted", 2);
        stats.increment("dropped");
        assert_eq!(stats.get("accepted"), 3);
        assert_eq!(stats.get("rejected"), 0);
        assert_eq!(stats.get("dropped"), 0);
    }

    #[test]
    fn snapshot_reflects_all_counters() {
        let stats = StatsCounter::new(&["accepted"]);
        stats.add("accepted", 5);
        assert_eq!(stats.snapshot().get("accepted"), Some(&5));
    }
}
