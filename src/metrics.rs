//! Per-parser performance counters, collected when a parse runs with the
//! `trace` option. A [`ParseMetrics`] sink can be shared across parses to
//! aggregate measurements.

use std::collections::HashMap;
use std::time::Duration;

/// Counters for a single parser node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserMetrics {
    pub name: String,
    pub invocations: u64,
    pub successes: u64,
    pub total_time: Duration,
}

/// Metrics for every parser invoked during one or more traced parses, keyed
/// by node identity.
#[derive(Debug, Clone, Default)]
pub struct ParseMetrics {
    metrics: HashMap<usize, ParserMetrics>,
}

impl ParseMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, key: usize, name: &str, success: bool, elapsed: Duration) {
        let entry = self.metrics.entry(key).or_default();
        if entry.name.is_empty() {
            entry.name = name.to_string();
        }
        entry.invocations += 1;
        if success {
            entry.successes += 1;
        }
        entry.total_time += elapsed;
    }

    /// Folds another collection into this one, summing counters per node.
    pub fn merge(&mut self, other: &ParseMetrics) {
        for (key, theirs) in &other.metrics {
            let entry = self.metrics.entry(*key).or_default();
            if entry.name.is_empty() {
                entry.name = theirs.name.clone();
            }
            entry.invocations += theirs.invocations;
            entry.successes += theirs.successes;
            entry.total_time += theirs.total_time;
        }
    }

    /// Looks a parser up by display name (first match).
    pub fn get(&self, name: &str) -> Option<&ParserMetrics> {
        self.metrics.values().find(|m| m.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParserMetrics> {
        self.metrics.values()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_sums_counters_per_node() {
        let mut a = ParseMetrics::new();
        a.record(1, "value", true, Duration::from_micros(5));
        a.record(1, "value", false, Duration::from_micros(3));

        let mut b = ParseMetrics::new();
        b.record(1, "value", true, Duration::from_micros(2));
        b.record(2, "number", true, Duration::ZERO);

        a.merge(&b);
        let value = a.get("value").unwrap();
        assert_eq!(value.invocations, 3);
        assert_eq!(value.successes, 2);
        assert_eq!(value.total_time, Duration::from_micros(10));
        assert_eq!(a.len(), 2);
    }
}
