//! MetricStore — lock-protected counters and gauges.
//!
//! Every read and write takes the same `RwLock`, so a snapshot never
//! observes a torn update. Operations are pure data operations: no I/O,
//! no logging.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tally_core::{Metric, MetricKind, MetricValue};

use crate::snapshot::Snapshot;

#[derive(Debug, Default)]
struct Metrics {
    counters: BTreeMap<String, i64>,
    gauges: BTreeMap<String, f64>,
}

/// Thread-safe metric aggregate.
///
/// `MetricStore` is `Clone` + `Send` + `Sync` (backed by `Arc<RwLock<_>>`)
/// and can be shared across request handlers and the persistence task.
#[derive(Debug, Clone, Default)]
pub struct MetricStore {
    inner: Arc<RwLock<Metrics>>,
}

impl MetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated from a snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::new();
        store.replace(snapshot);
        store
    }

    /// Add `delta` to the named counter, starting from zero.
    ///
    /// Overflow wraps.
    pub fn update_counter(&self, name: &str, delta: i64) {
        let mut metrics = self.inner.write();
        let slot = metrics.counters.entry(name.to_string()).or_insert(0);
        *slot = slot.wrapping_add(delta);
    }

    /// Replace the named gauge.
    pub fn update_gauge(&self, name: &str, value: f64) {
        self.inner.write().gauges.insert(name.to_string(), value);
    }

    /// Apply an update according to its kind.
    pub fn apply(&self, metric: &Metric) {
        match metric.value {
            MetricValue::Counter(delta) => self.update_counter(&metric.name, delta),
            MetricValue::Gauge(value) => self.update_gauge(&metric.name, value),
        }
    }

    pub fn get_counter(&self, name: &str) -> Option<i64> {
        self.inner.read().counters.get(name).copied()
    }

    pub fn get_gauge(&self, name: &str) -> Option<f64> {
        self.inner.read().gauges.get(name).copied()
    }

    /// Look a metric up in the kind-space of `kind`.
    pub fn get(&self, kind: MetricKind, name: &str) -> Option<MetricValue> {
        match kind {
            MetricKind::Counter => self.get_counter(name).map(MetricValue::Counter),
            MetricKind::Gauge => self.get_gauge(name).map(MetricValue::Gauge),
        }
    }

    pub fn counters(&self) -> BTreeMap<String, i64> {
        self.inner.read().counters.clone()
    }

    pub fn gauges(&self) -> BTreeMap<String, f64> {
        self.inner.read().gauges.clone()
    }

    /// Copy both mappings under a single read lock.
    pub fn snapshot(&self) -> Snapshot {
        let metrics = self.inner.read();
        Snapshot {
            gauges: metrics.gauges.clone(),
            counters: metrics.counters.clone(),
        }
    }

    /// Replace the whole contents with `snapshot`.
    pub fn replace(&self, snapshot: Snapshot) {
        let mut metrics = self.inner.write();
        metrics.gauges = snapshot.gauges;
        metrics.counters = snapshot.counters;
    }

    pub fn is_empty(&self) -> bool {
        let metrics = self.inner.read();
        metrics.counters.is_empty() && metrics.gauges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn counter_accumulates() {
        let store = MetricStore::new();
        store.update_counter("test_counter", 1);
        assert_eq!(store.get_counter("test_counter"), Some(1));

        store.update_counter("test_counter", 1);
        assert_eq!(store.get_counter("test_counter"), Some(2));

        store.update_counter("test_counter", -2);
        assert_eq!(store.get_counter("test_counter"), Some(0));
    }

    #[test]
    fn counter_overflow_wraps() {
        let store = MetricStore::new();
        store.update_counter("c", i64::MAX);
        store.update_counter("c", 1);
        assert_eq!(store.get_counter("c"), Some(i64::MIN));
    }

    #[test]
    fn gauge_last_write_wins() {
        let store = MetricStore::new();
        store.update_gauge("test_gauge", 12.5);
        store.update_gauge("test_gauge", 7.0);
        assert_eq!(store.get_gauge("test_gauge"), Some(7.0));
    }

    #[test]
    fn missing_names_are_none() {
        let store = MetricStore::new();
        store.update_counter("test_counter", 1);
        store.update_gauge("test_gauge", 1.0);

        assert_eq!(store.get_counter("test_counter_2"), None);
        assert_eq!(store.get_gauge("test_gauge_2"), None);
        // Kind-spaces are independent.
        assert_eq!(store.get_gauge("test_counter"), None);
        assert_eq!(store.get_counter("test_gauge"), None);
    }

    #[test]
    fn apply_dispatches_on_kind() {
        let store = MetricStore::new();
        store.apply(&Metric::counter("PollCount", 5));
        store.apply(&Metric::counter("PollCount", 3));
        store.apply(&Metric::gauge("Alloc", 1.5));

        assert_eq!(store.get(MetricKind::Counter, "PollCount"), Some(MetricValue::Counter(8)));
        assert_eq!(store.get(MetricKind::Gauge, "Alloc"), Some(MetricValue::Gauge(1.5)));
        assert_eq!(store.get(MetricKind::Gauge, "PollCount"), None);
    }

    #[test]
    fn same_name_in_both_kinds() {
        let store = MetricStore::new();
        store.update_counter("x", 4);
        store.update_gauge("x", 0.5);
        assert_eq!(store.get_counter("x"), Some(4));
        assert_eq!(store.get_gauge("x"), Some(0.5));
    }

    #[test]
    fn snapshot_and_replace() {
        let store = MetricStore::new();
        store.update_counter("c", 3);
        store.update_gauge("g", 2.25);

        let snapshot = store.snapshot();
        let restored = MetricStore::from_snapshot(snapshot.clone());
        assert_eq!(restored.snapshot(), snapshot);
        assert_eq!(restored.counters(), store.counters());
        assert_eq!(restored.gauges(), store.gauges());

        // The snapshot is a copy; later writes don't leak into it.
        store.update_counter("c", 1);
        assert_eq!(snapshot.counters["c"], 3);
    }

    #[test]
    fn concurrent_counter_updates() {
        const THREADS: i64 = 8;
        const ITERATIONS: i64 = 1000;

        let store = MetricStore::new();
        std::thread::scope(|s| {
            for _ in 0..THREADS {
                let store = store.clone();
                s.spawn(move || {
                    for _ in 0..ITERATIONS {
                        store.update_counter("x", 1);
                    }
                });
            }
            // Snapshot readers racing with writers.
            s.spawn(|| {
                for _ in 0..100 {
                    let snapshot = store.snapshot();
                    assert!(snapshot.counters.get("x").copied().unwrap_or(0) <= THREADS * ITERATIONS);
                }
            });
        });

        assert_eq!(store.get_counter("x"), Some(THREADS * ITERATIONS));
    }

    proptest! {
        #[test]
        fn counter_is_sum_of_deltas(deltas in proptest::collection::vec(-1_000_000i64..1_000_000, 1..50)) {
            let store = MetricStore::new();
            for d in &deltas {
                store.update_counter("c", *d);
            }
            prop_assert_eq!(store.get_counter("c"), Some(deltas.iter().sum::<i64>()));
        }

        #[test]
        fn gauge_keeps_last_value(values in proptest::collection::vec(-1e12f64..1e12, 1..50)) {
            let store = MetricStore::new();
            for v in &values {
                store.update_gauge("g", *v);
            }
            prop_assert_eq!(store.get_gauge("g"), values.last().copied());
        }
    }
}
