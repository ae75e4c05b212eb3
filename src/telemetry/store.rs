//! In-process metrics storage.
//!
//! Complements the `metrics` facade for callers that want the numbers
//! without installing a recorder: the CLI simulator reads its report from
//! here, and tests assert against it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::metrics::{
    DISPATCHED_TOTAL, EXECUTING_REQUESTS, REJECTED_TOTAL, SEATS_IN_USE, WAITING_REQUESTS,
    WAITING_SEATS, WAIT_SECONDS,
};
use crate::scheduler::{QueueSetObserver, RejectReason};

/// Snapshot of all stored series at a point in time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub counters: HashMap<String, u64>,
    pub gauges: HashMap<String, f64>,
    pub histograms: HashMap<String, HistogramSummary>,
}

impl MetricsSnapshot {
    pub fn counter(&self, key: &str) -> u64 {
        self.counters.get(key).copied().unwrap_or(0)
    }

    pub fn gauge(&self, key: &str) -> f64 {
        self.gauges.get(key).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistogramSummary {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
}

impl HistogramSummary {
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// f64 cell stored as bits in an atomic.
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn update(&self, f: impl Fn(f64) -> Option<f64>) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                f(f64::from_bits(bits)).map(f64::to_bits)
            });
    }
}

struct HistogramData {
    count: AtomicU64,
    sum: AtomicF64,
    min: AtomicF64,
    max: AtomicF64,
}

impl HistogramData {
    fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            sum: AtomicF64::new(0.0),
            min: AtomicF64::new(f64::MAX),
            max: AtomicF64::new(f64::MIN),
        }
    }

    fn record(&self, value: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum.update(|sum| Some(sum + value));
        self.min.update(|min| (value < min).then_some(value));
        self.max.update(|max| (value > max).then_some(value));
    }

    fn summary(&self) -> HistogramSummary {
        let count = self.count.load(Ordering::Relaxed);
        HistogramSummary {
            count,
            sum: self.sum.load(),
            min: if count == 0 { 0.0 } else { self.min.load() },
            max: if count == 0 { 0.0 } else { self.max.load() },
        }
    }
}

/// Thread-safe store of counters, gauges, and histograms keyed by name.
pub struct MetricsStore {
    counters: RwLock<HashMap<String, AtomicU64>>,
    gauges: RwLock<HashMap<String, AtomicF64>>,
    histograms: RwLock<HashMap<String, HistogramData>>,
}

impl MetricsStore {
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(HashMap::new()),
            gauges: RwLock::new(HashMap::new()),
            histograms: RwLock::new(HashMap::new()),
        }
    }

    pub fn increment_counter(&self, name: &str, value: u64) {
        if let Some(counter) = self.counters.read().get(name) {
            counter.fetch_add(value, Ordering::Relaxed);
            return;
        }
        self.counters
            .write()
            .entry(name.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(value, Ordering::Relaxed);
    }

    /// Add `delta` to a gauge, creating it at zero.
    pub fn add_gauge(&self, name: &str, delta: f64) {
        if let Some(gauge) = self.gauges.read().get(name) {
            gauge.update(|v| Some(v + delta));
            return;
        }
        self.gauges
            .write()
            .entry(name.to_string())
            .or_insert_with(|| AtomicF64::new(0.0))
            .update(|v| Some(v + delta));
    }

    pub fn set_gauge(&self, name: &str, value: f64) {
        if let Some(gauge) = self.gauges.read().get(name) {
            gauge.update(|_| Some(value));
            return;
        }
        self.gauges
            .write()
            .insert(name.to_string(), AtomicF64::new(value));
    }

    pub fn record_histogram(&self, name: &str, value: f64) {
        if let Some(histogram) = self.histograms.read().get(name) {
            histogram.record(value);
            return;
        }
        self.histograms
            .write()
            .entry(name.to_string())
            .or_insert_with(HistogramData::new)
            .record(value);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self
                .counters
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
                .collect(),
            gauges: self
                .gauges
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), v.load()))
                .collect(),
            histograms: self
                .histograms
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), v.summary()))
                .collect(),
        }
    }
}

impl Default for MetricsStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Key for a per-flow series: `name{flow}`.
pub fn flow_key(name: &str, flow: &str) -> String {
    format!("{name}{{{flow}}}")
}

/// Key for a per-flow, per-reason rejection counter: `name{flow,reason}`.
pub fn rejection_key(flow: &str, reason: RejectReason) -> String {
    format!("{REJECTED_TOTAL}{{{flow},{}}}", reason.as_str())
}

/// Observer that aggregates queue set notifications into a [`MetricsStore`].
///
/// Series are keyed per flow; the queue set name is not part of the key.
#[derive(Default)]
pub struct StoreObserver {
    store: MetricsStore,
}

impl StoreObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &MetricsStore {
        &self.store
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.store.snapshot()
    }
}

impl QueueSetObserver for StoreObserver {
    fn waiting_changed(&self, _queue_set: &str, flow: &str, requests: i64, seats: i64) {
        self.store.add_gauge(&flow_key(WAITING_REQUESTS, flow), requests as f64);
        self.store.add_gauge(&flow_key(WAITING_SEATS, flow), seats as f64);
    }

    fn executing_changed(&self, _queue_set: &str, flow: &str, delta: i64) {
        self.store.add_gauge(&flow_key(EXECUTING_REQUESTS, flow), delta as f64);
    }

    fn seats_in_use_changed(&self, _queue_set: &str, flow: &str, delta: i64) {
        self.store.add_gauge(&flow_key(SEATS_IN_USE, flow), delta as f64);
    }

    fn dispatched(&self, _queue_set: &str, flow: &str, waited: Duration) {
        self.store.increment_counter(&flow_key(DISPATCHED_TOTAL, flow), 1);
        self.store
            .record_histogram(&flow_key(WAIT_SECONDS, flow), waited.as_secs_f64());
    }

    fn rejected(&self, _queue_set: &str, flow: &str, reason: RejectReason) {
        self.store.increment_counter(&rejection_key(flow, reason), 1);
    }
}
