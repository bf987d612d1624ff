use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Instant;

use serde::Serialize;

/// Reservoir size per histogram; percentiles are computed over at most this
/// many of the latest samples while count/min/max/avg track every sample.
const RESERVOIR_SIZE: usize = 1_024;

/// Process-wide counters and latency histograms.
///
/// Shared mutable state behind one mutex; critical sections are O(1) writes.
/// Percentile computation sorts a copy of the reservoir and only happens on
/// snapshot reads.
pub struct Metrics {
    started_at: Instant,
    inner: Mutex<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    counters: BTreeMap<String, u64>,
    histograms: BTreeMap<String, Histogram>,
}

struct Histogram {
    samples: Vec<f64>,
    next_slot: usize,
    count: u64,
    min: f64,
    max: f64,
    sum: f64,
}

impl Histogram {
    fn new() -> Self {
        Self { samples: Vec::new(), next_slot: 0, count: 0, min: f64::MAX, max: f64::MIN, sum: 0.0 }
    }

    fn record(&mut self, value: f64) {
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
        if self.samples.len() < RESERVOIR_SIZE {
            self.samples.push(value);
        } else {
            self.samples[self.next_slot] = value;
            self.next_slot = (self.next_slot + 1) % RESERVOIR_SIZE;
        }
    }

    fn snapshot(&self) -> HistogramSnapshot {
        let mut sorted = self.samples.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let pct = |p: f64| -> f64 {
            if sorted.is_empty() {
                return 0.0;
            }
            let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
            sorted[idx.min(sorted.len() - 1)]
        };
        HistogramSnapshot {
            count: self.count,
            min: if self.count == 0 { 0.0 } else { self.min },
            max: if self.count == 0 { 0.0 } else { self.max },
            avg: if self.count == 0 { 0.0 } else { self.sum / self.count as f64 },
            p50: pct(0.50),
            p95: pct(0.95),
            p99: pct(0.99),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_seconds: u64,
    pub counters: BTreeMap<String, u64>,
    pub histograms: BTreeMap<String, HistogramSnapshot>,
}

impl Metrics {
    pub fn new() -> Self {
        Self { started_at: Instant::now(), inner: Mutex::new(MetricsInner::default()) }
    }

    pub fn incr(&self, name: &str) {
        let mut inner = self.inner.lock().expect("metrics mutex poisoned");
        *inner.counters.entry(name.to_string()).or_insert(0) += 1;
    }

    pub fn observe_ms(&self, name: &str, millis: f64) {
        let mut inner = self.inner.lock().expect("metrics mutex poisoned");
        inner.histograms.entry(name.to_string()).or_insert_with(Histogram::new).record(millis);
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.lock().expect("metrics mutex poisoned");
        MetricsSnapshot {
            uptime_seconds: self.uptime_seconds(),
            counters: inner.counters.clone(),
            histograms: inner.histograms.iter().map(|(k, v)| (k.clone(), v.snapshot())).collect(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
