use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;

/// Counters the output reports into. Calls never fail.
pub trait OutputStats: Send + Sync {
    /// A batch of `events` events was handed to the output.
    fn new_batch(&self, events: usize);

    /// Events that could not be encoded and are lost.
    fn dropped(&self, events: usize);

    /// Events handed back for retry after a failed write.
    fn failed(&self, events: usize);

    /// Events the database accepted.
    fn acked(&self, events: usize);
}

/// Reports into the global `metrics` recorder.
#[derive(Clone, Copy, Debug, Default)]
pub struct MetricsStats;

impl OutputStats for MetricsStats {
    fn new_batch(&self, events: usize) {
        counter!("influxdb_batches_total").increment(1);
        counter!("influxdb_events_received_total").increment(events as u64);
    }

    fn dropped(&self, events: usize) {
        counter!("influxdb_events_dropped_total").increment(events as u64);
    }

    fn failed(&self, events: usize) {
        counter!("influxdb_events_failed_total").increment(events as u64);
    }

    fn acked(&self, events: usize) {
        counter!("influxdb_events_acked_total").increment(events as u64);
    }
}

/// Keeps running totals in memory.
#[derive(Debug, Default)]
pub struct AtomicStats {
    batches: AtomicU64,
    events: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
    acked: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub batches: u64,
    pub events: u64,
    pub dropped: u64,
    pub failed: u64,
    pub acked: u64,
}

impl AtomicStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            batches: self.batches.load(Ordering::Relaxed),
            events: self.events.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            acked: self.acked.load(Ordering::Relaxed),
        }
    }
}

impl OutputStats for AtomicStats {
    fn new_batch(&self, events: usize) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.events.fetch_add(events as u64, Ordering::Relaxed);
    }

    fn dropped(&self, events: usize) {
        self.dropped.fetch_add(events as u64, Ordering::Relaxed);
    }

    fn failed(&self, events: usize) {
        self.failed.fetch_add(events as u64, Ordering::Relaxed);
    }

    fn acked(&self, events: usize) {
        self.acked.fetch_add(events as u64, Ordering::Relaxed);
    }
}

/// Reports into both.
impl<A: OutputStats, B: OutputStats> OutputStats for (A, B) {
    fn new_batch(&self, events: usize) {
        self.0.new_batch(events);
        self.1.new_batch(events);
    }

    fn dropped(&self, events: usize) {
        self.0.dropped(events);
        self.1.dropped(events);
    }

    fn failed(&self, events: usize) {
        self.0.failed(events);
        self.1.failed(events);
    }

    fn acked(&self, events: usize) {
        self.0.acked(events);
        self.1.acked(events);
    }
}
