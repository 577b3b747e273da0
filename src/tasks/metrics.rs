// src/tasks/metrics.rs

//! Job metrics tracking

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::info;

#[derive(Default)]
pub struct JobMetrics {
    events: RwLock<HashMap<String, AtomicUsize>>,
    errors: RwLock<HashMap<String, AtomicUsize>>,
    /// Total job time in ms and number of jobs, enough for the average
    durations: RwLock<(u128, u128)>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct MetricsSnapshot {
    pub events: BTreeMap<String, usize>,
    pub errors: BTreeMap<String, usize>,
    pub avg_job_ms: Option<u128>,
}

fn bump(map: &RwLock<HashMap<String, AtomicUsize>>, key: &str) {
    if let Some(counter) = map.read().get(key) {
        counter.fetch_add(1, Ordering::Relaxed);
        return;
    }
    map.write()
        .entry(key.to_string())
        .or_insert_with(|| AtomicUsize::new(0))
        .fetch_add(1, Ordering::Relaxed);
}

fn collect(map: &RwLock<HashMap<String, AtomicUsize>>) -> BTreeMap<String, usize> {
    map.read()
        .iter()
        .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
        .collect()
}

impl JobMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `event` (submitted, completed, comment_created, ...)
    pub fn record(&self, event: &str) {
        bump(&self.events, event);
    }

    pub fn record_error(&self, kind: &str) {
        bump(&self.errors, kind);
    }

    pub fn record_job_duration(&self, duration: Duration) {
        let mut durations = self.durations.write();
        durations.0 = durations.0.saturating_add(duration.as_millis());
        durations.1 += 1;
    }

    pub fn count(&self, event: &str) -> usize {
        self.events
            .read()
            .get(event)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn error_count(&self, kind: &str) -> usize {
        self.errors
            .read()
            .get(kind)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let (total_ms, jobs) = *self.durations.read();
        let avg_job_ms = (jobs > 0).then(|| total_ms / jobs);
        MetricsSnapshot {
            events: collect(&self.events),
            errors: collect(&self.errors),
            avg_job_ms,
        }
    }

    pub fn report(&self) {
        let snapshot = self.snapshot();
        for (event, count) in &snapshot.events {
            info!("Job event '{}': {}", event, count);
        }
        for (kind, count) in &snapshot.errors {
            info!("Job error '{}': {}", kind, count);
        }
        if let Some(avg) = snapshot.avg_job_ms {
            info!("Average job duration: {} ms", avg);
        }
    }
}
