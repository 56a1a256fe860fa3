//! Per-key usage bookkeeping

use crate::core::types::TypeKey;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Mutable per-key record kept by the monitor.
///
/// Latency samples live in a fixed-capacity ring so memory stays O(#keys).
#[derive(Debug)]
pub(crate) struct UsageRecord {
    pub resolve_count: u64,
    pub register_count: u64,
    pub miss_count: u64,
    pub latency_samples: VecDeque<Duration>,
    pub last_seen: Instant,
    pub cycle_flagged: bool,
}

impl UsageRecord {
    pub fn new() -> Self {
        Self {
            resolve_count: 0,
            register_count: 0,
            miss_count: 0,
            latency_samples: VecDeque::new(),
            last_seen: Instant::now(),
            cycle_flagged: false,
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Append a sample, evicting the oldest once at capacity.
    pub fn push_latency(&mut self, sample: Duration, capacity: usize) {
        while self.latency_samples.len() >= capacity {
            self.latency_samples.pop_front();
        }
        self.latency_samples.push_back(sample);
    }

    pub fn average_latency_ms(&self) -> f64 {
        if self.latency_samples.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .latency_samples
            .iter()
            .map(|sample| sample.as_secs_f64() * 1000.0)
            .sum();
        total / self.latency_samples.len() as f64
    }

    pub fn to_stats(&self, key: TypeKey, frequency_threshold: u64) -> UsageStats {
        UsageStats {
            type_name: key.name().to_owned(),
            resolve_count: self.resolve_count,
            register_count: self.register_count,
            miss_count: self.miss_count,
            latency_samples: self.latency_samples.len(),
            average_latency_ms: self.average_latency_ms(),
            frequently_used: self.resolve_count >= frequency_threshold,
            cycle_participant: self.cycle_flagged,
        }
    }
}

/// Exported per-key usage view
#[derive(Debug, Clone, Serialize)]
pub struct UsageStats {
    pub type_name: String,
    /// Completed resolve calls (hits and misses) since the last reset.
    pub resolve_count: u64,
    pub register_count: u64,
    pub miss_count: u64,
    /// Samples currently retained in the latency ring.
    pub latency_samples: usize,
    pub average_latency_ms: f64,
    /// Derived classification; informational only, resolution behavior never
    /// changes based on it.
    pub frequently_used: bool,
    pub cycle_participant: bool,
}
