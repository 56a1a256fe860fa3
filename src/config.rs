//! Monitor configuration
//!
//! All knobs are optional with stated defaults. Out-of-range values are
//! clamped to the documented ranges rather than rejected, so a misconfigured
//! environment degrades to sane behavior instead of failing startup.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Smallest accepted debounce window in milliseconds.
pub const MIN_DEBOUNCE_MS: u64 = 50;
/// Largest accepted debounce window in milliseconds.
pub const MAX_DEBOUNCE_MS: u64 = 500;
/// Smallest accepted frequently-used threshold.
pub const MIN_FREQUENCY_THRESHOLD: u64 = 5;
/// Largest accepted frequently-used threshold.
pub const MAX_FREQUENCY_THRESHOLD: u64 = 100;

/// Configuration for the usage monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Quiet window between graph rebuilds in milliseconds (default: 100, range 50-500)
    pub debounce_ms: u64,
    /// Resolve count at which a key is classified frequently used (default: 10, range 5-100)
    pub frequency_threshold: u64,
    /// Number of retained graph snapshots (default: 10)
    pub history_depth: usize,
    /// Latency samples retained per key (default: 64)
    pub latency_capacity: usize,
    /// Whether the monitor records events at all (default: true)
    pub enabled: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            frequency_threshold: 10,
            history_depth: 10,
            latency_capacity: 64,
            enabled: true,
        }
    }
}

impl MonitorConfig {
    /// Create config from environment variables, falling back to defaults
    /// for unset or unparseable values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            debounce_ms: read_env("TYPEWIRE_MONITOR_DEBOUNCE_MS", defaults.debounce_ms),
            frequency_threshold: read_env(
                "TYPEWIRE_MONITOR_FREQUENCY_THRESHOLD",
                defaults.frequency_threshold,
            ),
            history_depth: read_env("TYPEWIRE_MONITOR_HISTORY_DEPTH", defaults.history_depth),
            latency_capacity: read_env(
                "TYPEWIRE_MONITOR_LATENCY_CAPACITY",
                defaults.latency_capacity,
            ),
            enabled: read_env("TYPEWIRE_MONITOR_ENABLED", defaults.enabled),
        }
        .clamped()
    }

    /// Clamp every field to its documented range.
    pub fn clamped(mut self) -> Self {
        self.debounce_ms = self.debounce_ms.clamp(MIN_DEBOUNCE_MS, MAX_DEBOUNCE_MS);
        self.frequency_threshold = self
            .frequency_threshold
            .clamp(MIN_FREQUENCY_THRESHOLD, MAX_FREQUENCY_THRESHOLD);
        self.history_depth = self.history_depth.max(1);
        self.latency_capacity = self.latency_capacity.max(1);
        self
    }

    /// Debounce window as a `Duration`.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn read_env<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = MonitorConfig::default();
        assert_eq!(config.debounce_ms, 100);
        assert_eq!(config.frequency_threshold, 10);
        assert_eq!(config.history_depth, 10);
        assert_eq!(config.latency_capacity, 64);
        assert!(config.enabled);
    }

    #[test]
    fn clamping_enforces_ranges() {
        let config = MonitorConfig {
            debounce_ms: 5,
            frequency_threshold: 1000,
            history_depth: 0,
            latency_capacity: 0,
            enabled: true,
        }
        .clamped();
        assert_eq!(config.debounce_ms, MIN_DEBOUNCE_MS);
        assert_eq!(config.frequency_threshold, MAX_FREQUENCY_THRESHOLD);
        assert_eq!(config.history_depth, 1);
        assert_eq!(config.latency_capacity, 1);
    }

    #[test]
    fn in_range_values_survive_clamping() {
        let config = MonitorConfig {
            debounce_ms: 250,
            frequency_threshold: 20,
            ..MonitorConfig::default()
        }
        .clamped();
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.frequency_threshold, 20);
    }

    // single test so the env mutations cannot race a parallel reader
    #[test]
    fn from_env_reads_clamps_and_falls_back() {
        let var = "TYPEWIRE_MONITOR_DEBOUNCE_MS";

        // unset: defaults apply
        std::env::remove_var(var);
        let config = MonitorConfig::from_env();
        assert_eq!(config.debounce_ms, MonitorConfig::default().debounce_ms);
        assert!(config.enabled);

        // out-of-range value is clamped, not rejected
        std::env::set_var(var, "5000");
        assert_eq!(MonitorConfig::from_env().debounce_ms, MAX_DEBOUNCE_MS);

        // in-range value is taken as-is
        std::env::set_var(var, "250");
        assert_eq!(MonitorConfig::from_env().debounce_ms, 250);

        // unparseable value falls back to the default
        std::env::set_var(var, "soon");
        assert_eq!(
            MonitorConfig::from_env().debounce_ms,
            MonitorConfig::default().debounce_ms
        );

        std::env::remove_var(var);
    }
}
