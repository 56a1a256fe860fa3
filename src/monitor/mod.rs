//! Usage monitor
//!
//! Observes registry events, keeps per-key usage records, and periodically
//! materializes an immutable dependency-graph snapshot with cycle detection.
//! Counter updates happen synchronously with the observed operation; only the
//! graph rebuild is debounced onto a background task.

pub mod graph;
pub mod stats;

use crate::config::{MonitorConfig, MAX_DEBOUNCE_MS, MAX_FREQUENCY_THRESHOLD, MIN_DEBOUNCE_MS, MIN_FREQUENCY_THRESHOLD};
use crate::core::error::{Error, Result};
use crate::core::types::TypeKey;
use crate::events::{RegistryEvent, RegistryObserver};
use graph::{DependencyGraph, GraphSnapshot};
use stats::{UsageRecord, UsageStats};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

struct MonitorState {
    records: HashMap<TypeKey, UsageRecord>,
    edges: HashSet<(TypeKey, TypeKey)>,
    /// Keys flagged by the tracker on re-entry; visible in `cycle_keys`
    /// immediately, without waiting for a rebuild.
    flagged: HashSet<TypeKey>,
    graph: Arc<DependencyGraph>,
    graph_cycles: HashSet<TypeKey>,
    history: VecDeque<GraphSnapshot>,
}

impl MonitorState {
    fn empty() -> Self {
        Self {
            records: HashMap::new(),
            edges: HashSet::new(),
            flagged: HashSet::new(),
            graph: Arc::new(DependencyGraph::default()),
            graph_cycles: HashSet::new(),
            history: VecDeque::new(),
        }
    }
}

/// Auto-optimization monitor: usage statistics, debounced graph rebuilds,
/// and circular-dependency reporting.
pub struct UsageMonitor {
    state: Mutex<MonitorState>,
    wakeup: Arc<Notify>,
    debounce_ms: AtomicU64,
    frequency_threshold: AtomicU64,
    enabled: AtomicBool,
    latency_capacity: usize,
    history_depth: usize,
    rebuild_task: Mutex<Option<JoinHandle<()>>>,
}

impl UsageMonitor {
    /// Create a monitor and spawn its debounced rebuild task.
    ///
    /// Must be called from within a tokio runtime; returns
    /// [`Error::Runtime`] otherwise.
    pub fn spawn(config: MonitorConfig) -> Result<Arc<Self>> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::runtime("usage monitor requires a running tokio runtime"))?;
        let config = config.clamped();

        let monitor = Arc::new(Self {
            state: Mutex::new(MonitorState::empty()),
            wakeup: Arc::new(Notify::new()),
            debounce_ms: AtomicU64::new(config.debounce_ms),
            frequency_threshold: AtomicU64::new(config.frequency_threshold),
            enabled: AtomicBool::new(config.enabled),
            latency_capacity: config.latency_capacity,
            history_depth: config.history_depth,
            rebuild_task: Mutex::new(None),
        });

        let task = handle.spawn(Self::rebuild_loop(
            Arc::downgrade(&monitor),
            Arc::clone(&monitor.wakeup),
        ));
        *monitor
            .rebuild_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(task);
        tracing::debug!(
            debounce_ms = config.debounce_ms,
            frequency_threshold = config.frequency_threshold,
            "usage monitor started"
        );
        Ok(monitor)
    }

    /// Weak observer handle for [`TypeRegistry::attach_observer`].
    ///
    /// [`TypeRegistry::attach_observer`]: crate::registry::TypeRegistry::attach_observer
    pub fn observer(this: &Arc<Self>) -> Weak<dyn RegistryObserver> {
        // bind the concrete weak first so the unsizing happens on the
        // binding, not inside the downgrade call
        let weak: Weak<Self> = Arc::downgrade(this);
        weak
    }

    /// Debounced rebuild driver: wake on the first event, then restart the
    /// quiet window on every further event until the window elapses quietly.
    async fn rebuild_loop(monitor: Weak<UsageMonitor>, wakeup: Arc<Notify>) {
        loop {
            wakeup.notified().await;
            loop {
                let debounce = match monitor.upgrade() {
                    Some(live) => Duration::from_millis(live.debounce_ms.load(Ordering::Relaxed)),
                    None => return,
                };
                match tokio::time::timeout(debounce, wakeup.notified()).await {
                    Ok(()) => {}
                    Err(_) => break,
                }
            }
            match monitor.upgrade() {
                Some(live) => live.rebuild(),
                None => return,
            }
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Recompute the graph snapshot and cycle set from the accumulated edges.
    fn rebuild(&self) {
        let mut state = self.lock_state();
        let nodes: HashSet<TypeKey> = state.records.keys().copied().collect();
        let graph = Arc::new(DependencyGraph::build(nodes, state.edges.clone()));
        let cycles = graph.cycle_participants();
        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            cycles = cycles.len(),
            "dependency graph rebuilt"
        );
        state.graph = Arc::clone(&graph);
        state.graph_cycles = cycles;
        state.history.push_back(GraphSnapshot {
            graph,
            captured_at: Instant::now(),
        });
        while state.history.len() > self.history_depth {
            state.history.pop_front();
        }
    }

    /// Exported usage view per key.
    pub fn usage_stats(&self) -> HashMap<TypeKey, UsageStats> {
        let threshold = self.frequency_threshold.load(Ordering::Relaxed);
        let state = self.lock_state();
        state
            .records
            .iter()
            .map(|(key, record)| (*key, record.to_stats(*key, threshold)))
            .collect()
    }

    /// The `n` most-resolved keys with their resolve counts, descending.
    pub fn top_used(&self, n: usize) -> Vec<(TypeKey, u64)> {
        let state = self.lock_state();
        let mut ranked: Vec<(TypeKey, u64)> = state
            .records
            .iter()
            .map(|(key, record)| (*key, record.resolve_count))
            .collect();
        // name tiebreak keeps the order deterministic for equal counts
        ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.name().cmp(b.0.name())));
        ranked.truncate(n);
        ranked
    }

    /// Keys participating in at least one detected cycle: tracker-flagged
    /// keys immediately, plus the SCC-derived set from the latest snapshot.
    pub fn cycle_keys(&self) -> HashSet<TypeKey> {
        let state = self.lock_state();
        state
            .flagged
            .union(&state.graph_cycles)
            .copied()
            .collect()
    }

    /// Latest dependency-graph snapshot.
    pub fn graph_snapshot(&self) -> Arc<DependencyGraph> {
        Arc::clone(&self.lock_state().graph)
    }

    /// Retained snapshots, oldest first.
    pub fn snapshot_history(&self) -> Vec<GraphSnapshot> {
        self.lock_state().history.iter().cloned().collect()
    }

    /// Drop all records, edges, flags, and snapshots. Idempotent.
    pub fn reset(&self) {
        *self.lock_state() = MonitorState::empty();
        tracing::debug!("usage monitor reset");
    }

    /// Update the debounce window; clamped to the documented range.
    pub fn set_debounce(&self, window: Duration) {
        let millis =
            u64::try_from(window.as_millis()).unwrap_or(MAX_DEBOUNCE_MS);
        self.debounce_ms
            .store(millis.clamp(MIN_DEBOUNCE_MS, MAX_DEBOUNCE_MS), Ordering::Relaxed);
    }

    /// Current debounce window.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms.load(Ordering::Relaxed))
    }

    /// Update the frequently-used threshold; clamped to the documented range.
    pub fn set_frequency_threshold(&self, threshold: u64) {
        self.frequency_threshold.store(
            threshold.clamp(MIN_FREQUENCY_THRESHOLD, MAX_FREQUENCY_THRESHOLD),
            Ordering::Relaxed,
        );
    }

    /// Current frequently-used threshold.
    pub fn frequency_threshold(&self) -> u64 {
        self.frequency_threshold.load(Ordering::Relaxed)
    }

    /// Enable or disable event recording. Disabled monitors drop events
    /// without touching any record.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

impl RegistryObserver for UsageMonitor {
    fn observe(&self, event: &RegistryEvent) {
        if !self.enabled.load(Ordering::Relaxed) {
            return;
        }
        let mut schedule_rebuild = true;
        {
            let mut state = self.lock_state();
            match event {
                RegistryEvent::Registered { key, .. } => {
                    let record = state.records.entry(*key).or_insert_with(UsageRecord::new);
                    record.register_count += 1;
                    record.touch();
                }
                RegistryEvent::Resolved { key, hit, latency } => {
                    let capacity = self.latency_capacity;
                    let record = state.records.entry(*key).or_insert_with(UsageRecord::new);
                    record.resolve_count += 1;
                    if *hit {
                        record.push_latency(*latency, capacity);
                    } else {
                        record.miss_count += 1;
                    }
                    record.touch();
                }
                RegistryEvent::DependencyObserved { from, to } => {
                    state.edges.insert((*from, *to));
                }
                RegistryEvent::CycleDetected { participants, .. } => {
                    for participant in participants {
                        state
                            .records
                            .entry(*participant)
                            .or_insert_with(UsageRecord::new)
                            .cycle_flagged = true;
                        state.flagged.insert(*participant);
                    }
                }
                RegistryEvent::Released { key } => {
                    if let Some(record) = state.records.get_mut(key) {
                        record.touch();
                    }
                    schedule_rebuild = false;
                }
                RegistryEvent::Cleared => {
                    // the registry was rebuilt independently; usage history
                    // survives until an explicit reset
                    schedule_rebuild = false;
                }
            }
        }
        if schedule_rebuild {
            self.wakeup.notify_one();
        }
    }
}

impl Drop for UsageMonitor {
    fn drop(&mut self) {
        if let Some(task) = self
            .rebuild_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}
