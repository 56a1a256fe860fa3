//! Type-safe concurrent registry
//!
//! Maps a type identity to a type-erased factory. Registration is
//! last-write-wins; resolution invokes the factory on every call (no caching)
//! and hands the produced value back after a checked downcast. Every
//! operation is published to attached observers.

use crate::core::error::ResolveError;
use crate::core::types::{erase_factory, ErasedFactory, TypeKey};
use crate::events::{RegistryEvent, RegistryObserver};
use crate::tracker::{self, EnterOutcome};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::{Duration, Instant};

struct RegistryEntry {
    factory: ErasedFactory,
    /// Assigned at insert; release handles carry it so a superseded handle
    /// cannot remove a newer registration.
    generation: u64,
}

struct RegistryInner {
    entries: DashMap<TypeKey, RegistryEntry>,
    next_generation: AtomicU64,
    observers: RwLock<Vec<Weak<dyn RegistryObserver>>>,
}

impl RegistryInner {
    fn emit(&self, event: &RegistryEvent) {
        let observers = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        for observer in observers.iter() {
            if let Some(observer) = observer.upgrade() {
                observer.observe(event);
            }
        }
    }
}

/// Thread-safe factory registry keyed by type identity
#[derive(Clone)]
pub struct TypeRegistry {
    inner: Arc<RegistryInner>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                entries: DashMap::new(),
                next_generation: AtomicU64::new(0),
                observers: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Attach an observer. The link is weak: a dropped observer is skipped,
    /// and the registry never keeps it alive.
    pub fn attach_observer(&self, observer: Weak<dyn RegistryObserver>) {
        self.inner
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Register a factory for `T`, replacing any existing entry.
    ///
    /// The returned handle removes exactly this registration; once a newer
    /// registration replaces it, the handle becomes a no-op.
    pub fn register<T, F>(&self, factory: F) -> ReleaseHandle
    where
        T: Send + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.register_erased(TypeKey::of::<T>(), erase_factory(factory))
            .0
    }

    /// Erased registration path shared with batch commit.
    ///
    /// Returns the release handle and whether an existing entry was replaced.
    pub(crate) fn register_erased(
        &self,
        key: TypeKey,
        factory: ErasedFactory,
    ) -> (ReleaseHandle, bool) {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let replaced = self
            .inner
            .entries
            .insert(key, RegistryEntry { factory, generation })
            .is_some();
        tracing::debug!(key = %key, replaced, "registered factory");
        self.inner.emit(&RegistryEvent::Registered { key, replaced });
        (
            ReleaseHandle {
                key,
                generation,
                inner: Arc::downgrade(&self.inner),
            },
            replaced,
        )
    }

    /// Resolve a fresh instance of `T`, or `None` on a miss, a detected
    /// cycle, or a mismatched slot. See [`try_resolve`](Self::try_resolve)
    /// for the distinguished outcome.
    pub fn resolve<T: Send + 'static>(&self) -> Option<T> {
        self.try_resolve().ok()
    }

    /// Resolve a fresh instance of `T` with the failure cause encoded in the
    /// return value.
    ///
    /// The factory runs on the caller's thread with no registry lock held, so
    /// it may itself resolve other keys; re-entering a key already in flight
    /// on this chain is reported as [`ResolveError::CircularDependency`]
    /// instead of recursing. A panicking factory propagates to the caller
    /// with the chain stack restored.
    pub fn try_resolve<T: Send + 'static>(&self) -> Result<T, ResolveError> {
        let key = TypeKey::of::<T>();

        // Clone the factory out so no shard guard is held while it runs.
        let factory = match self.inner.entries.get(&key) {
            Some(entry) => Arc::clone(&entry.factory),
            None => {
                tracing::trace!(key = %key, "resolve miss");
                self.inner.emit(&RegistryEvent::Resolved {
                    key,
                    hit: false,
                    latency: Duration::ZERO,
                });
                return Err(ResolveError::NotRegistered {
                    type_name: key.name(),
                });
            }
        };

        let (frame, parent) = match tracker::enter(key) {
            EnterOutcome::Entered { frame, parent } => (frame, parent),
            EnterOutcome::Cycle {
                parent,
                participants,
            } => {
                tracing::warn!(key = %key, chain_top = %parent, "circular dependency detected");
                // The re-entry attempt is an observed dependency edge too.
                self.inner.emit(&RegistryEvent::DependencyObserved {
                    from: parent,
                    to: key,
                });
                self.inner
                    .emit(&RegistryEvent::CycleDetected { key, participants });
                self.inner.emit(&RegistryEvent::Resolved {
                    key,
                    hit: false,
                    latency: Duration::ZERO,
                });
                return Err(ResolveError::CircularDependency {
                    type_name: key.name(),
                });
            }
        };
        if let Some(parent) = parent {
            self.inner
                .emit(&RegistryEvent::DependencyObserved { from: parent, to: key });
        }

        let started = Instant::now();
        let produced = (factory)();
        let latency = started.elapsed();
        drop(frame);

        match produced.downcast::<T>() {
            Ok(value) => {
                self.inner.emit(&RegistryEvent::Resolved {
                    key,
                    hit: true,
                    latency,
                });
                Ok(*value)
            }
            Err(_) => {
                tracing::warn!(key = %key, "registered factory produced a mismatched value");
                self.inner.emit(&RegistryEvent::Resolved {
                    key,
                    hit: false,
                    latency,
                });
                Err(ResolveError::TypeMismatch {
                    type_name: key.name(),
                })
            }
        }
    }

    /// Remove the entry for `T` if present; no-op otherwise.
    pub fn release<T: 'static>(&self) {
        let key = TypeKey::of::<T>();
        if self.inner.entries.remove(&key).is_some() {
            tracing::debug!(key = %key, "released entry");
            self.inner.emit(&RegistryEvent::Released { key });
        }
    }

    /// Whether an entry exists for `T`.
    pub fn contains<T: 'static>(&self) -> bool {
        self.inner.entries.contains_key(&TypeKey::of::<T>())
    }

    /// Number of registered entries.
    pub fn count(&self) -> usize {
        self.inner.entries.len()
    }

    /// Keys of all registered entries.
    pub fn keys(&self) -> Vec<TypeKey> {
        self.inner.entries.iter().map(|entry| *entry.key()).collect()
    }

    /// Drop every entry. Observers are told once; usage history kept by a
    /// monitor is unaffected.
    pub fn clear(&self) {
        self.inner.entries.clear();
        tracing::debug!("cleared registry");
        self.inner.emit(&RegistryEvent::Cleared);
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle that removes exactly one registration.
///
/// Idempotent: invoking it twice, or after a newer registration replaced the
/// entry, is a no-op. Dropping the handle does nothing.
pub struct ReleaseHandle {
    key: TypeKey,
    generation: u64,
    inner: Weak<RegistryInner>,
}

impl ReleaseHandle {
    /// Remove the registration this handle was issued for, if it is still
    /// the current one.
    pub fn release(&self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let removed = inner
            .entries
            .remove_if(&self.key, |_, entry| entry.generation == self.generation)
            .is_some();
        if removed {
            tracing::debug!(key = %self.key, "released entry via handle");
            inner.emit(&RegistryEvent::Released { key: self.key });
        }
    }

    /// Key this handle controls.
    pub fn key(&self) -> TypeKey {
        self.key
    }
}
