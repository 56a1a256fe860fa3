//! Batch registration container
//!
//! Buffers registration units and commits them to a [`TypeRegistry`] in one
//! concurrent pass. `add` has no registration side effect; `commit` drains an
//! atomic snapshot of the pending list, so units added during a commit land
//! in the next one.

use crate::core::error::{Error, Result};
use crate::core::types::{erase_factory, ErasedFactory, TypeKey};
use crate::registry::TypeRegistry;
use std::sync::{Mutex, PoisonError};

struct PendingUnit {
    key: TypeKey,
    factory: ErasedFactory,
}

/// How a committed unit landed in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The key had no prior entry.
    New,
    /// An existing entry was replaced (last-write-wins).
    Replaced,
}

/// Per-unit commit result.
///
/// Registration of a well-formed unit cannot fail; an `Err` here means the
/// fan-out task itself died, and is isolated to that unit.
#[derive(Debug)]
pub struct CommitOutcome {
    pub key: TypeKey,
    pub result: Result<Registration>,
}

/// Collects pending registrations for a single concurrent commit
#[derive(Default)]
pub struct RegistrationBatch {
    pending: Mutex<Vec<PendingUnit>>,
}

impl RegistrationBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a factory for `T`. Nothing is registered until
    /// [`commit`](Self::commit).
    ///
    /// Two units for the same key within one batch are a documented
    /// last-write-wins race; avoid duplicate keys per commit.
    pub fn add<T, F>(&self, factory: F)
    where
        T: Send + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PendingUnit {
                key: TypeKey::of::<T>(),
                factory: erase_factory(factory),
            });
    }

    /// Number of buffered units.
    pub fn unit_count(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the pending list is empty.
    pub fn is_empty(&self) -> bool {
        self.unit_count() == 0
    }

    /// Register every buffered unit concurrently, waiting for all of them.
    ///
    /// The pending list is drained atomically before the fan-out starts.
    /// Units target distinct keys in the common case, so their relative
    /// landing order is immaterial; outcomes are returned in `add` order.
    pub async fn commit(&self, registry: &TypeRegistry) -> Vec<CommitOutcome> {
        let snapshot: Vec<PendingUnit> = std::mem::take(
            &mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner),
        );
        tracing::debug!(units = snapshot.len(), "committing registration batch");

        let mut keys = Vec::with_capacity(snapshot.len());
        let mut tasks = Vec::with_capacity(snapshot.len());
        for unit in snapshot {
            let registry = registry.clone();
            keys.push(unit.key);
            tasks.push(tokio::spawn(async move {
                registry.register_erased(unit.key, unit.factory).1
            }));
        }

        let results = futures::future::join_all(tasks).await;
        keys.into_iter()
            .zip(results)
            .map(|(key, joined)| CommitOutcome {
                key,
                result: match joined {
                    Ok(true) => Ok(Registration::Replaced),
                    Ok(false) => Ok(Registration::New),
                    Err(err) => Err(Error::internal(format!(
                        "registration task for {key} failed: {err}"
                    ))),
                },
            })
            .collect()
    }
}
