//! Registry events for decoupled observation
//!
//! The registry publishes one event per operation to attached observers. The
//! link is weak and one-way: observers never control entry lifetime, and a
//! dropped observer is skipped on the next emit.

use crate::core::types::TypeKey;
use std::fmt;
use std::time::Duration;

/// Events emitted by the type registry
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    /// A factory was registered.
    Registered {
        key: TypeKey,
        /// Whether an existing entry was replaced (last-write-wins).
        replaced: bool,
    },
    /// A resolve call completed.
    Resolved {
        key: TypeKey,
        /// `false` for a miss, a detected cycle, or a mismatched slot.
        hit: bool,
        /// Factory execution time; zero when no factory ran.
        latency: Duration,
    },
    /// An entry was removed.
    Released { key: TypeKey },
    /// Resolving `from` triggered a nested resolve of `to`.
    DependencyObserved { from: TypeKey, to: TypeKey },
    /// A resolution chain re-entered `key`; `participants` is the stack
    /// segment forming the loop.
    CycleDetected {
        key: TypeKey,
        participants: Vec<TypeKey>,
    },
    /// All entries were dropped.
    Cleared,
}

impl fmt::Display for RegistryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryEvent::Registered { key, replaced } => {
                write!(f, "registered {{ key: {key}, replaced: {replaced} }}")
            }
            RegistryEvent::Resolved { key, hit, latency } => {
                write!(f, "resolved {{ key: {key}, hit: {hit}, latency: {latency:?} }}")
            }
            RegistryEvent::Released { key } => write!(f, "released {{ key: {key} }}"),
            RegistryEvent::DependencyObserved { from, to } => {
                write!(f, "dependency {{ from: {from}, to: {to} }}")
            }
            RegistryEvent::CycleDetected { key, participants } => {
                write!(f, "cycle {{ key: {key}, participants: {} }}", participants.len())
            }
            RegistryEvent::Cleared => write!(f, "cleared"),
        }
    }
}

/// Observer of registry activity.
///
/// Called synchronously from the emitting operation; implementations must be
/// cheap and must not call back into the registry.
pub trait RegistryObserver: Send + Sync {
    /// Receive one event.
    fn observe(&self, event: &RegistryEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_registered() {
        let event = RegistryEvent::Registered {
            key: TypeKey::of::<u32>(),
            replaced: false,
        };
        let rendered = event.to_string();
        assert!(rendered.contains("registered"));
        assert!(rendered.contains("u32"));
        assert!(rendered.contains("false"));
    }

    #[test]
    fn display_cycle_counts_participants() {
        let event = RegistryEvent::CycleDetected {
            key: TypeKey::of::<u8>(),
            participants: vec![TypeKey::of::<u8>(), TypeKey::of::<u16>()],
        };
        assert!(event.to_string().contains("participants: 2"));
    }
}
