//! Shared types for the registry runtime

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity-based key for a registered abstraction.
///
/// Two keys are equal iff they denote the same Rust type; the captured type
/// name is carried for diagnostics only and never participates in equality or
/// hashing.
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key for the type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Human-readable type name, for logs and exported stats.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Type-erased factory stored in the registry.
///
/// The produced value travels as `Box<dyn Any + Send>`; the resolve path
/// downcasts it back behind the same key it was registered under.
pub type ErasedFactory = Arc<dyn Fn() -> Box<dyn Any + Send> + Send + Sync>;

/// Erase a typed factory into the registry's storage representation.
pub(crate) fn erase_factory<T, F>(factory: F) -> ErasedFactory
where
    T: Send + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    Arc::new(move || Box::new(factory()) as Box<dyn Any + Send>)
}
