//! typewire - an in-process dependency registration and resolution runtime
//!
//! Callers register factories keyed by type identity and resolve fresh
//! instances by that identity. A [`RegistrationBatch`] commits many
//! registrations in one concurrent pass, and a [`UsageMonitor`] observes
//! registry activity to maintain usage statistics, a debounced dependency
//! graph, and a circular-dependency report.
//!
//! There is no hidden global instance: construct a [`TypeRegistry`] and pass
//! it where it is needed. Single-instance-per-process is the caller's choice.
//!
//! ```
//! use typewire::{MonitorConfig, TypeRegistry, UsageMonitor};
//!
//! #[derive(Debug)]
//! struct Greeter {
//!     prefix: &'static str,
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let registry = TypeRegistry::new();
//! let monitor = UsageMonitor::spawn(MonitorConfig::default()).unwrap();
//! registry.attach_observer(UsageMonitor::observer(&monitor));
//!
//! let handle = registry.register(|| Greeter { prefix: "hello" });
//! let greeter = registry.resolve::<Greeter>().unwrap();
//! assert_eq!(greeter.prefix, "hello");
//!
//! handle.release();
//! assert!(registry.resolve::<Greeter>().is_none());
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod core;
pub mod events;
pub mod monitor;
pub mod registry;
mod tracker;

pub use crate::core::error::{Error, ResolveError, Result};
pub use crate::core::types::TypeKey;
pub use batch::{CommitOutcome, Registration, RegistrationBatch};
pub use config::MonitorConfig;
pub use events::{RegistryEvent, RegistryObserver};
pub use monitor::graph::{DependencyGraph, GraphSnapshot, GraphSummary};
pub use monitor::stats::UsageStats;
pub use monitor::UsageMonitor;
pub use registry::{ReleaseHandle, TypeRegistry};
