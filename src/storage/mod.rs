//! Trigger and alert storage for geoprox.
//!
//! The traits define the contract the evaluation worker relies on; the
//! in-memory module provides the default backend.

pub mod memory;
mod traits;

pub use memory::{InMemoryAlertRegistry, InMemoryStores, InMemoryTriggerStore};
pub use traits::{AlertRegistry, StorageError, TriggerStore};
