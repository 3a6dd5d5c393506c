//! Append-only event store boundary.
//!
//! Stores and loads per-ledger event streams without the domain knowing where
//! they live.

pub mod file;
pub mod in_memory;
pub mod r#trait;

pub use file::{FileEventStore, FileStoreConfig};
pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
