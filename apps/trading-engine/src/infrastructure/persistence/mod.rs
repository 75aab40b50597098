//! Persistence Adapters
//!
//! Implementations of the state store port.

pub mod file_store;
pub mod in_memory;

pub use file_store::FileStateStore;
pub use in_memory::InMemoryStateStore;
