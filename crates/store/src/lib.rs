//! Persistence collaborator: the record-oriented surface of the hosted
//! data backend, plus an in-memory implementation for development and tests.

pub mod backend;
pub mod memory;

pub use backend::{Filter, RecordStore, Table};
pub use memory::MemoryStore;
