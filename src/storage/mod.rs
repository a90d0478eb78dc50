//! Settings persistence
//!
//! Key-value hook used to restore the test configuration and application
//! settings across sessions.

pub mod persistence;

pub use persistence::{
    load_typed, save_typed, InMemoryStore, KeyValueStore, PersistenceError, SledStore,
};
