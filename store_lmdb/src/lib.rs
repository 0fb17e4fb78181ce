//! LMDB storage backend for the ripple trust network.
//!
//! Implements the storage traits from `ripple-store` using the `heed` LMDB
//! bindings. Accounts, relations and shared secrets each live in their own
//! named database within a single environment; records are bincode-encoded.

pub mod account;
pub mod environment;
pub mod error;
pub mod keys;
pub mod relation;

pub use environment::{LmdbStore, CURRENT_SCHEMA_VERSION};
pub use error::LmdbError;
