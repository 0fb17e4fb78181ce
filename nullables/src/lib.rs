//! Nullable infrastructure for deterministic testing.
//!
//! The node talks to storage, keys and the network only through traits.
//! This crate provides in-memory implementations that never touch the
//! filesystem or the network and expose what the node did for assertions.

pub mod socket;
pub mod store;

pub use socket::NullSocket;
pub use store::NullStore;
