//! Abstract storage traits for the ripple trust network.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.
//!
//! Records are read and written whole: a handler loads a record, applies its
//! changes (including the replay counter) and writes it back in one call, so
//! the counter advance and the ledger effect are persisted together.

pub mod account;
pub mod error;
pub mod keys;
pub mod relation;

pub use account::{AccountRecord, AccountStore};
pub use error::StoreError;
pub use keys::{KeyScope, KeyStore};
pub use relation::{PeerRelation, RelationStore};

/// Everything a node needs from its ledger storage.
pub trait LedgerStore: AccountStore + RelationStore + Send + Sync {}

impl<T: AccountStore + RelationStore + Send + Sync> LedgerStore for T {}
