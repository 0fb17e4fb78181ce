//! Shared-secret lookup.
//!
//! Keys are provisioned out of band. The node only ever reads them, and the
//! lookup is injected separately from the ledger store so secrets can live
//! in a different backend.

use crate::StoreError;
use ripple_types::{RelationKey, SecretKey, Username};
use std::fmt;

/// Which secret to load.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyScope {
    /// Shared between an account owner and its home server.
    Client(Username),
    /// Shared between the two servers of a peer relation.
    Relation(RelationKey),
}

impl fmt::Display for KeyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client(account) => write!(f, "client key of {account}"),
            Self::Relation(key) => write!(f, "relation key of {key}"),
        }
    }
}

pub trait KeyStore: Send + Sync {
    fn load_key(&self, scope: &KeyScope) -> Result<SecretKey, StoreError>;
}
