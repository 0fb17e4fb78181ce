//! Account storage trait.

use crate::StoreError;
use ripple_types::Username;
use serde::{Deserialize, Serialize};

/// Per-account state held by the account's home server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub username: Username,
    /// Highest counter accepted from the account owner for account-scoped
    /// commands (payments).
    pub counter: u32,
}

impl AccountRecord {
    pub fn new(username: Username) -> Self {
        Self {
            username,
            counter: 0,
        }
    }
}

/// Trait for account storage operations.
pub trait AccountStore {
    fn get_account(&self, username: &Username) -> Result<AccountRecord, StoreError>;
    fn put_account(&self, record: &AccountRecord) -> Result<(), StoreError>;
    fn account_exists(&self, username: &Username) -> Result<bool, StoreError>;
    fn iter_accounts(&self) -> Result<Vec<AccountRecord>, StoreError>;
}
