//! LMDB implementation of AccountStore.

use ripple_store::{AccountRecord, AccountStore, StoreError};
use ripple_types::Username;

use crate::{LmdbError, LmdbStore};

impl AccountStore for LmdbStore {
    fn get_account(&self, username: &Username) -> Result<AccountRecord, StoreError> {
        self.get_record(self.accounts_db, username.as_str().as_bytes())?
            .ok_or_else(|| StoreError::NotFound(format!("account {username}")))
    }

    fn put_account(&self, record: &AccountRecord) -> Result<(), StoreError> {
        self.put_record(self.accounts_db, record.username.as_str().as_bytes(), record)?;
        Ok(())
    }

    fn account_exists(&self, username: &Username) -> Result<bool, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let found = self
            .accounts_db
            .get(&rtxn, username.as_str().as_bytes())
            .map_err(LmdbError::from)?;
        Ok(found.is_some())
    }

    fn iter_accounts(&self) -> Result<Vec<AccountRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.accounts_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut result = Vec::new();
        for entry in iter {
            let (_, val) = entry.map_err(LmdbError::from)?;
            result.push(bincode::deserialize(val).map_err(LmdbError::from)?);
        }
        Ok(result)
    }
}
