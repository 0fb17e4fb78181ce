//! LMDB implementation of KeyStore.

use ripple_store::{KeyScope, KeyStore, StoreError};
use ripple_types::SecretKey;

use crate::relation::relation_key_bytes;
use crate::{LmdbError, LmdbStore};

fn scope_key(scope: &KeyScope) -> Vec<u8> {
    match scope {
        KeyScope::Client(account) => {
            let mut key = b"c:".to_vec();
            key.extend_from_slice(account.as_str().as_bytes());
            key
        }
        KeyScope::Relation(relation) => {
            let mut key = b"r:".to_vec();
            key.extend_from_slice(&relation_key_bytes(relation));
            key
        }
    }
}

impl LmdbStore {
    /// Provision a shared secret.
    pub fn put_key(&self, scope: &KeyScope, key: &SecretKey) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.keys_db
            .put(&mut wtxn, &scope_key(scope), key.as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

impl KeyStore for LmdbStore {
    fn load_key(&self, scope: &KeyScope) -> Result<SecretKey, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let bytes = self
            .keys_db
            .get(&rtxn, &scope_key(scope))
            .map_err(LmdbError::from)?;
        bytes
            .map(|b| SecretKey::new(b.to_vec()))
            .ok_or_else(|| StoreError::NotFound(scope.to_string()))
    }
}
