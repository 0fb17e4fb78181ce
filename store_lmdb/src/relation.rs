//! LMDB implementation of RelationStore.
//!
//! Keys are `account \0 peer username \0 peer server`. Names never contain
//! NUL, so every relation of one account shares the `account \0` prefix.

use ripple_store::{PeerRelation, RelationStore, StoreError};
use ripple_types::{RelationKey, Username};

use crate::{LmdbError, LmdbStore};

pub(crate) fn account_prefix(account: &Username) -> Vec<u8> {
    let mut key = Vec::with_capacity(account.as_str().len() + 1);
    key.extend_from_slice(account.as_str().as_bytes());
    key.push(0);
    key
}

pub(crate) fn relation_key_bytes(key: &RelationKey) -> Vec<u8> {
    let mut out = account_prefix(&key.account);
    out.extend_from_slice(key.peer.username.as_str().as_bytes());
    out.push(0);
    out.extend_from_slice(key.peer.server.as_str().as_bytes());
    out
}

impl RelationStore for LmdbStore {
    fn get_relation(&self, key: &RelationKey) -> Result<PeerRelation, StoreError> {
        self.get_record(self.relations_db, &relation_key_bytes(key))?
            .ok_or_else(|| StoreError::NotFound(format!("relation {key}")))
    }

    fn put_relation(&self, relation: &PeerRelation) -> Result<(), StoreError> {
        self.put_record(
            self.relations_db,
            &relation_key_bytes(&relation.key()),
            relation,
        )?;
        Ok(())
    }

    fn relation_exists(&self, key: &RelationKey) -> Result<bool, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let found = self
            .relations_db
            .get(&rtxn, &relation_key_bytes(key))
            .map_err(LmdbError::from)?;
        Ok(found.is_some())
    }

    fn relations_of(&self, account: &Username) -> Result<Vec<PeerRelation>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let prefix = account_prefix(account);
        let iter = self
            .relations_db
            .prefix_iter(&rtxn, &prefix)
            .map_err(LmdbError::from)?;
        let mut result = Vec::new();
        for entry in iter {
            let (_, val) = entry.map_err(LmdbError::from)?;
            result.push(bincode::deserialize(val).map_err(LmdbError::from)?);
        }
        Ok(result)
    }
}
