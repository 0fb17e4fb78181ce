//! Nullable store: thread-safe in-memory ledger and key storage.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use ripple_store::{
    AccountRecord, AccountStore, KeyScope, KeyStore, PeerRelation, RelationStore, StoreError,
};
use ripple_types::{RelationKey, SecretKey, Username};

/// An in-memory account, relation and key store for testing.
/// Thread-safe for use with tokio's multi-threaded runtime.
#[derive(Default)]
pub struct NullStore {
    accounts: Mutex<HashMap<Username, AccountRecord>>,
    relations: Mutex<BTreeMap<String, PeerRelation>>,
    keys: Mutex<HashMap<KeyScope, SecretKey>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn relation_slot(key: &RelationKey) -> String {
    format!("{}\0{}\0{}", key.account, key.peer.username, key.peer.server)
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision a shared secret.
    pub fn insert_key(&self, scope: KeyScope, key: SecretKey) {
        lock(&self.keys).insert(scope, key);
    }

    /// Create an account with a zero counter.
    pub fn insert_account(&self, username: Username) {
        lock(&self.accounts).insert(username.clone(), AccountRecord::new(username));
    }

    pub fn relation_count(&self) -> usize {
        lock(&self.relations).len()
    }
}

impl AccountStore for NullStore {
    fn get_account(&self, username: &Username) -> Result<AccountRecord, StoreError> {
        lock(&self.accounts)
            .get(username)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(username.to_string()))
    }

    fn put_account(&self, record: &AccountRecord) -> Result<(), StoreError> {
        lock(&self.accounts).insert(record.username.clone(), record.clone());
        Ok(())
    }

    fn account_exists(&self, username: &Username) -> Result<bool, StoreError> {
        Ok(lock(&self.accounts).contains_key(username))
    }

    fn iter_accounts(&self) -> Result<Vec<AccountRecord>, StoreError> {
        let mut all: Vec<_> = lock(&self.accounts).values().cloned().collect();
        all.sort_by(|a, b| a.username.as_str().cmp(b.username.as_str()));
        Ok(all)
    }
}

impl RelationStore for NullStore {
    fn get_relation(&self, key: &RelationKey) -> Result<PeerRelation, StoreError> {
        lock(&self.relations)
            .get(&relation_slot(key))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn put_relation(&self, relation: &PeerRelation) -> Result<(), StoreError> {
        lock(&self.relations).insert(relation_slot(&relation.key()), relation.clone());
        Ok(())
    }

    fn relation_exists(&self, key: &RelationKey) -> Result<bool, StoreError> {
        Ok(lock(&self.relations).contains_key(&relation_slot(key)))
    }

    fn relations_of(&self, account: &Username) -> Result<Vec<PeerRelation>, StoreError> {
        Ok(lock(&self.relations)
            .values()
            .filter(|r| &r.account == account)
            .cloned()
            .collect())
    }
}

impl KeyStore for NullStore {
    fn load_key(&self, scope: &KeyScope) -> Result<SecretKey, StoreError> {
        lock(&self.keys)
            .get(scope)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(scope.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_types::{PeerAccount, ServerAddress};

    fn user(name: &str) -> Username {
        Username::new(name).unwrap()
    }

    fn peer(name: &str, server: &str) -> PeerAccount {
        PeerAccount::new(user(name), ServerAddress::new(server).unwrap())
    }

    #[test]
    fn relations_are_scoped_to_account() {
        let store = NullStore::new();
        store
            .put_relation(&PeerRelation::new(user("alice"), peer("bob", "b.example")))
            .unwrap();
        store
            .put_relation(&PeerRelation::new(user("alice"), peer("carol", "c.example")))
            .unwrap();
        store
            .put_relation(&PeerRelation::new(user("dave"), peer("bob", "b.example")))
            .unwrap();

        assert_eq!(store.relations_of(&user("alice")).unwrap().len(), 2);
        assert_eq!(store.relations_of(&user("dave")).unwrap().len(), 1);
        assert_eq!(store.relation_count(), 3);
    }

    #[test]
    fn missing_key_is_not_found() {
        let store = NullStore::new();
        let err = store.load_key(&KeyScope::Client(user("alice"))).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn inserted_key_round_trips() {
        let store = NullStore::new();
        let scope = KeyScope::Client(user("alice"));
        store.insert_key(scope.clone(), SecretKey::new(b"secret".to_vec()));
        assert_eq!(store.load_key(&scope).unwrap().as_bytes(), b"secret");
    }
}
