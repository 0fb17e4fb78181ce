//! Out-of-band provisioning of accounts, relations and their shared keys.

use anyhow::Context;
use ripple_store::{AccountRecord, AccountStore, KeyScope, PeerRelation, RelationStore};
use ripple_store_lmdb::LmdbStore;
use ripple_types::{PeerAccount, RelationKey, SecretKey, ServerAddress, Username};

fn parse_key(hex_key: &str) -> anyhow::Result<SecretKey> {
    let bytes = hex::decode(hex_key.trim()).context("key must be hex encoded")?;
    anyhow::ensure!(!bytes.is_empty(), "key must not be empty");
    Ok(SecretKey::new(bytes))
}

/// Create `username` if needed and set its client key. An existing
/// account keeps its replay counter.
pub fn add_account(store: &LmdbStore, username: &str, hex_key: &str) -> anyhow::Result<()> {
    let username = Username::new(username)?;
    let key = parse_key(hex_key)?;
    if !store.account_exists(&username)? {
        store.put_account(&AccountRecord::new(username.clone()))?;
    }
    store.put_key(&KeyScope::Client(username.clone()), &key)?;
    tracing::info!(account = %username, "account provisioned");
    Ok(())
}

/// Create the relation between a local account and a peer account and
/// set its shared key. The local account must already exist.
pub fn add_relation(
    store: &LmdbStore,
    account: &str,
    peer_username: &str,
    peer_server: &str,
    hex_key: &str,
) -> anyhow::Result<()> {
    let account = Username::new(account)?;
    let peer = PeerAccount::new(Username::new(peer_username)?, ServerAddress::new(peer_server)?);
    let key = parse_key(hex_key)?;
    anyhow::ensure!(
        store.account_exists(&account)?,
        "unknown account {account}, run `account add` first"
    );

    let relation_key = RelationKey::new(account.clone(), peer.clone());
    if !store.relation_exists(&relation_key)? {
        store.put_relation(&PeerRelation::new(account, peer))?;
    }
    store.put_key(&KeyScope::Relation(relation_key.clone()), &key)?;
    tracing::info!(relation = %relation_key, "relation provisioned");
    Ok(())
}
