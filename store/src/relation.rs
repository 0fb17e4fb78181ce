//! Peer relation storage trait.

use crate::StoreError;
use ripple_types::{PeerAccount, RelationKey, Timestamp, Username};
use serde::{Deserialize, Serialize};

/// Everything a local account knows about one peer.
///
/// Trustlines are denominated in the same unit on both sides. `sync_*`
/// fields implement epoch-based eventual consistency of `trustline_out`
/// with the peer's copy of it (their `trustline_in`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRelation {
    pub account: Username,
    pub peer: PeerAccount,

    /// Credit this account extends to the peer.
    pub trustline_out: u32,
    /// Credit the peer extends to this account, as last synced.
    pub trustline_in: u32,
    /// Part of `trustline_out` already consumed by the peer.
    pub creditline_out: u32,
    /// Part of `trustline_in` already consumed by this account.
    pub creditline_in: u32,

    /// Highest counter accepted from the account owner for this relation.
    pub counter_out: u32,
    /// Highest counter accepted from the peer's server.
    pub counter_in: u32,
    /// Last counter stamped on a datagram sent to the peer.
    pub send_counter: u32,

    /// Epoch of the current `trustline_out`; bumped on every local change.
    pub sync_counter: u32,
    /// Highest epoch the peer has acknowledged.
    pub sync_out: u32,
    /// Epoch of the current `trustline_in`.
    pub sync_in: u32,
    /// Epoch last pushed to the peer.
    pub sync_sent: u32,

    /// When the peer was last heard from.
    pub timestamp: Timestamp,
}

impl PeerRelation {
    pub fn new(account: Username, peer: PeerAccount) -> Self {
        Self {
            account,
            peer,
            trustline_out: 0,
            trustline_in: 0,
            creditline_out: 0,
            creditline_in: 0,
            counter_out: 0,
            counter_in: 0,
            send_counter: 0,
            sync_counter: 0,
            sync_out: 0,
            sync_in: 0,
            sync_sent: 0,
            timestamp: Timestamp::EPOCH,
        }
    }

    pub fn key(&self) -> RelationKey {
        RelationKey::new(self.account.clone(), self.peer.clone())
    }
}

/// Trait for peer relation storage operations.
pub trait RelationStore {
    fn get_relation(&self, key: &RelationKey) -> Result<PeerRelation, StoreError>;
    fn put_relation(&self, relation: &PeerRelation) -> Result<(), StoreError>;
    fn relation_exists(&self, key: &RelationKey) -> Result<bool, StoreError>;
    /// All relations held by `account`, in a stable order.
    fn relations_of(&self, account: &Username) -> Result<Vec<PeerRelation>, StoreError>;
}
