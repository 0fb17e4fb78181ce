//! Epoch-based trustline synchronization.
//!
//! Each side owns its `trustline_out`. Every local change bumps
//! `sync_counter` (the epoch). The peer stores the value as its
//! `trustline_in` together with the epoch in `sync_in` and acknowledges the
//! epoch, which lands in our `sync_out`. Values are only ever replaced by
//! strictly newer epochs, so reordered or duplicated messages converge.

use ripple_store::PeerRelation;
use ripple_types::Timestamp;

/// A trustline value tagged with its epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrustlineValue {
    pub amount: u32,
    pub epoch: u32,
}

/// Where the local `trustline_out` stands with respect to the peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    /// The peer has acknowledged the current epoch.
    Synced,
    /// The current epoch has been pushed and awaits acknowledgment.
    Pending,
    /// The current epoch has not been pushed yet.
    Unsynced,
}

/// What to tell the peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncAction {
    /// Already in agreement; only refresh the peer's liveness timestamp.
    Timestamp,
    /// Send the current trustline and epoch.
    Push(TrustlineValue),
}

pub fn sync_state(relation: &PeerRelation) -> SyncState {
    if relation.sync_out >= relation.sync_counter {
        SyncState::Synced
    } else if relation.sync_sent >= relation.sync_counter {
        SyncState::Pending
    } else {
        SyncState::Unsynced
    }
}

/// Client `SetTrustline`: replace `trustline_out` and open a new epoch.
///
/// Returns the new epoch.
pub fn set_trustline_out(relation: &mut PeerRelation, amount: u32) -> u32 {
    relation.trustline_out = amount;
    relation.sync_counter = relation.sync_counter.saturating_add(1);
    relation.sync_counter
}

fn push(relation: &mut PeerRelation) -> SyncAction {
    relation.sync_sent = relation.sync_counter;
    SyncAction::Push(TrustlineValue {
        amount: relation.trustline_out,
        epoch: relation.sync_counter,
    })
}

/// Client `SyncTrustlineOut`: decide what to push to the peer.
pub fn plan_push(relation: &mut PeerRelation) -> SyncAction {
    match sync_state(relation) {
        SyncState::Synced => SyncAction::Timestamp,
        SyncState::Pending | SyncState::Unsynced => push(relation),
    }
}

/// Peer `GetTrustline`: answer a peer that holds epoch `peer_sync_in` of
/// our trustline.
///
/// A peer that already holds the current epoch proves it received it, so
/// the local side is marked synced even if the acknowledgment was lost.
pub fn answer_pull(relation: &mut PeerRelation, peer_sync_in: u32) -> SyncAction {
    if peer_sync_in < relation.sync_counter {
        return push(relation);
    }
    if relation.sync_out < relation.sync_counter {
        tracing::debug!(
            relation = %relation.key(),
            epoch = relation.sync_counter,
            "peer already holds current epoch, marking synced"
        );
        relation.sync_out = relation.sync_counter;
    }
    SyncAction::Timestamp
}

/// Peer `SetTrustline`: adopt the peer's trustline if its epoch is newer.
///
/// Returns `true` when the value was adopted and must be acknowledged. The
/// liveness timestamp is refreshed either way.
pub fn apply_push(relation: &mut PeerRelation, value: TrustlineValue, now: Timestamp) -> bool {
    relation.timestamp = now;
    if value.epoch <= relation.sync_in {
        tracing::debug!(
            relation = %relation.key(),
            epoch = value.epoch,
            sync_in = relation.sync_in,
            "ignoring stale trustline"
        );
        return false;
    }
    relation.trustline_in = value.amount;
    relation.sync_in = value.epoch;
    true
}

/// Peer `SetSyncOut`: record the peer's acknowledgment of `epoch`.
///
/// Acknowledgments for epochs we never issued are ignored.
pub fn acknowledge(relation: &mut PeerRelation, epoch: u32) -> bool {
    if epoch <= relation.sync_out || epoch > relation.sync_counter {
        tracing::debug!(
            relation = %relation.key(),
            epoch,
            sync_out = relation.sync_out,
            sync_counter = relation.sync_counter,
            "ignoring acknowledgment"
        );
        return false;
    }
    relation.sync_out = epoch;
    true
}

/// Peer `SetTimestamp`: the peer is alive.
pub fn touch(relation: &mut PeerRelation, now: Timestamp) {
    relation.timestamp = now;
}
