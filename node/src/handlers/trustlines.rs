//! Trustline commands and the peer side of the sync protocol.
//!
//! Client commands are gated by the relation's `counter_out`, peer commands
//! by its `counter_in`. The counter advance, the ledger change and any send
//! counter allocation land in a single relation write.

use ripple_ledger::{
    acknowledge, advance_counter, answer_pull, apply_push, plan_push, set_trustline_out, touch,
    SyncAction, TrustlineValue,
};
use ripple_network::DatagramSocket;
use ripple_protocol::{
    ArgumentLayout, Arguments, Datagram, PeerCommand, SyncEpoch, TrustlineAmount,
    TrustlineUpdate,
};
use ripple_store::PeerRelation;
use ripple_types::Timestamp;

use crate::context::Outbound;
use crate::{HandlerError, NodeContext};

/// Turn a sync decision into the datagram that carries it.
fn sync_message<S: DatagramSocket>(
    ctx: &NodeContext<S>,
    relation: &mut PeerRelation,
    action: SyncAction,
) -> Result<Outbound, HandlerError> {
    match action {
        SyncAction::Push(TrustlineValue { amount, epoch }) => ctx.prepare(
            relation,
            PeerCommand::SetTrustline,
            TrustlineUpdate { amount, epoch }.encode(),
        ),
        SyncAction::Timestamp => {
            ctx.prepare(relation, PeerCommand::SetTimestamp, Arguments::zeroed())
        }
    }
}

pub(crate) fn set_trustline<S: DatagramSocket>(
    ctx: &NodeContext<S>,
    datagram: &Datagram,
) -> Result<Vec<u8>, HandlerError> {
    let TrustlineAmount { amount } = TrustlineAmount::decode(&datagram.arguments);
    let key = datagram.relation_key();
    let epoch = ctx.update_relation(&key, |relation| {
        advance_counter(&mut relation.counter_out, datagram.counter)?;
        Ok(set_trustline_out(relation, amount))
    })?;
    tracing::info!(relation = %key, amount, epoch, "trustline set");
    Ok(Vec::new())
}

pub(crate) fn get_trustline_in<S: DatagramSocket>(
    ctx: &NodeContext<S>,
    datagram: &Datagram,
) -> Result<Vec<u8>, HandlerError> {
    let amount = ctx.update_relation(&datagram.relation_key(), |relation| {
        advance_counter(&mut relation.counter_out, datagram.counter)?;
        Ok(relation.trustline_in)
    })?;
    Ok(amount.to_be_bytes().to_vec())
}

pub(crate) fn get_trustline_out<S: DatagramSocket>(
    ctx: &NodeContext<S>,
    datagram: &Datagram,
) -> Result<Vec<u8>, HandlerError> {
    let amount = ctx.update_relation(&datagram.relation_key(), |relation| {
        advance_counter(&mut relation.counter_out, datagram.counter)?;
        Ok(relation.trustline_out)
    })?;
    Ok(amount.to_be_bytes().to_vec())
}

/// Ask the peer to push its trustline towards this account.
pub(crate) async fn sync_trustline_in<S: DatagramSocket>(
    ctx: &NodeContext<S>,
    datagram: &Datagram,
) -> Result<Vec<u8>, HandlerError> {
    let outbound = ctx.update_relation(&datagram.relation_key(), |relation| {
        advance_counter(&mut relation.counter_out, datagram.counter)?;
        let held = SyncEpoch {
            epoch: relation.sync_in,
        };
        ctx.prepare(relation, PeerCommand::GetTrustline, held.encode())
    })?;
    ctx.deliver(outbound).await?;
    Ok(Vec::new())
}

/// Push this account's trustline to the peer, or just a timestamp if the
/// peer already has the current epoch.
pub(crate) async fn sync_trustline_out<S: DatagramSocket>(
    ctx: &NodeContext<S>,
    datagram: &Datagram,
) -> Result<Vec<u8>, HandlerError> {
    let key = datagram.relation_key();
    let outbound = ctx.update_relation(&key, |relation| {
        advance_counter(&mut relation.counter_out, datagram.counter)?;
        let action = plan_push(relation);
        tracing::debug!(relation = %key, ?action, "syncing trustline out");
        sync_message(ctx, relation, action)
    })?;
    ctx.deliver(outbound).await?;
    Ok(Vec::new())
}

/// The peer holds epoch `sync_in` of our trustline and wants the latest.
pub(crate) async fn peer_get_trustline<S: DatagramSocket>(
    ctx: &NodeContext<S>,
    datagram: &Datagram,
) -> Result<(), HandlerError> {
    let SyncEpoch { epoch: peer_sync_in } = SyncEpoch::decode(&datagram.arguments);
    let outbound = ctx.update_relation(&datagram.relation_key(), |relation| {
        advance_counter(&mut relation.counter_in, datagram.counter)?;
        touch(relation, Timestamp::now());
        let action = answer_pull(relation, peer_sync_in);
        sync_message(ctx, relation, action)
    })?;
    ctx.deliver(outbound).await
}

/// The peer pushed its trustline. Adopt it if newer and acknowledge the
/// epoch we now hold, so lost acknowledgments are repaired by a re-push.
pub(crate) async fn peer_set_trustline<S: DatagramSocket>(
    ctx: &NodeContext<S>,
    datagram: &Datagram,
) -> Result<(), HandlerError> {
    let TrustlineUpdate { amount, epoch } = TrustlineUpdate::decode(&datagram.arguments);
    let key = datagram.relation_key();
    let outbound = ctx.update_relation(&key, |relation| {
        advance_counter(&mut relation.counter_in, datagram.counter)?;
        if apply_push(relation, TrustlineValue { amount, epoch }, Timestamp::now()) {
            tracing::info!(relation = %key, amount, epoch, "trustline in updated");
        }
        let held = SyncEpoch {
            epoch: relation.sync_in,
        };
        ctx.prepare(relation, PeerCommand::SetSyncOut, held.encode())
    })?;
    ctx.deliver(outbound).await
}

pub(crate) fn peer_set_sync_out<S: DatagramSocket>(
    ctx: &NodeContext<S>,
    datagram: &Datagram,
) -> Result<(), HandlerError> {
    let SyncEpoch { epoch } = SyncEpoch::decode(&datagram.arguments);
    let key = datagram.relation_key();
    ctx.update_relation(&key, |relation| {
        advance_counter(&mut relation.counter_in, datagram.counter)?;
        touch(relation, Timestamp::now());
        if acknowledge(relation, epoch) {
            tracing::debug!(relation = %key, epoch, "peer acknowledged trustline");
        }
        Ok(())
    })
}

pub(crate) fn peer_set_timestamp<S: DatagramSocket>(
    ctx: &NodeContext<S>,
    datagram: &Datagram,
) -> Result<(), HandlerError> {
    ctx.update_relation(&datagram.relation_key(), |relation| {
        advance_counter(&mut relation.counter_in, datagram.counter)?;
        touch(relation, Timestamp::now());
        Ok(())
    })
}
