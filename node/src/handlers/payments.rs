//! Payment origination and distributed path finding.

use std::time::Instant;

use ripple_ledger::{advance_counter, has_capacity, touch};
use ripple_network::DatagramSocket;
use ripple_pathfinding::{
    payment_id, Announcement, Payment, Probe, ProbeOutcome, RecurseOutcome,
};
use ripple_protocol::{
    ArgumentLayout, Datagram, PathProbe, PathRecursion, PaymentReport, PaymentRequest,
    PeerCommand,
};
use ripple_types::{PaymentDirection, PaymentId, PeerAccount, RelationKey, Timestamp, Username};

use crate::{HandlerError, NodeContext};

fn probe_command(direction: PaymentDirection) -> PeerCommand {
    match direction {
        PaymentDirection::Outgoing => PeerCommand::FindPathOut,
        PaymentDirection::Incoming => PeerCommand::FindPathIn,
    }
}

/// Send a probe for `id` to every relation of `account` with room for
/// `amount` in `direction`, except those in `exclude`.
///
/// Returns the number of probes sent.
async fn flood<S: DatagramSocket>(
    ctx: &NodeContext<S>,
    account: &Username,
    id: PaymentId,
    amount: u32,
    direction: PaymentDirection,
    exclude: &[PeerAccount],
) -> Result<usize, HandlerError> {
    let command = probe_command(direction);
    let arguments = PathProbe { id, amount }.encode();
    let mut outbound = Vec::new();

    for mut relation in ctx.store.relations_of(account)? {
        if exclude.contains(&relation.peer) {
            continue;
        }
        if !has_capacity(&relation, direction, amount) {
            tracing::trace!(payment = %id, peer = %relation.peer, amount, "pruned");
            continue;
        }
        match ctx.prepare(&mut relation, command, arguments.clone()) {
            Ok(message) => {
                ctx.store.put_relation(&relation)?;
                outbound.push(message);
            }
            Err(e) => {
                tracing::warn!(payment = %id, peer = %relation.peer, error = %e, "cannot probe")
            }
        }
    }

    let sent = outbound.len();
    let delivered = ctx.deliver_all(outbound).await;
    tracing::debug!(payment = %id, %account, %command, sent, delivered, "flooded");
    Ok(sent)
}

/// Client `NewPaymentOut` / `NewPaymentIn`: become the root of a search.
///
/// Both ends derive the same identifier with the payer first, so their
/// searches recognise each other wherever they meet.
pub(crate) async fn new_payment<S: DatagramSocket>(
    ctx: &NodeContext<S>,
    datagram: &Datagram,
    direction: PaymentDirection,
) -> Result<Vec<u8>, HandlerError> {
    let PaymentRequest { amount, nonce } = PaymentRequest::decode(&datagram.arguments);
    if amount == 0 {
        return Err(HandlerError::Validation("payment amount must be positive".into()));
    }
    let account = &datagram.username;
    ctx.update_account(account, |record| {
        advance_counter(&mut record.counter, datagram.counter).map_err(HandlerError::from)
    })?;

    let me = ctx.local_account(account);
    let counterparty = datagram.peer();
    let id = match direction {
        PaymentDirection::Outgoing => payment_id(&me, &counterparty, amount, nonce),
        PaymentDirection::Incoming => payment_id(&counterparty, &me, amount, nonce),
    };
    ctx.paths.start_payment(
        account,
        Payment {
            id,
            counterparty: counterparty.clone(),
            direction,
            amount,
            nonce,
        },
        Instant::now(),
    );
    ctx.metrics.live_paths.set(ctx.paths.path_count() as i64);
    tracing::info!(
        payment = %id,
        %account,
        %counterparty,
        %direction,
        amount,
        "payment started"
    );

    flood(ctx, account, id, amount, direction, &[]).await?;
    Ok(id.as_bytes().to_vec())
}

/// Client `GetPayment`: report the active payment search.
pub(crate) fn get_payment<S: DatagramSocket>(
    ctx: &NodeContext<S>,
    datagram: &Datagram,
) -> Result<Vec<u8>, HandlerError> {
    let account = &datagram.username;
    ctx.update_account(account, |record| {
        advance_counter(&mut record.counter, datagram.counter).map_err(HandlerError::from)
    })?;
    let status = ctx
        .paths
        .payment_status(account)
        .ok_or_else(|| HandlerError::Validation("no active payment".into()))?;
    let report = PaymentReport {
        counterparty: status.payment.counterparty,
        direction: status.payment.direction,
        amount: status.payment.amount,
        nonce: status.payment.nonce,
        id: status.payment.id,
        depth: status.depth,
        resolved: status.resolved,
    };
    Ok(report.encode())
}

/// Send each announcement of a resolved route to its neighbour, rechecking
/// capacity on the edge.
async fn announce<S: DatagramSocket>(
    ctx: &NodeContext<S>,
    account: &Username,
    id: PaymentId,
    amount: u32,
    announcements: Vec<Announcement>,
) {
    let arguments = PathProbe { id, amount }.encode();
    let mut outbound = Vec::new();
    for Announcement { to, direction } in announcements {
        let key = RelationKey::new(account.clone(), to);
        let prepared = ctx.update_relation(&key, |relation| {
            if !has_capacity(relation, direction, amount) {
                return Ok(None);
            }
            ctx.prepare(relation, probe_command(direction), arguments.clone())
                .map(Some)
        });
        match prepared {
            Ok(Some(message)) => outbound.push(message),
            Ok(None) => tracing::debug!(payment = %id, peer = %key.peer, "announcement pruned"),
            Err(e) => {
                tracing::warn!(payment = %id, peer = %key.peer, error = %e, "cannot announce")
            }
        }
    }
    let sent = outbound.len();
    let delivered = ctx.deliver_all(outbound).await;
    tracing::debug!(payment = %id, %account, sent, delivered, "route announced");
}

/// Peer `FindPathOut` / `FindPathIn`.
///
/// The path table only changes once the relation write that advances
/// `counter_in` has succeeded.
pub(crate) async fn peer_find_path<S: DatagramSocket>(
    ctx: &NodeContext<S>,
    datagram: &Datagram,
    direction: PaymentDirection,
) -> Result<(), HandlerError> {
    let PathProbe { id, amount } = PathProbe::decode(&datagram.arguments);
    let account = &datagram.username;
    let source = datagram.peer();
    let probe = Probe {
        id,
        amount,
        source: source.clone(),
        direction,
    };

    let outcome = ctx.paths.plan_probe(account, &probe);
    let reply = ctx.update_relation(&datagram.relation_key(), |relation| {
        advance_counter(&mut relation.counter_in, datagram.counter)?;
        touch(relation, Timestamp::now());
        if outcome != ProbeOutcome::Joined {
            return Ok(None);
        }
        ctx.prepare(
            relation,
            PeerCommand::PathRecurse,
            PathRecursion { id, depth: 0 }.encode(),
        )
        .map(Some)
    })?;
    ctx.paths.apply_probe(account, probe, &outcome, Instant::now());
    ctx.metrics.live_paths.set(ctx.paths.path_count() as i64);

    match outcome {
        ProbeOutcome::Joined => {
            if let Some(reply) = reply {
                ctx.deliver(reply).await?;
            }
        }
        ProbeOutcome::Resolved { announce: announcements } => {
            tracing::info!(payment = %id, %account, %source, "route found");
            announce(ctx, account, id, amount, announcements).await;
        }
        ProbeOutcome::Forward { exclude } => {
            flood(ctx, account, id, amount, direction, &exclude).await?;
        }
        ProbeOutcome::Ignored(reason) => {
            tracing::debug!(payment = %id, %account, %source, ?reason, "probe ignored");
        }
    }
    Ok(())
}

/// Peer `PathRecurse`.
pub(crate) async fn peer_path_recurse<S: DatagramSocket>(
    ctx: &NodeContext<S>,
    datagram: &Datagram,
) -> Result<(), HandlerError> {
    let PathRecursion { id, depth } = PathRecursion::decode(&datagram.arguments);
    let account = &datagram.username;

    let outcome = ctx.paths.plan_recurse(account, id, depth);
    ctx.update_relation(&datagram.relation_key(), |relation| {
        advance_counter(&mut relation.counter_in, datagram.counter)?;
        touch(relation, Timestamp::now());
        Ok(())
    })?;
    ctx.paths.apply_recurse(account, id, &outcome, Instant::now());

    match outcome {
        RecurseOutcome::Reflood { amount, direction } => {
            tracing::debug!(payment = %id, %account, depth, "next wave");
            flood(ctx, account, id, amount, direction, &[]).await?;
        }
        RecurseOutcome::Forward { to, depth } => {
            let key = RelationKey::new(account.clone(), to);
            let outbound = ctx.update_relation(&key, |relation| {
                ctx.prepare(
                    relation,
                    PeerCommand::PathRecurse,
                    PathRecursion { id, depth }.encode(),
                )
            })?;
            ctx.deliver(outbound).await?;
        }
        RecurseOutcome::Settled => {
            tracing::debug!(payment = %id, %account, "route through here settled");
        }
        RecurseOutcome::Rejected(reason) => {
            tracing::debug!(payment = %id, %account, depth, ?reason, "recursion rejected");
        }
    }
    Ok(())
}
