//! Command handlers.
//!
//! [`process`] is the body of every dispatcher job: authenticate, run the
//! handler for the command, and for client commands reply with a signed
//! [`ClientResponse`]. Replays never get a reply.

pub mod payments;
pub mod trustlines;

use std::net::SocketAddr;
use std::time::Instant;

use ripple_network::DatagramSocket;
use ripple_protocol::{ClientCommand, ClientResponse, Command, Datagram, PeerCommand};
use ripple_types::PaymentDirection;
use tracing::Instrument;

use crate::{tracing_spans, HandlerError, NodeContext, Rejection};

/// Authenticate and handle one datagram inside its account's slot.
pub async fn process<S: DatagramSocket>(
    ctx: &NodeContext<S>,
    datagram: Datagram,
    source: SocketAddr,
) {
    let span = tracing_spans::datagram_span(
        datagram.command.as_str(),
        datagram.username.as_str(),
        datagram.counter,
    );
    async {
        let started = Instant::now();
        let key = match ctx.authenticator.verify(&datagram) {
            Ok(key) => key,
            Err(rejection) => return refuse(ctx, &datagram, source, rejection),
        };

        match datagram.command {
            Command::Client(command) => {
                let response = match client_command(ctx, command, &datagram).await {
                    Ok(body) => ClientResponse::ok(datagram.counter, &body)
                        .unwrap_or_else(|e| ClientResponse::error(datagram.counter, &e.to_string())),
                    Err(e) => {
                        record(ctx, &datagram, &e);
                        if matches!(e, HandlerError::Replay { .. }) {
                            return;
                        }
                        ClientResponse::error(datagram.counter, &e.to_string())
                    }
                };
                ctx.respond(source, key, response);
            }
            Command::Peer(command) => {
                if let Err(e) = peer_command(ctx, command, &datagram).await {
                    record(ctx, &datagram, &e);
                }
            }
        }
        ctx.metrics
            .handler_time_ms
            .observe(started.elapsed().as_secs_f64() * 1000.0);
    }
    .instrument(span)
    .await
}

async fn client_command<S: DatagramSocket>(
    ctx: &NodeContext<S>,
    command: ClientCommand,
    datagram: &Datagram,
) -> Result<Vec<u8>, HandlerError> {
    match command {
        ClientCommand::SetTrustline => trustlines::set_trustline(ctx, datagram),
        ClientCommand::GetTrustlineIn => trustlines::get_trustline_in(ctx, datagram),
        ClientCommand::GetTrustlineOut => trustlines::get_trustline_out(ctx, datagram),
        ClientCommand::SyncTrustlineIn => trustlines::sync_trustline_in(ctx, datagram).await,
        ClientCommand::SyncTrustlineOut => trustlines::sync_trustline_out(ctx, datagram).await,
        ClientCommand::NewPaymentOut => {
            payments::new_payment(ctx, datagram, PaymentDirection::Outgoing).await
        }
        ClientCommand::NewPaymentIn => {
            payments::new_payment(ctx, datagram, PaymentDirection::Incoming).await
        }
        ClientCommand::GetPayment => payments::get_payment(ctx, datagram),
    }
}

async fn peer_command<S: DatagramSocket>(
    ctx: &NodeContext<S>,
    command: PeerCommand,
    datagram: &Datagram,
) -> Result<(), HandlerError> {
    match command {
        PeerCommand::GetTrustline => trustlines::peer_get_trustline(ctx, datagram).await,
        PeerCommand::SetTrustline => trustlines::peer_set_trustline(ctx, datagram).await,
        PeerCommand::SetSyncOut => trustlines::peer_set_sync_out(ctx, datagram),
        PeerCommand::SetTimestamp => trustlines::peer_set_timestamp(ctx, datagram),
        PeerCommand::FindPathOut => {
            payments::peer_find_path(ctx, datagram, PaymentDirection::Outgoing).await
        }
        PeerCommand::FindPathIn => {
            payments::peer_find_path(ctx, datagram, PaymentDirection::Incoming).await
        }
        PeerCommand::PathRecurse => payments::peer_path_recurse(ctx, datagram).await,
    }
}

fn refuse<S: DatagramSocket>(
    ctx: &NodeContext<S>,
    datagram: &Datagram,
    source: SocketAddr,
    rejection: Rejection,
) {
    let Rejection { error, reply_key } = rejection;
    if error.is_replay() {
        ctx.metrics.replays_rejected.inc();
        tracing::warn!(security = true, %source, error = %error, "replayed datagram dropped");
    } else {
        ctx.metrics.auth_failures.inc();
        tracing::warn!(%source, error = %error, "datagram failed authentication");
    }
    if let Some(key) = reply_key {
        ctx.respond(
            source,
            key,
            ClientResponse::error(datagram.counter, &error.to_string()),
        );
    }
}

fn record<S>(ctx: &NodeContext<S>, datagram: &Datagram, error: &HandlerError) {
    match error {
        HandlerError::Replay { .. } => {
            ctx.metrics.replays_rejected.inc();
            tracing::warn!(security = true, error = %error, "replayed datagram dropped");
        }
        HandlerError::Validation(_) if datagram.command.is_peer() => {
            ctx.metrics.handler_errors.inc();
            tracing::debug!(error = %error, "peer datagram rejected");
        }
        HandlerError::Validation(_) | HandlerError::Transport(_) => {
            ctx.metrics.handler_errors.inc();
            tracing::info!(error = %error, "handler failed");
        }
        HandlerError::Storage(_) => {
            ctx.metrics.handler_errors.inc();
            tracing::error!(error = %error, "storage failure in handler");
        }
    }
}

#[cfg(test)]
mod tests;
