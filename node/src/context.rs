//! Shared node state and the helpers handlers use to touch it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use ripple_ledger::next_send_counter;
use ripple_network::{resolve_server, DatagramSocket, Importance, NetworkError, ReliableTransport};
use ripple_pathfinding::PathManager;
use ripple_protocol::{Arguments, ClientResponse, Datagram, PeerCommand, DEFAULT_PORT};
use ripple_store::{AccountRecord, KeyScope, KeyStore, LedgerStore, PeerRelation};
use ripple_types::{PeerAccount, RelationKey, SecretKey, ServerAddress, Username};

use crate::{Authenticator, HandlerError, NodeMetrics, SessionDispatcher, WaitGroup};

/// Everything a handler can reach. One per node, shared behind an `Arc`.
pub struct NodeContext<S> {
    pub server_address: ServerAddress,
    pub store: Arc<dyn LedgerStore>,
    pub keys: Arc<dyn KeyStore>,
    pub authenticator: Authenticator,
    pub transport: Arc<ReliableTransport<S>>,
    pub paths: PathManager,
    pub dispatcher: SessionDispatcher,
    pub metrics: Arc<NodeMetrics>,
    pub in_flight: WaitGroup,
}

/// A signed datagram ready to go to a peer server.
pub struct Outbound {
    pub peer: PeerAccount,
    pub datagram: Datagram,
}

impl<S: DatagramSocket> NodeContext<S> {
    pub fn new(
        server_address: ServerAddress,
        store: Arc<dyn LedgerStore>,
        keys: Arc<dyn KeyStore>,
        transport: ReliableTransport<S>,
        path_timeout: Duration,
    ) -> Self {
        Self {
            authenticator: Authenticator::new(Arc::clone(&store), Arc::clone(&keys)),
            server_address,
            store,
            keys,
            transport: Arc::new(transport),
            paths: PathManager::new(path_timeout),
            dispatcher: SessionDispatcher::new(),
            metrics: Arc::new(NodeMetrics::new()),
            in_flight: WaitGroup::new(),
        }
    }

    /// This server's view of `account` as a network-wide identity.
    pub fn local_account(&self, account: &Username) -> PeerAccount {
        PeerAccount::new(account.clone(), self.server_address.clone())
    }

    /// Load a relation, apply `f` and write the result back in one put.
    ///
    /// Nothing is written if `f` fails.
    pub fn update_relation<R>(
        &self,
        key: &RelationKey,
        f: impl FnOnce(&mut PeerRelation) -> Result<R, HandlerError>,
    ) -> Result<R, HandlerError> {
        let mut relation = self.store.get_relation(key)?;
        let out = f(&mut relation)?;
        self.store.put_relation(&relation)?;
        Ok(out)
    }

    /// Load an account record, apply `f` and write it back.
    pub fn update_account<R>(
        &self,
        account: &Username,
        f: impl FnOnce(&mut AccountRecord) -> Result<R, HandlerError>,
    ) -> Result<R, HandlerError> {
        let mut record = self.store.get_account(account)?;
        let out = f(&mut record)?;
        self.store.put_account(&record)?;
        Ok(out)
    }

    /// Build and sign a datagram from `relation.account` to its peer,
    /// stamping it with the relation's next send counter.
    ///
    /// The caller persists `relation` afterwards.
    pub fn prepare(
        &self,
        relation: &mut PeerRelation,
        command: PeerCommand,
        arguments: Arguments,
    ) -> Result<Outbound, HandlerError> {
        let counter = next_send_counter(&mut relation.send_counter)?;
        let key = self.keys.load_key(&KeyScope::Relation(relation.key()))?;
        let datagram = Datagram::new(
            command,
            relation.peer.username.clone(),
            self.local_account(&relation.account),
            arguments,
            counter,
        )
        .signed(&key);
        Ok(Outbound {
            peer: relation.peer.clone(),
            datagram,
        })
    }

    /// Deliver a prepared datagram and wait for its ACK.
    pub async fn deliver(&self, outbound: Outbound) -> Result<(), HandlerError> {
        deliver(&self.transport, &self.metrics, outbound).await
    }

    /// Deliver `outbound` concurrently. Failed branches are
    /// logged and dropped. Returns how many were acknowledged.
    pub async fn deliver_all(&self, outbound: Vec<Outbound>) -> usize {
        let mut sends = tokio::task::JoinSet::new();
        for message in outbound {
            let transport = Arc::clone(&self.transport);
            let metrics = Arc::clone(&self.metrics);
            sends.spawn(async move { deliver(&transport, &metrics, message).await });
        }
        let mut delivered = 0;
        while let Some(joined) = sends.join_next().await {
            match joined {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => tracing::debug!(error = %e, "branch not delivered"),
                Err(e) => tracing::warn!(error = %e, "send task failed"),
            }
        }
        delivered
    }

    /// Send a signed reply to a client in the background.
    ///
    /// The reply does not hold the account's dispatcher slot, but it does
    /// hold the shutdown wait group.
    pub fn respond(&self, target: SocketAddr, key: SecretKey, response: ClientResponse) {
        let guard = self.in_flight.enter();
        let transport = Arc::clone(&self.transport);
        let metrics = Arc::clone(&self.metrics);
        tokio::spawn(async move {
            let _guard = guard;
            let bytes = response.encode(&key);
            if let Err(e) = transport.send(&bytes, target, Importance::High).await {
                if matches!(e, NetworkError::DeliveryFailed { .. }) {
                    metrics.delivery_failures.inc();
                }
                tracing::warn!(%target, error = %e, "client reply not delivered");
            }
        });
    }
}

async fn deliver<S: DatagramSocket>(
    transport: &ReliableTransport<S>,
    metrics: &NodeMetrics,
    outbound: Outbound,
) -> Result<(), HandlerError> {
    let target = resolve_server(&outbound.peer.server, DEFAULT_PORT).await?;
    let command = outbound.datagram.command;
    tracing::trace!(
        peer = %outbound.peer,
        %target,
        %command,
        counter = outbound.datagram.counter,
        "sending"
    );
    transport
        .send(&outbound.datagram.encode(), target, Importance::Low)
        .await
        .map_err(|e| {
            if matches!(e, NetworkError::DeliveryFailed { .. }) {
                metrics.delivery_failures.inc();
            }
            HandlerError::Transport(e)
        })
}
