use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use ripple_ledger::{sync_state, SyncState};
use ripple_network::{ReliableTransport, RetryPolicy};
use ripple_nullables::{NullSocket, NullStore};
use ripple_pathfinding::payment_id;
use ripple_protocol::{
    ArgumentLayout, Arguments, ClientCommand, ClientResponse, Command, Datagram, PathProbe,
    PathRecursion, PaymentReport, PaymentRequest, PeerCommand, SyncEpoch, TrustlineAmount,
    TrustlineUpdate, DATAGRAM_LEN, RESPONSE_LEN,
};
use ripple_store::{AccountStore, KeyScope, PeerRelation, RelationStore};
use ripple_types::{
    PaymentDirection, PaymentId, PeerAccount, RelationKey, SecretKey, ServerAddress, Username,
};

use super::process;
use crate::NodeContext;

const SERVER: &str = "127.0.0.1:2012";
const CLIENT_ADDR: &str = "127.0.0.1:5555";

fn user(name: &str) -> Username {
    Username::new(name).unwrap()
}

fn remote(name: &str, port: u16) -> PeerAccount {
    PeerAccount::new(user(name), ServerAddress::new(format!("127.0.0.1:{port}")).unwrap())
}

fn bob() -> PeerAccount {
    remote("bob", 4001)
}

fn carol() -> PeerAccount {
    remote("carol", 4002)
}

fn client_key() -> SecretKey {
    SecretKey::new(b"alice-client".to_vec())
}

fn relation_key(peer: &PeerAccount) -> SecretKey {
    SecretKey::new(format!("relation-{}", peer.username).into_bytes())
}

struct Harness {
    store: Arc<NullStore>,
    socket: Arc<NullSocket>,
    ctx: NodeContext<NullSocket>,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(NullStore::new());
        let socket = Arc::new(NullSocket::new(SERVER.parse().unwrap()));
        let policy = RetryPolicy {
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
            low_importance_attempts: 1,
            high_importance_attempts: 1,
        };
        let ctx = NodeContext::new(
            ServerAddress::new(SERVER).unwrap(),
            store.clone(),
            store.clone(),
            ReliableTransport::new(socket.clone(), policy),
            Duration::from_secs(60),
        );
        store.insert_account(user("alice"));
        store.insert_key(KeyScope::Client(user("alice")), client_key());
        Self { store, socket, ctx }
    }

    fn relate(&self, peer: PeerAccount, f: impl FnOnce(&mut PeerRelation)) {
        let mut relation = PeerRelation::new(user("alice"), peer.clone());
        f(&mut relation);
        self.store.put_relation(&relation).unwrap();
        self.store.insert_key(
            KeyScope::Relation(RelationKey::new(user("alice"), peer.clone())),
            relation_key(&peer),
        );
    }

    fn relation(&self, peer: &PeerAccount) -> PeerRelation {
        self.store
            .get_relation(&RelationKey::new(user("alice"), peer.clone()))
            .unwrap()
    }

    fn client(
        &self,
        command: ClientCommand,
        peer: PeerAccount,
        args: Arguments,
        counter: u32,
    ) -> Datagram {
        Datagram::new(command, user("alice"), peer, args, counter).signed(&client_key())
    }

    fn from_peer(
        &self,
        command: PeerCommand,
        peer: PeerAccount,
        args: Arguments,
        counter: u32,
    ) -> Datagram {
        let key = relation_key(&peer);
        Datagram::new(command, user("alice"), peer, args, counter).signed(&key)
    }

    async fn run(&self, datagram: Datagram) {
        process(&self.ctx, datagram, CLIENT_ADDR.parse().unwrap()).await;
        self.ctx.in_flight.wait().await;
    }

    /// Datagrams sent to peers, with their destination.
    fn sent(&self) -> Vec<(SocketAddr, Datagram)> {
        self.socket
            .sent_payloads()
            .into_iter()
            .filter(|(_, bytes)| bytes.len() == DATAGRAM_LEN)
            .map(|(to, bytes)| (to, Datagram::decode(&bytes).unwrap()))
            .collect()
    }

    fn responses(&self) -> Vec<ClientResponse> {
        let client: SocketAddr = CLIENT_ADDR.parse().unwrap();
        self.socket
            .sent_payloads()
            .into_iter()
            .filter(|(to, bytes)| *to == client && bytes.len() == RESPONSE_LEN)
            .map(|(_, bytes)| ClientResponse::decode(&bytes, &client_key()).unwrap())
            .collect()
    }
}

fn addr(peer: &PeerAccount) -> SocketAddr {
    peer.server.as_str().parse().unwrap()
}

#[tokio::test]
async fn set_trustline_commits_amount_with_counter_and_replay_is_dropped() {
    let h = Harness::new();
    h.relate(bob(), |r| r.counter_out = 3);

    let set = h.client(
        ClientCommand::SetTrustline,
        bob(),
        TrustlineAmount { amount: 100 }.encode(),
        5,
    );
    h.run(set.clone()).await;

    let relation = h.relation(&bob());
    assert_eq!(relation.trustline_out, 100);
    assert_eq!(relation.counter_out, 5);
    assert_eq!(relation.sync_counter, 1);
    let responses = h.responses();
    assert_eq!(responses.len(), 1);
    assert!(responses[0].is_ok());
    assert_eq!(responses[0].request_counter, 5);

    h.run(set).await;
    assert_eq!(h.relation(&bob()), relation);
    assert_eq!(h.responses().len(), 1);
    assert_eq!(h.ctx.metrics.replays_rejected.get(), 1);
}

#[tokio::test]
async fn get_trustline_in_replies_with_amount() {
    let h = Harness::new();
    h.relate(bob(), |r| r.trustline_in = 42);

    h.run(h.client(ClientCommand::GetTrustlineIn, bob(), Arguments::zeroed(), 1))
        .await;

    let responses = h.responses();
    assert_eq!(responses[0].body_u32(), 42);
    assert_eq!(h.relation(&bob()).counter_out, 1);
}

#[tokio::test]
async fn unknown_relation_gets_signed_error_reply() {
    let h = Harness::new();
    h.run(h.client(
        ClientCommand::SetTrustline,
        bob(),
        TrustlineAmount { amount: 1 }.encode(),
        1,
    ))
    .await;

    let responses = h.responses();
    assert_eq!(responses.len(), 1);
    assert!(!responses[0].is_ok());
    assert!(responses[0].error_message().unwrap().contains("unknown relation"));
    assert!(h.sent().is_empty());
}

#[tokio::test]
async fn sync_trustline_out_pushes_current_epoch() {
    let h = Harness::new();
    h.relate(bob(), |r| r.send_counter = 9);

    h.run(h.client(
        ClientCommand::SetTrustline,
        bob(),
        TrustlineAmount { amount: 100 }.encode(),
        1,
    ))
    .await;
    h.run(h.client(ClientCommand::SyncTrustlineOut, bob(), Arguments::zeroed(), 2))
        .await;

    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    let (to, push) = &sent[0];
    assert_eq!(*to, addr(&bob()));
    assert_eq!(push.command, Command::Peer(PeerCommand::SetTrustline));
    assert_eq!(push.username, user("bob"));
    assert_eq!(push.peer_username, user("alice"));
    assert_eq!(push.peer_server_address.as_str(), SERVER);
    assert_eq!(push.counter, 10);
    assert!(push.verify(&relation_key(&bob())));
    assert_eq!(
        TrustlineUpdate::decode(&push.arguments),
        TrustlineUpdate {
            amount: 100,
            epoch: 1
        }
    );

    let relation = h.relation(&bob());
    assert_eq!(relation.send_counter, 10);
    assert_eq!(sync_state(&relation), SyncState::Pending);
}

#[tokio::test]
async fn synced_relation_only_refreshes_timestamp() {
    let h = Harness::new();
    h.relate(bob(), |r| {
        r.trustline_out = 50;
        r.sync_counter = 2;
        r.sync_out = 2;
    });

    h.run(h.client(ClientCommand::SyncTrustlineOut, bob(), Arguments::zeroed(), 1))
        .await;

    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1.command, Command::Peer(PeerCommand::SetTimestamp));
}

#[tokio::test]
async fn peer_push_is_adopted_once_and_always_acknowledged() {
    let h = Harness::new();
    h.relate(bob(), |_| {});

    h.run(h.from_peer(
        PeerCommand::SetTrustline,
        bob(),
        TrustlineUpdate {
            amount: 70,
            epoch: 3,
        }
        .encode(),
        1,
    ))
    .await;
    let relation = h.relation(&bob());
    assert_eq!(relation.trustline_in, 70);
    assert_eq!(relation.sync_in, 3);
    assert_eq!(relation.counter_in, 1);

    h.run(h.from_peer(
        PeerCommand::SetTrustline,
        bob(),
        TrustlineUpdate {
            amount: 5,
            epoch: 2,
        }
        .encode(),
        2,
    ))
    .await;
    assert_eq!(h.relation(&bob()).trustline_in, 70);

    let acks: Vec<_> = h
        .sent()
        .into_iter()
        .map(|(_, d)| {
            assert_eq!(d.command, Command::Peer(PeerCommand::SetSyncOut));
            SyncEpoch::decode(&d.arguments).epoch
        })
        .collect();
    assert_eq!(acks, vec![3, 3]);
}

#[tokio::test]
async fn peer_acknowledgment_marks_relation_synced() {
    let h = Harness::new();
    h.relate(bob(), |r| {
        r.sync_counter = 4;
        r.sync_sent = 4;
        r.sync_out = 1;
    });

    h.run(h.from_peer(
        PeerCommand::SetSyncOut,
        bob(),
        SyncEpoch { epoch: 4 }.encode(),
        1,
    ))
    .await;

    assert_eq!(sync_state(&h.relation(&bob())), SyncState::Synced);
}

#[tokio::test]
async fn peer_pull_of_stale_epoch_gets_a_push() {
    let h = Harness::new();
    h.relate(bob(), |r| {
        r.trustline_out = 30;
        r.sync_counter = 2;
    });

    h.run(h.from_peer(
        PeerCommand::GetTrustline,
        bob(),
        SyncEpoch { epoch: 1 }.encode(),
        1,
    ))
    .await;

    let sent = h.sent();
    assert_eq!(sent[0].1.command, Command::Peer(PeerCommand::SetTrustline));
    assert_eq!(
        TrustlineUpdate::decode(&sent[0].1.arguments),
        TrustlineUpdate {
            amount: 30,
            epoch: 2
        }
    );
}

#[tokio::test]
async fn replayed_peer_datagram_sends_nothing() {
    let h = Harness::new();
    h.relate(bob(), |r| r.counter_in = 8);

    h.run(h.from_peer(
        PeerCommand::GetTrustline,
        bob(),
        SyncEpoch { epoch: 0 }.encode(),
        8,
    ))
    .await;

    assert!(h.socket.sent().is_empty());
    assert_eq!(h.relation(&bob()).counter_in, 8);
}

#[tokio::test]
async fn payment_probes_only_relations_with_capacity() {
    let h = Harness::new();
    h.relate(bob(), |r| r.trustline_in = 100);
    h.relate(carol(), |r| r.trustline_in = 10);
    let payee = remote("dave", 4009);

    h.run(h.client(
        ClientCommand::NewPaymentOut,
        payee.clone(),
        PaymentRequest {
            amount: 50,
            nonce: 1,
        }
        .encode(),
        1,
    ))
    .await;

    let payer = PeerAccount::new(user("alice"), ServerAddress::new(SERVER).unwrap());
    let expected = payment_id(&payer, &payee, 50, 1);

    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, addr(&bob()));
    assert_eq!(sent[0].1.command, Command::Peer(PeerCommand::FindPathOut));
    assert_eq!(
        PathProbe::decode(&sent[0].1.arguments),
        PathProbe {
            id: expected,
            amount: 50
        }
    );
    assert_eq!(h.relation(&carol()).send_counter, 0);

    let responses = h.responses();
    assert!(responses[0].is_ok());
    assert_eq!(&responses[0].body()[..32], expected.as_bytes());
    assert_eq!(h.store.get_account(&user("alice")).unwrap().counter, 1);
}

#[tokio::test]
async fn get_payment_reports_active_search() {
    let h = Harness::new();
    h.relate(bob(), |r| r.trustline_out = 100);

    h.run(h.client(
        ClientCommand::NewPaymentIn,
        bob(),
        PaymentRequest {
            amount: 20,
            nonce: 7,
        }
        .encode(),
        1,
    ))
    .await;
    h.run(h.client(ClientCommand::GetPayment, bob(), Arguments::zeroed(), 2))
        .await;

    let responses = h.responses();
    let report = PaymentReport::decode(responses[1].body()).unwrap();
    assert_eq!(report.counterparty, bob());
    assert_eq!(report.direction, PaymentDirection::Incoming);
    assert_eq!(report.amount, 20);
    assert_eq!(report.nonce, 7);
    assert_eq!(report.depth, 0);
    assert!(!report.resolved);
}

#[tokio::test]
async fn zero_amount_payment_is_refused() {
    let h = Harness::new();
    h.run(h.client(
        ClientCommand::NewPaymentOut,
        bob(),
        PaymentRequest {
            amount: 0,
            nonce: 1,
        }
        .encode(),
        1,
    ))
    .await;
    assert!(!h.responses()[0].is_ok());
    assert_eq!(h.ctx.paths.path_count(), 0);
}

const PROBE_ID: PaymentId = PaymentId::new([9; 32]);

#[tokio::test]
async fn first_probe_joins_and_answers_with_depth_zero() {
    let h = Harness::new();
    h.relate(bob(), |_| {});

    h.run(h.from_peer(
        PeerCommand::FindPathOut,
        bob(),
        PathProbe {
            id: PROBE_ID,
            amount: 10,
        }
        .encode(),
        1,
    ))
    .await;

    let path = h.ctx.paths.path(&user("alice"), &PROBE_ID).unwrap();
    assert_eq!(path.incoming, Some(bob()));
    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, addr(&bob()));
    assert_eq!(
        PathRecursion::decode(&sent[0].1.arguments),
        PathRecursion {
            id: PROBE_ID,
            depth: 0
        }
    );
}

#[tokio::test]
async fn recursion_with_wrong_depth_changes_nothing() {
    let h = Harness::new();
    h.relate(bob(), |_| {});
    h.relate(carol(), |_| {});
    h.run(h.from_peer(
        PeerCommand::FindPathOut,
        bob(),
        PathProbe {
            id: PROBE_ID,
            amount: 10,
        }
        .encode(),
        1,
    ))
    .await;
    h.socket.clear();

    h.run(h.from_peer(
        PeerCommand::PathRecurse,
        carol(),
        PathRecursion {
            id: PROBE_ID,
            depth: 3,
        }
        .encode(),
        1,
    ))
    .await;
    assert_eq!(h.ctx.paths.path(&user("alice"), &PROBE_ID).unwrap().depth, 0);
    assert!(h.socket.sent().is_empty());

    h.run(h.from_peer(
        PeerCommand::PathRecurse,
        carol(),
        PathRecursion {
            id: PROBE_ID,
            depth: 0,
        }
        .encode(),
        2,
    ))
    .await;
    assert_eq!(h.ctx.paths.path(&user("alice"), &PROBE_ID).unwrap().depth, 1);
    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, addr(&bob()));
    assert_eq!(
        PathRecursion::decode(&sent[0].1.arguments),
        PathRecursion {
            id: PROBE_ID,
            depth: 1
        }
    );
}

#[tokio::test]
async fn repeated_probe_is_forwarded_with_capacity_check() {
    let h = Harness::new();
    h.relate(bob(), |_| {});
    h.relate(carol(), |r| r.trustline_in = 10);
    h.relate(remote("erin", 4003), |r| r.trustline_in = 3);
    let probe = |counter| {
        h.from_peer(
            PeerCommand::FindPathOut,
            bob(),
            PathProbe {
                id: PROBE_ID,
                amount: 10,
            }
            .encode(),
            counter,
        )
    };

    h.run(probe(1)).await;
    h.socket.clear();
    h.run(probe(2)).await;

    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, addr(&carol()));
    assert_eq!(sent[0].1.command, Command::Peer(PeerCommand::FindPathOut));
}

#[tokio::test]
async fn opposite_probe_bridges_and_announces_route() {
    let h = Harness::new();
    h.relate(bob(), |r| r.trustline_out = 100);
    h.relate(carol(), |r| r.trustline_in = 100);
    h.run(h.from_peer(
        PeerCommand::FindPathOut,
        bob(),
        PathProbe {
            id: PROBE_ID,
            amount: 10,
        }
        .encode(),
        1,
    ))
    .await;
    h.socket.clear();

    h.run(h.from_peer(
        PeerCommand::FindPathIn,
        carol(),
        PathProbe {
            id: PROBE_ID,
            amount: 10,
        }
        .encode(),
        1,
    ))
    .await;

    let path = h.ctx.paths.path(&user("alice"), &PROBE_ID).unwrap();
    assert!(path.is_bridged());
    assert!(path.committed);

    let mut sent: Vec<_> = h
        .sent()
        .into_iter()
        .map(|(to, d)| (to, d.command))
        .collect();
    sent.sort_by_key(|(to, _)| *to);
    assert_eq!(
        sent,
        vec![
            (addr(&bob()), Command::Peer(PeerCommand::FindPathIn)),
            (addr(&carol()), Command::Peer(PeerCommand::FindPathOut)),
        ]
    );
}

#[tokio::test]
async fn payer_root_resolves_when_payee_search_arrives() {
    let h = Harness::new();
    h.relate(bob(), |r| {
        r.trustline_in = 100;
        r.trustline_out = 100;
    });
    h.run(h.client(
        ClientCommand::NewPaymentOut,
        bob(),
        PaymentRequest {
            amount: 10,
            nonce: 1,
        }
        .encode(),
        1,
    ))
    .await;
    let payer = PeerAccount::new(user("alice"), ServerAddress::new(SERVER).unwrap());
    let id = payment_id(&payer, &bob(), 10, 1);
    h.socket.clear();

    h.run(h.from_peer(
        PeerCommand::FindPathIn,
        bob(),
        PathProbe { id, amount: 10 }.encode(),
        1,
    ))
    .await;

    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, addr(&bob()));
    assert_eq!(sent[0].1.command, Command::Peer(PeerCommand::FindPathOut));

    h.run(h.client(ClientCommand::GetPayment, bob(), Arguments::zeroed(), 2))
        .await;
    let responses = h.responses();
    let report = PaymentReport::decode(responses.last().unwrap().body()).unwrap();
    assert!(report.resolved);
}

#[tokio::test]
async fn failed_relation_write_leaves_paths_untouched() {
    let h = Harness::new();
    h.relate(bob(), |r| r.send_counter = u32::MAX);

    h.run(h.from_peer(
        PeerCommand::FindPathOut,
        bob(),
        PathProbe {
            id: PROBE_ID,
            amount: 10,
        }
        .encode(),
        1,
    ))
    .await;

    assert!(h.ctx.paths.path(&user("alice"), &PROBE_ID).is_none());
    assert_eq!(h.relation(&bob()).counter_in, 0);
    assert!(h.sent().is_empty());
}
