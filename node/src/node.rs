//! The node: receive loop, path sweeper and optional metrics server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use prometheus::IntGauge;
use ripple_network::{DatagramSocket, ReliableTransport};
use ripple_protocol::{Datagram, DATAGRAM_LEN};
use ripple_store::{KeyStore, LedgerStore};
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::NodeConfig;
use crate::context::NodeContext;
use crate::error::NodeError;
use crate::handlers;
use crate::metrics::serve_metrics;
use crate::shutdown::{ShutdownController, WaitGuard};
use crate::tracing_spans;

/// Large enough for any frame; oversized frames are truncated and then
/// rejected for their length.
const RECV_BUFFER_LEN: usize = 2048;

/// Keeps a job counted as in flight until dropped, even if it panics.
struct InFlight {
    _guard: WaitGuard,
    gauge: IntGauge,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

pub struct RippleNode<S = UdpSocket> {
    config: NodeConfig,
    context: Arc<NodeContext<S>>,
    shutdown: ShutdownController,
}

impl RippleNode<UdpSocket> {
    /// Bind the configured UDP address.
    pub async fn bind(
        config: NodeConfig,
        store: Arc<dyn LedgerStore>,
        keys: Arc<dyn KeyStore>,
    ) -> Result<Self, NodeError> {
        let socket = UdpSocket::bind(config.bind_address()).await?;
        Self::with_socket(config, Arc::new(socket), store, keys)
    }
}

impl<S: DatagramSocket> RippleNode<S> {
    pub fn with_socket(
        config: NodeConfig,
        socket: Arc<S>,
        store: Arc<dyn LedgerStore>,
        keys: Arc<dyn KeyStore>,
    ) -> Result<Self, NodeError> {
        let transport = ReliableTransport::new(socket, config.retry_policy());
        let context = NodeContext::new(
            config.server_address()?,
            store,
            keys,
            transport,
            config.path_timeout(),
        );
        Ok(Self {
            shutdown: ShutdownController::new(config.force_exit_signals),
            context: Arc::new(context),
            config,
        })
    }

    pub fn context(&self) -> &Arc<NodeContext<S>> {
        &self.context
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn local_addr(&self) -> Result<SocketAddr, NodeError> {
        Ok(self.context.transport.socket().local_addr()?)
    }

    /// Handle for feeding OS signals or stopping from elsewhere.
    pub fn shutdown_controller(&self) -> ShutdownController {
        self.shutdown.clone()
    }

    /// Begin a graceful stop. [`run`](Self::run) returns once drained.
    pub fn stop(&self) {
        self.shutdown.shutdown();
    }

    /// Serve until shutdown, then drain in-flight jobs.
    pub async fn run(&self) -> Result<(), NodeError> {
        let shutdown_rx = self.shutdown.subscribe();
        tracing::info!(
            server = %self.context.server_address,
            addr = %self.local_addr()?,
            "node starting"
        );

        let sweeper = spawn_sweeper(
            Arc::clone(&self.context),
            self.config.sweep_interval(),
            self.shutdown.subscribe(),
        );
        let metrics_server = self.config.enable_metrics.then(|| {
            let addr = SocketAddr::from(([0, 0, 0, 0], self.config.metrics_port));
            tokio::spawn(serve_metrics(
                Arc::clone(&self.context.metrics),
                addr,
                self.shutdown.subscribe(),
            ))
        });

        self.serve(shutdown_rx).await;

        sweeper.abort();
        if let Some(server) = metrics_server {
            match server.await {
                Ok(Err(e)) => tracing::warn!(error = %e, "metrics server failed"),
                Err(e) => tracing::warn!(error = %e, "metrics server task failed"),
                Ok(Ok(())) => {}
            }
        }
        tracing::info!("node stopped");
        Ok(())
    }

    async fn serve(&self, mut shutdown: broadcast::Receiver<()>) {
        let ctx = &self.context;
        let mut draining = self.shutdown.is_triggered();
        loop {
            tokio::select! {
                _ = shutdown.recv(), if !draining => {
                    tracing::info!(in_flight = ctx.in_flight.count(), "draining");
                    draining = true;
                }
                _ = ctx.in_flight.wait(), if draining => break,
                received = recv_frame(ctx.transport.socket().as_ref()) => match received {
                    Ok((frame, from)) => self.on_frame(&frame, from, draining).await,
                    Err(e) => tracing::warn!(error = %e, "receive failed"),
                },
            }
        }
    }

    async fn on_frame(&self, bytes: &[u8], from: SocketAddr, draining: bool) {
        let ctx = &self.context;
        let inbound = match ctx.transport.classify(bytes) {
            Ok(Some(inbound)) => inbound,
            Ok(None) => return,
            Err(e) => {
                tracing::debug!(%from, error = %e, "unreadable frame");
                return;
            }
        };
        if draining {
            tracing::debug!(%from, id = inbound.id, "draining, datagram dropped");
            return;
        }
        if inbound.payload.len() != DATAGRAM_LEN {
            tracing::debug!(%from, len = inbound.payload.len(), "wrong datagram size, dropped");
            return;
        }
        ctx.metrics.datagrams_received.inc();
        ctx.transport.acknowledge(inbound.id, from).await;
        ctx.metrics.acks_sent.inc();

        match Datagram::decode(inbound.payload) {
            Ok(datagram) => self.dispatch(datagram, from),
            Err(e) => {
                ctx.metrics.auth_failures.inc();
                tracing::warn!(%from, error = %e, "malformed datagram dropped");
            }
        }
    }

    /// Queue the datagram on its account's slot. Jobs are routed in
    /// arrival order, so per-account order follows the socket.
    fn dispatch(&self, datagram: Datagram, from: SocketAddr) {
        let ctx = Arc::clone(&self.context);
        let in_flight = InFlight {
            _guard: ctx.in_flight.enter(),
            gauge: ctx.metrics.in_flight_jobs.clone(),
        };
        in_flight.gauge.inc();
        let account = datagram.username.clone();
        self.context.dispatcher.route(account, async move {
            let _in_flight = in_flight;
            handlers::process(&ctx, datagram, from).await;
        });
    }
}

async fn recv_frame<S: DatagramSocket>(socket: &S) -> std::io::Result<(Vec<u8>, SocketAddr)> {
    let mut buf = [0u8; RECV_BUFFER_LEN];
    let (len, from) = socket.recv_from(&mut buf).await?;
    Ok((buf[..len].to_vec(), from))
}

fn spawn_sweeper<S: DatagramSocket>(
    ctx: Arc<NodeContext<S>>,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                _ = interval.tick() => {
                    let _span = tracing_spans::sweep_span().entered();
                    let stats = ctx.paths.sweep(Instant::now());
                    if stats.paths_removed > 0 || stats.tables_removed > 0 {
                        tracing::debug!(
                            paths = stats.paths_removed,
                            tables = stats.tables_removed,
                            "expired paths swept"
                        );
                    }
                    ctx.metrics.live_paths.set(ctx.paths.path_count() as i64);
                }
            }
        }
    })
}
