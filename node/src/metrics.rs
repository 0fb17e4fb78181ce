//! Prometheus metrics for the node.
//!
//! The [`NodeMetrics`] struct owns a dedicated [`Registry`]; when enabled,
//! [`serve_metrics`] exposes it in the text exposition format on
//! `GET /metrics`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Router};
use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge,
    Opts, Registry, TextEncoder,
};
use tokio::sync::broadcast;

use crate::NodeError;

/// Central collection of all node-level Prometheus metrics.
pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Datagram frames received (ACK frames excluded).
    pub datagrams_received: IntCounter,
    /// ACKs sent for accepted datagrams.
    pub acks_sent: IntCounter,
    /// Datagrams rejected because their counter was not fresh.
    pub replays_rejected: IntCounter,
    /// Datagrams that failed decoding, key lookup or signature checks.
    pub auth_failures: IntCounter,
    /// Sends that exhausted their retry budget.
    pub delivery_failures: IntCounter,
    /// Handlers that returned an error.
    pub handler_errors: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Jobs queued or running in the dispatcher.
    pub in_flight_jobs: IntGauge,
    /// Paths held across all accounts.
    pub live_paths: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Time spent in a handler, in milliseconds.
    pub handler_time_ms: Histogram,
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let datagrams_received = register_int_counter_with_registry!(
            Opts::new(
                "ripple_datagrams_received_total",
                "Datagram frames received"
            ),
            registry
        )
        .expect("failed to register datagrams_received counter");

        let acks_sent = register_int_counter_with_registry!(
            Opts::new("ripple_acks_sent_total", "ACKs sent for accepted datagrams"),
            registry
        )
        .expect("failed to register acks_sent counter");

        let replays_rejected = register_int_counter_with_registry!(
            Opts::new(
                "ripple_replays_rejected_total",
                "Datagrams rejected for a stale counter"
            ),
            registry
        )
        .expect("failed to register replays_rejected counter");

        let auth_failures = register_int_counter_with_registry!(
            Opts::new(
                "ripple_auth_failures_total",
                "Datagrams failing authentication"
            ),
            registry
        )
        .expect("failed to register auth_failures counter");

        let delivery_failures = register_int_counter_with_registry!(
            Opts::new(
                "ripple_delivery_failures_total",
                "Sends that exhausted their retries"
            ),
            registry
        )
        .expect("failed to register delivery_failures counter");

        let handler_errors = register_int_counter_with_registry!(
            Opts::new("ripple_handler_errors_total", "Handlers that failed"),
            registry
        )
        .expect("failed to register handler_errors counter");

        let in_flight_jobs = register_int_gauge_with_registry!(
            Opts::new("ripple_in_flight_jobs", "Jobs queued or running"),
            registry
        )
        .expect("failed to register in_flight_jobs gauge");

        let live_paths = register_int_gauge_with_registry!(
            Opts::new("ripple_live_paths", "Paths held across all accounts"),
            registry
        )
        .expect("failed to register live_paths gauge");

        // 0.1 ms → ~1.6 s
        let handler_time_ms = register_histogram_with_registry!(
            HistogramOpts::new("ripple_handler_time_ms", "Handler time in milliseconds")
                .buckets(prometheus::exponential_buckets(0.1, 2.0, 15).unwrap()),
            registry
        )
        .expect("failed to register handler_time_ms histogram");

        Self {
            registry,
            datagrams_received,
            acks_sent,
            replays_rejected,
            auth_failures,
            delivery_failures,
            handler_errors,
            in_flight_jobs,
            live_paths,
            handler_time_ms,
        }
    }

    /// Encode every registered metric in the Prometheus text format.
    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| NodeError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| NodeError::Metrics(e.to_string()))
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

async fn metrics_handler(State(metrics): State<Arc<NodeMetrics>>) -> (StatusCode, String) {
    match metrics.encode() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Serve `GET /metrics` until shutdown is broadcast.
pub async fn serve_metrics(
    metrics: Arc<NodeMetrics>,
    addr: SocketAddr,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), NodeError> {
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "metrics server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;
    Ok(())
}
