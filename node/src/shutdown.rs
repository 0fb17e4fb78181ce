//! Graceful shutdown for the node.
//!
//! The first SIGINT/SIGTERM broadcasts a shutdown signal to all subsystems
//! via a `tokio::sync::broadcast` channel. The server then drains: it stops
//! taking new datagrams and waits on a [`WaitGroup`] of in-flight jobs.
//! Repeated signals past a configured count force an immediate exit.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::signal;
use tokio::sync::{broadcast, Notify};

/// What the process should do after receiving a shutdown signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First signal: start draining.
    Drain,
    /// Already draining; keep waiting.
    Wait,
    /// Too many signals: exit now.
    ForceExit,
}

/// Coordinates graceful shutdown across all node subsystems.
///
/// Subsystems call [`subscribe`](Self::subscribe) to get a receiver, then
/// `select!` on it alongside their main loop. When shutdown is triggered
/// (either by OS signal or programmatically), every receiver is notified.
#[derive(Clone)]
pub struct ShutdownController {
    tx: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
    signals: Arc<AtomicU32>,
    force_exit_signals: u32,
}

impl ShutdownController {
    pub fn new(force_exit_signals: u32) -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: Arc::new(AtomicBool::new(false)),
            signals: Arc::new(AtomicU32::new(0)),
            force_exit_signals: force_exit_signals.max(1),
        }
    }

    /// Get a receiver that will be notified on shutdown.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger shutdown programmatically.
    pub fn shutdown(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        let _ = self.tx.send(());
    }

    /// Whether shutdown has been triggered. Check after subscribing to
    /// catch a shutdown that happened before the subscription.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Count one shutdown signal and decide what to do about it.
    pub fn on_signal(&self) -> SignalAction {
        let seen = self.signals.fetch_add(1, Ordering::SeqCst) + 1;
        if seen >= self.force_exit_signals {
            SignalAction::ForceExit
        } else if seen == 1 {
            self.shutdown();
            SignalAction::Drain
        } else {
            SignalAction::Wait
        }
    }

    /// Wait for the next SIGTERM or SIGINT. Returns the signal's name.
    pub async fn next_signal() -> &'static str {
        let ctrl_c = signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => "SIGINT",
            _ = terminate => "SIGTERM",
        }
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new(9)
    }
}

/// Counts in-flight jobs so shutdown can wait for them to finish.
#[derive(Clone, Default)]
pub struct WaitGroup {
    inner: Arc<WaitGroupInner>,
}

#[derive(Default)]
struct WaitGroupInner {
    count: AtomicUsize,
    idle: Notify,
}

/// Marks one job as in flight until dropped.
pub struct WaitGuard {
    group: WaitGroup,
}

impl WaitGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&self) -> WaitGuard {
        self.inner.count.fetch_add(1, Ordering::SeqCst);
        WaitGuard {
            group: self.clone(),
        }
    }

    pub fn count(&self) -> usize {
        self.inner.count.load(Ordering::SeqCst)
    }

    /// Resolve once no job is in flight.
    pub async fn wait(&self) {
        loop {
            let idle = self.inner.idle.notified();
            if self.count() == 0 {
                return;
            }
            idle.await;
        }
    }
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        if self.group.inner.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.group.inner.idle.notify_waiters();
        }
    }
}
