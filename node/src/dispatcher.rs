//! Per-account serialization of handler work.
//!
//! Every account has at most one job running at a time. Jobs routed to a
//! busy account wait in a FIFO queue and start, in arrival order, as soon as
//! the previous one finishes. Accounts never wait on each other.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ripple_types::Username;

/// A unit of work bound to one account.
pub type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// An account with a slot entry is busy; its deque holds the jobs waiting
/// behind the running one.
type Slots = HashMap<Username, VecDeque<Job>>;

#[derive(Clone, Default)]
pub struct SessionDispatcher {
    slots: Arc<Mutex<Slots>>,
}

fn lock(slots: &Mutex<Slots>) -> MutexGuard<'_, Slots> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `job` now if `account` is idle, otherwise queue it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn route<F>(&self, account: Username, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let job: Job = Box::pin(job);
        {
            let mut slots = lock(&self.slots);
            if let Some(queue) = slots.get_mut(&account) {
                queue.push_back(job);
                return;
            }
            slots.insert(account.clone(), VecDeque::new());
        }
        tokio::spawn(drive(Arc::clone(&self.slots), account, job));
    }

    /// Whether a job for `account` is running.
    pub fn is_busy(&self, account: &Username) -> bool {
        lock(&self.slots).contains_key(account)
    }

    /// Jobs waiting behind the running one for `account`.
    pub fn queued(&self, account: &Username) -> usize {
        lock(&self.slots).get(account).map_or(0, VecDeque::len)
    }

    pub fn busy_accounts(&self) -> usize {
        lock(&self.slots).len()
    }
}

/// Run jobs for one account until its queue is empty.
///
/// Each job runs in its own task so a panic is contained there and the
/// queue still advances.
async fn drive(slots: Arc<Mutex<Slots>>, account: Username, first: Job) {
    let mut job = first;
    loop {
        if let Err(e) = tokio::spawn(job).await {
            if e.is_panic() {
                tracing::error!(%account, "job panicked");
            } else {
                tracing::warn!(%account, error = %e, "job cancelled");
            }
        }
        let mut guard = lock(&slots);
        match guard.get_mut(&account).and_then(VecDeque::pop_front) {
            Some(next) => job = next,
            None => {
                guard.remove(&account);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn user(name: &str) -> Username {
        Username::new(name).unwrap()
    }

    async fn settle(dispatcher: &SessionDispatcher) {
        for _ in 0..200 {
            if dispatcher.busy_accounts() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("dispatcher did not go idle");
    }

    #[tokio::test]
    async fn jobs_for_one_account_run_in_arrival_order() {
        let dispatcher = SessionDispatcher::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let (release, gate) = oneshot::channel::<()>();

        {
            let order = Arc::clone(&order);
            dispatcher.route(user("alice"), async move {
                let _ = gate.await;
                order.lock().unwrap().push(0);
            });
        }
        for i in 1..=5 {
            let order = Arc::clone(&order);
            dispatcher.route(user("alice"), async move {
                order.lock().unwrap().push(i);
            });
        }
        assert_eq!(dispatcher.queued(&user("alice")), 5);

        release.send(()).unwrap();
        settle(&dispatcher).await;
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn at_most_one_job_per_account_runs() {
        let dispatcher = SessionDispatcher::new();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..20 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            dispatcher.route(user("alice"), async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(1)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            });
        }
        settle(&dispatcher).await;
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn busy_account_does_not_block_others() {
        let dispatcher = SessionDispatcher::new();
        let (_hold, gate) = oneshot::channel::<()>();
        dispatcher.route(user("alice"), async move {
            let _ = gate.await;
        });

        let (done_tx, done_rx) = oneshot::channel();
        dispatcher.route(user("bob"), async move {
            let _ = done_tx.send(());
        });
        tokio::time::timeout(Duration::from_secs(1), done_rx)
            .await
            .expect("bob's job should run while alice is busy")
            .unwrap();
        assert!(dispatcher.is_busy(&user("alice")));
    }

    #[tokio::test]
    async fn panicking_job_does_not_stall_the_queue() {
        let dispatcher = SessionDispatcher::new();
        let ran = Arc::new(AtomicUsize::new(0));

        dispatcher.route(user("alice"), async { panic!("handler bug") });
        {
            let ran = Arc::clone(&ran);
            dispatcher.route(user("alice"), async move {
                ran.fetch_add(1, Ordering::SeqCst);
            });
        }
        settle(&dispatcher).await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert!(!dispatcher.is_busy(&user("alice")));
    }
}
