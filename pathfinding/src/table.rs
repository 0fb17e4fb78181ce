//! Per-account path table.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use ripple_types::PaymentId;

use crate::{Path, Payment};

/// Paths known to one account, plus at most one payment it is searching for.
#[derive(Debug)]
pub struct AccountPathTable {
    pub(crate) paths: HashMap<PaymentId, Path>,
    pub(crate) payment: Option<Payment>,
    pub(crate) expires_at: Instant,
    pub(crate) timeout: Duration,
}

impl AccountPathTable {
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            paths: HashMap::new(),
            payment: None,
            expires_at: now + timeout,
            timeout,
        }
    }

    pub fn path(&self, id: &PaymentId) -> Option<&Path> {
        self.paths.get(id)
    }

    pub fn payment(&self) -> Option<&Payment> {
        self.payment.as_ref()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Whether `id` is the payment this account is searching for.
    pub fn is_root(&self, id: &PaymentId) -> bool {
        self.payment.as_ref().is_some_and(|p| &p.id == id)
    }

    /// Extend the table's lifetime; never shortens it.
    pub fn refresh(&mut self, now: Instant) {
        let candidate = now + self.timeout;
        if candidate > self.expires_at {
            self.expires_at = candidate;
        }
    }

    /// Replace the account's payment with `payment` and start its root path.
    ///
    /// The previous payment's path and any stale path already recorded for
    /// the new identifier are discarded.
    pub fn start_payment(&mut self, payment: Payment, now: Instant) {
        if let Some(previous) = self.payment.take() {
            if previous.id != payment.id {
                tracing::debug!(payment = %previous.id, "replacing active payment");
            }
            self.paths.remove(&previous.id);
        }
        self.paths.remove(&payment.id);
        self.paths.insert(
            payment.id,
            Path::new(payment.id, payment.amount, now + self.timeout),
        );
        self.payment = Some(payment);
        self.refresh(now);
    }

    /// Drop expired paths, and the payment if its root path expired.
    ///
    /// Returns the number of paths removed.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let before = self.paths.len();
        self.paths.retain(|_, path| path.expires_at > now);
        if let Some(payment) = &self.payment {
            if !self.paths.contains_key(&payment.id) {
                tracing::debug!(payment = %payment.id, "payment search expired");
                self.payment = None;
            }
        }
        before - self.paths.len()
    }

    /// An empty, expired table can be dropped.
    pub fn is_idle(&self, now: Instant) -> bool {
        self.paths.is_empty() && self.payment.is_none() && self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_types::{PaymentDirection, PeerAccount, ServerAddress, Username};

    const TIMEOUT: Duration = Duration::from_secs(60);

    fn payment(byte: u8) -> Payment {
        Payment {
            id: PaymentId::new([byte; 32]),
            counterparty: PeerAccount::new(
                Username::new("payee").unwrap(),
                ServerAddress::new("b").unwrap(),
            ),
            direction: PaymentDirection::Outgoing,
            amount: 10,
            nonce: 1,
        }
    }

    #[test]
    fn start_payment_creates_root_path() {
        let now = Instant::now();
        let mut table = AccountPathTable::new(TIMEOUT, now);
        table.start_payment(payment(1), now);
        let id = PaymentId::new([1; 32]);
        assert!(table.is_root(&id));
        let root = table.path(&id).unwrap();
        assert_eq!(root.depth, 0);
        assert!(root.incoming.is_none() && root.outgoing.is_none());
    }

    #[test]
    fn new_payment_discards_previous_path() {
        let now = Instant::now();
        let mut table = AccountPathTable::new(TIMEOUT, now);
        table.start_payment(payment(1), now);
        table.start_payment(payment(2), now);
        assert!(table.path(&PaymentId::new([1; 32])).is_none());
        assert!(table.is_root(&PaymentId::new([2; 32])));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn restarting_same_payment_resets_its_path() {
        let now = Instant::now();
        let mut table = AccountPathTable::new(TIMEOUT, now);
        table.start_payment(payment(1), now);
        let id = PaymentId::new([1; 32]);
        table.paths.get_mut(&id).unwrap().depth = 4;
        table.start_payment(payment(1), now);
        assert_eq!(table.path(&id).unwrap().depth, 0);
    }

    #[test]
    fn sweep_drops_expired_paths_and_orphaned_payment() {
        let now = Instant::now();
        let mut table = AccountPathTable::new(TIMEOUT, now);
        table.start_payment(payment(1), now);
        assert_eq!(table.sweep(now + TIMEOUT / 2), 0);
        assert_eq!(table.sweep(now + TIMEOUT), 1);
        assert!(table.payment().is_none());
        assert!(table.is_idle(now + TIMEOUT));
    }

    #[test]
    fn refresh_never_shortens() {
        let now = Instant::now();
        let mut table = AccountPathTable::new(TIMEOUT, now + TIMEOUT);
        let before = table.expires_at();
        table.refresh(now);
        assert_eq!(table.expires_at(), before);
        table.refresh(now + TIMEOUT * 2);
        assert!(table.expires_at() > before);
    }
}
