//! Process-wide registry of per-account path tables.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use ripple_types::{PaymentId, Username};

use crate::{
    AccountPathTable, Path, Payment, Probe, ProbeOutcome, RecurseOutcome, RecurseRejection,
};

/// Snapshot of an account's active payment search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentStatus {
    pub payment: Payment,
    /// Depth of the root path.
    pub depth: u32,
    /// Whether the opposite search has reached the root.
    pub resolved: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub paths_removed: usize,
    pub tables_removed: usize,
}

/// Owns every account's [`AccountPathTable`].
///
/// Each call takes the lock for one short, non-suspending critical section.
/// Per-account ordering comes from the session dispatcher, not from here.
pub struct PathManager {
    tables: Mutex<HashMap<Username, AccountPathTable>>,
    timeout: Duration,
}

impl PathManager {
    pub fn new(timeout: Duration) -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Username, AccountPathTable>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_table<R>(
        &self,
        account: &Username,
        now: Instant,
        f: impl FnOnce(&mut AccountPathTable) -> R,
    ) -> R {
        let mut tables = self.lock();
        let table = tables
            .entry(account.clone())
            .or_insert_with(|| AccountPathTable::new(self.timeout, now));
        table.refresh(now);
        f(table)
    }

    pub fn start_payment(&self, account: &Username, payment: Payment, now: Instant) {
        self.with_table(account, now, |table| table.start_payment(payment, now));
    }

    /// Decide what `probe` does to `account`'s table without changing it.
    pub fn plan_probe(&self, account: &Username, probe: &Probe) -> ProbeOutcome {
        match self.lock().get(account) {
            Some(table) => table.plan_probe(probe),
            None => ProbeOutcome::Joined,
        }
    }

    pub fn apply_probe(
        &self,
        account: &Username,
        probe: Probe,
        outcome: &ProbeOutcome,
        now: Instant,
    ) {
        self.with_table(account, now, |table| table.apply_probe(probe, outcome, now));
    }

    /// Decide what a recursion does to `account`'s table without changing it.
    pub fn plan_recurse(&self, account: &Username, id: PaymentId, depth: u32) -> RecurseOutcome {
        match self.lock().get(account) {
            Some(table) => table.plan_recurse(id, depth),
            None => RecurseOutcome::Rejected(RecurseRejection::UnknownPath),
        }
    }

    pub fn apply_recurse(
        &self,
        account: &Username,
        id: PaymentId,
        outcome: &RecurseOutcome,
        now: Instant,
    ) {
        self.with_table(account, now, |table| table.apply_recurse(id, outcome, now));
    }

    pub fn payment_status(&self, account: &Username) -> Option<PaymentStatus> {
        let tables = self.lock();
        let table = tables.get(account)?;
        let payment = table.payment()?.clone();
        let root = table.path(&payment.id)?;
        Some(PaymentStatus {
            depth: root.depth,
            resolved: root.committed,
            payment,
        })
    }

    /// Copy of one path, for inspection.
    pub fn path(&self, account: &Username, id: &PaymentId) -> Option<Path> {
        self.lock().get(account)?.path(id).cloned()
    }

    pub fn path_count(&self) -> usize {
        self.lock().values().map(AccountPathTable::len).sum()
    }

    /// Drop expired paths and idle tables.
    pub fn sweep(&self, now: Instant) -> SweepStats {
        let mut tables = self.lock();
        let mut stats = SweepStats::default();
        for table in tables.values_mut() {
            stats.paths_removed += table.sweep(now);
        }
        let before = tables.len();
        tables.retain(|_, table| !table.is_idle(now));
        stats.tables_removed = before - tables.len();
        stats
    }
}
