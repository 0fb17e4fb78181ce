//! Trustline ledger.
//!
//! Pure state transitions over [`PeerRelation`] records: the epoch-based
//! sync protocol that keeps `trustline_out` consistent with the peer's copy,
//! spendable capacity, and replay counters. Nothing here performs I/O;
//! callers load a record, apply transitions and persist it in one write.
//!
//! [`PeerRelation`]: ripple_store::PeerRelation

pub mod capacity;
pub mod counter;
pub mod error;
pub mod sync;

pub use capacity::{available, has_capacity};
pub use counter::{advance_counter, check_counter, next_send_counter};
pub use error::LedgerError;
pub use sync::{
    acknowledge, answer_pull, apply_push, plan_push, set_trustline_out, sync_state, touch,
    SyncAction, SyncState, TrustlineValue,
};
