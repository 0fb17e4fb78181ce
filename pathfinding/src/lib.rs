//! Distributed path finding.
//!
//! A payment is searched for from both ends at once. The payer floods
//! `Outgoing` probes, the payee floods `Incoming` probes, and every node the
//! probes reach remembers only its immediate neighbours on the route (the
//! `incoming` and `outgoing` slots of a [`Path`]). Searches deepen one hop at
//! a time: each newly reached node answers with a depth-0 recursion that
//! walks back to the root, and the root floods again. Where the two
//! searches meet, the node announces the route to both neighbours and the
//! announcement travels on until it reaches both roots.
//!
//! This crate holds the in-memory state and the decision rules; sending the
//! resulting probes is the caller's job.

pub mod engine;
pub mod identifier;
pub mod manager;
pub mod path;
pub mod table;

pub use engine::{
    Announcement, IgnoreReason, Probe, ProbeOutcome, RecurseOutcome, RecurseRejection,
};
pub use identifier::payment_id;
pub use manager::{PathManager, PaymentStatus, SweepStats};
pub use path::{Path, Payment};
pub use table::AccountPathTable;
