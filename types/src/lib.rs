//! Fundamental types for the ripple trust network.
//!
//! This crate defines the identifiers shared across every other crate in the
//! workspace: fixed-width account and server names, peer relations, payment
//! identifiers, shared secrets and timestamps.

pub mod account;
pub mod error;
pub mod keys;
pub mod name;
pub mod payment;
pub mod time;

pub use account::{PeerAccount, RelationKey};
pub use error::TypesError;
pub use keys::SecretKey;
pub use name::{ServerAddress, Username, NAME_LEN};
pub use payment::{PaymentDirection, PaymentId};
pub use time::Timestamp;
