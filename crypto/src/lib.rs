//! Cryptographic primitives for the ripple trust network.
//!
//! - **HMAC-SHA256** authenticates every datagram and client response with a
//!   shared secret (client key or relation key)
//! - **SHA-256** derives payment identifiers

pub mod hash;
pub mod sign;

pub use hash::{sha256, sha256_multi};
pub use sign::{sign_message, verify_signature, MAC_LEN};
