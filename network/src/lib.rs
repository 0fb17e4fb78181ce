//! Reliable datagram transport for the ripple trust network.
//!
//! UDP with per-message acknowledgments: every outbound message gets a
//! process-wide 4-byte id, is retransmitted with exponential backoff until
//! the matching ACK arrives or the importance tier's attempt budget runs
//! out, and every accepted inbound message is acknowledged immediately.

pub mod ack;
pub mod error;
pub mod resolve;
pub mod socket;
pub mod transport;

pub use ack::AckRegistry;
pub use error::NetworkError;
pub use resolve::resolve_server;
pub use socket::DatagramSocket;
pub use transport::{Importance, Inbound, ReliableTransport, RetryPolicy};
