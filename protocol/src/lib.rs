//! Wire protocol: fixed-size signed datagrams, transport framing, argument
//! layouts and signed client responses.
//!
//! Every datagram is exactly [`DATAGRAM_LEN`] bytes, all integers are
//! big-endian, and the trailing MAC covers every byte before it.

pub mod args;
pub mod command;
pub mod datagram;
pub mod error;
pub mod frame;
pub mod response;

pub use args::{
    ArgumentLayout, Arguments, PathProbe, PathRecursion, PaymentRequest, SyncEpoch,
    TrustlineAmount, TrustlineUpdate, ARGUMENTS_LEN,
};
pub use command::{ClientCommand, Command, CommandScope, PeerCommand, PEER_BIT};
pub use datagram::{Datagram, DATAGRAM_LEN, SIGNED_LEN};
pub use error::ProtocolError;
pub use frame::{Frame, ACK_LEN, DATAGRAM_FRAME_LEN, MESSAGE_ID_LEN};
pub use response::{ClientResponse, PaymentReport, ResponseStatus, RESPONSE_BODY_LEN, RESPONSE_LEN};

/// Default UDP port servers listen on.
pub const DEFAULT_PORT: u16 = 2012;
