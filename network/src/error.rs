use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("no acknowledgment from {target} after {attempts} attempts")]
    DeliveryFailed { target: SocketAddr, attempts: u32 },

    #[error("cannot resolve server address {0}")]
    Resolve(String),

    #[error("transport closed")]
    Closed,

    #[error("protocol error: {0}")]
    Protocol(#[from] ripple_protocol::ProtocolError),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for NetworkError {
    fn from(e: std::io::Error) -> Self {
        NetworkError::Io(e.to_string())
    }
}
