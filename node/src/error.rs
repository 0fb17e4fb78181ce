use ripple_ledger::LedgerError;
use ripple_network::NetworkError;
use ripple_protocol::ProtocolError;
use ripple_store::{KeyScope, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metrics server error: {0}")]
    Metrics(String),
}

/// Why a datagram was refused before reaching its handler.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no {0}")]
    UnknownKey(KeyScope),

    #[error("unknown account {0}")]
    UnknownAccount(String),

    #[error("unknown relation {0}")]
    UnknownRelation(String),

    #[error("bad signature")]
    BadSignature,

    #[error("replayed counter {counter} (last seen {last_seen})")]
    Replay { counter: u32, last_seen: u32 },

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl AuthError {
    pub fn is_replay(&self) -> bool {
        matches!(self, Self::Replay { .. })
    }
}

/// Failure of a command handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Validation(String),

    #[error("replayed counter {counter} (last seen {last_seen})")]
    Replay { counter: u32, last_seen: u32 },

    #[error("delivery failed: {0}")]
    Transport(#[from] NetworkError),

    #[error("storage error: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for HandlerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => Self::Validation(format!("unknown {what}")),
            other => Self::Storage(other),
        }
    }
}

impl From<LedgerError> for HandlerError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Replay { counter, last_seen } => Self::Replay { counter, last_seen },
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<ProtocolError> for HandlerError {
    fn from(e: ProtocolError) -> Self {
        Self::Validation(e.to_string())
    }
}
