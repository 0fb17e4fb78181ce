use ripple_types::TypesError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("unexpected length: expected {expected} bytes, got {actual}")]
    UnexpectedLength { expected: usize, actual: usize },

    #[error("unknown command byte: {0:#04x}")]
    UnknownCommand(u8),

    #[error("invalid {field}: {source}")]
    InvalidField {
        field: &'static str,
        #[source]
        source: TypesError,
    },

    #[error("payload too large: {size} > {max}")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("MAC does not match")]
    BadSignature,

    #[error("malformed message: {0}")]
    Malformed(String),
}
