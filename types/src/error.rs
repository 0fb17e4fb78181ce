//! Error type for constructing and decoding fundamental types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    #[error("name is {len} bytes, the limit is {max}")]
    NameTooLong { len: usize, max: usize },

    #[error("name contains a NUL byte")]
    EmbeddedNul,

    #[error("name is not valid UTF-8")]
    InvalidUtf8,

    #[error("unknown payment direction byte: {0}")]
    InvalidDirection(u8),
}
