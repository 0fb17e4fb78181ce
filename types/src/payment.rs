//! Payment identifiers and directions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// A 32-byte payment identifier, shared by both ends of a payment.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentId([u8; 32]);

impl PaymentId {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PaymentId({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Which end of a payment the local account is on, and which way a
/// path-finding probe travels.
///
/// `Outgoing` searches start at the payer and walk towards the payee;
/// `Incoming` searches start at the payee and walk towards the payer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentDirection {
    Incoming,
    Outgoing,
}

impl PaymentDirection {
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Incoming => 0,
            Self::Outgoing => 1,
        }
    }

    pub fn from_byte(byte: u8) -> Result<Self, TypesError> {
        match byte {
            0 => Ok(Self::Incoming),
            1 => Ok(Self::Outgoing),
            other => Err(TypesError::InvalidDirection(other)),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Incoming => Self::Outgoing,
            Self::Outgoing => Self::Incoming,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Incoming => "in",
            Self::Outgoing => "out",
        }
    }
}

impl fmt::Display for PaymentDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
