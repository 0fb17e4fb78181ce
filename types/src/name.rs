//! Fixed-width, NUL-padded names used on the wire.
//!
//! Every account name and server address occupies exactly [`NAME_LEN`]
//! bytes in a datagram. Shorter values are padded with NUL bytes, so a
//! valid name can never contain a NUL itself.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// Width of a name field in a datagram.
pub const NAME_LEN: usize = 32;

fn validate(value: &str) -> Result<(), TypesError> {
    if value.len() > NAME_LEN {
        return Err(TypesError::NameTooLong {
            len: value.len(),
            max: NAME_LEN,
        });
    }
    if value.as_bytes().contains(&0) {
        return Err(TypesError::EmbeddedNul);
    }
    Ok(())
}

fn from_padded(bytes: &[u8; NAME_LEN]) -> Result<String, TypesError> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
    if bytes[end..].iter().any(|&b| b != 0) {
        return Err(TypesError::EmbeddedNul);
    }
    std::str::from_utf8(&bytes[..end])
        .map(str::to_owned)
        .map_err(|_| TypesError::InvalidUtf8)
}

fn to_padded(value: &str) -> [u8; NAME_LEN] {
    let mut out = [0u8; NAME_LEN];
    out[..value.len()].copy_from_slice(value.as_bytes());
    out
}

macro_rules! fixed_name {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap a name.
            pub fn new(value: impl Into<String>) -> Result<Self, TypesError> {
                let value = value.into();
                validate(&value)?;
                Ok(Self(value))
            }

            /// Decode a NUL-padded wire field.
            pub fn from_padded(bytes: &[u8; NAME_LEN]) -> Result<Self, TypesError> {
                from_padded(bytes).map(Self)
            }

            /// Encode as a NUL-padded wire field.
            pub fn to_padded(&self) -> [u8; NAME_LEN] {
                to_padded(&self.0)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = TypesError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = TypesError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.0
            }
        }
    };
}

fixed_name!(
    /// A local or remote account name.
    Username
);

fixed_name!(
    /// The address of the server hosting an account.
    ///
    /// Either a bare host (the default port is appended when resolving) or
    /// an explicit `host:port`.
    ServerAddress
);
