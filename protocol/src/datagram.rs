//! The fixed-size signed datagram.
//!
//! ```text
//! offset  len  field
//!      0    1  command
//!      1   32  username             (recipient account on this server)
//!     33   32  peer username        (counterparty account)
//!     65   32  peer server address  (counterparty's server)
//!     97  256  arguments
//!    353    4  counter              (BE, strictly increasing per scope)
//!    357   32  signature            (HMAC-SHA256 over bytes 0..357)
//! ```

use ripple_crypto::{sign_message, verify_signature, MAC_LEN};
use ripple_types::{PeerAccount, RelationKey, SecretKey, ServerAddress, Username, NAME_LEN};

use crate::{Arguments, Command, ProtocolError, ARGUMENTS_LEN};

const USERNAME_OFFSET: usize = 1;
const PEER_USERNAME_OFFSET: usize = USERNAME_OFFSET + NAME_LEN;
const PEER_SERVER_OFFSET: usize = PEER_USERNAME_OFFSET + NAME_LEN;
const ARGUMENTS_OFFSET: usize = PEER_SERVER_OFFSET + NAME_LEN;
const COUNTER_OFFSET: usize = ARGUMENTS_OFFSET + ARGUMENTS_LEN;
const SIGNATURE_OFFSET: usize = COUNTER_OFFSET + 4;

/// Number of bytes covered by the signature.
pub const SIGNED_LEN: usize = SIGNATURE_OFFSET;

/// Total datagram length.
pub const DATAGRAM_LEN: usize = SIGNATURE_OFFSET + MAC_LEN;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Datagram {
    pub command: Command,
    pub username: Username,
    pub peer_username: Username,
    pub peer_server_address: ServerAddress,
    pub arguments: Arguments,
    pub counter: u32,
    pub signature: [u8; MAC_LEN],
}

impl Datagram {
    /// Build an unsigned datagram addressed to `username` on behalf of `peer`.
    pub fn new(
        command: impl Into<Command>,
        username: Username,
        peer: PeerAccount,
        arguments: Arguments,
        counter: u32,
    ) -> Self {
        Self {
            command: command.into(),
            username,
            peer_username: peer.username,
            peer_server_address: peer.server,
            arguments,
            counter,
            signature: [0u8; MAC_LEN],
        }
    }

    /// The counterparty named by the peer fields.
    pub fn peer(&self) -> PeerAccount {
        PeerAccount::new(self.peer_username.clone(), self.peer_server_address.clone())
    }

    /// The relation between the addressed account and the counterparty.
    pub fn relation_key(&self) -> RelationKey {
        RelationKey::new(self.username.clone(), self.peer())
    }

    fn signed_bytes(&self) -> [u8; SIGNED_LEN] {
        let mut out = [0u8; SIGNED_LEN];
        out[0] = self.command.to_byte();
        out[USERNAME_OFFSET..PEER_USERNAME_OFFSET].copy_from_slice(&self.username.to_padded());
        out[PEER_USERNAME_OFFSET..PEER_SERVER_OFFSET]
            .copy_from_slice(&self.peer_username.to_padded());
        out[PEER_SERVER_OFFSET..ARGUMENTS_OFFSET]
            .copy_from_slice(&self.peer_server_address.to_padded());
        out[ARGUMENTS_OFFSET..COUNTER_OFFSET].copy_from_slice(self.arguments.as_bytes());
        out[COUNTER_OFFSET..SIGNATURE_OFFSET].copy_from_slice(&self.counter.to_be_bytes());
        out
    }

    /// Compute and store the signature under `key`.
    pub fn sign(&mut self, key: &SecretKey) {
        self.signature = sign_message(&self.signed_bytes(), key);
    }

    /// Builder-style [`Datagram::sign`].
    pub fn signed(mut self, key: &SecretKey) -> Self {
        self.sign(key);
        self
    }

    /// Check the stored signature in constant time.
    ///
    /// Decoding is canonical, so re-encoding the fields reproduces the
    /// received bytes exactly.
    pub fn verify(&self, key: &SecretKey) -> bool {
        verify_signature(&self.signed_bytes(), &self.signature, key)
    }

    pub fn encode(&self) -> [u8; DATAGRAM_LEN] {
        let mut out = [0u8; DATAGRAM_LEN];
        out[..SIGNED_LEN].copy_from_slice(&self.signed_bytes());
        out[SIGNATURE_OFFSET..].copy_from_slice(&self.signature);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() != DATAGRAM_LEN {
            return Err(ProtocolError::UnexpectedLength {
                expected: DATAGRAM_LEN,
                actual: bytes.len(),
            });
        }
        let command = Command::from_byte(bytes[0])?;
        let username = Username::from_padded(&name_field(bytes, USERNAME_OFFSET))
            .map_err(|source| ProtocolError::InvalidField {
                field: "username",
                source,
            })?;
        let peer_username = Username::from_padded(&name_field(bytes, PEER_USERNAME_OFFSET))
            .map_err(|source| ProtocolError::InvalidField {
                field: "peer username",
                source,
            })?;
        let peer_server_address =
            ServerAddress::from_padded(&name_field(bytes, PEER_SERVER_OFFSET)).map_err(
                |source| ProtocolError::InvalidField {
                    field: "peer server address",
                    source,
                },
            )?;

        let mut arguments = [0u8; ARGUMENTS_LEN];
        arguments.copy_from_slice(&bytes[ARGUMENTS_OFFSET..COUNTER_OFFSET]);
        let mut counter = [0u8; 4];
        counter.copy_from_slice(&bytes[COUNTER_OFFSET..SIGNATURE_OFFSET]);
        let mut signature = [0u8; MAC_LEN];
        signature.copy_from_slice(&bytes[SIGNATURE_OFFSET..]);

        Ok(Self {
            command,
            username,
            peer_username,
            peer_server_address,
            arguments: Arguments::from_bytes(arguments),
            counter: u32::from_be_bytes(counter),
            signature,
        })
    }
}

fn name_field(bytes: &[u8], offset: usize) -> [u8; NAME_LEN] {
    let mut field = [0u8; NAME_LEN];
    field.copy_from_slice(&bytes[offset..offset + NAME_LEN]);
    field
}
