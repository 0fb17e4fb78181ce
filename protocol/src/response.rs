//! Signed replies from a server to its account owner.
//!
//! ```text
//! status(1) ‖ request counter(4) ‖ body(256) ‖ HMAC-SHA256(client key)(32)
//! ```

use ripple_crypto::{sign_message, verify_signature, MAC_LEN};
use ripple_types::{
    PaymentDirection, PaymentId, PeerAccount, SecretKey, ServerAddress, Username, NAME_LEN,
};

use crate::ProtocolError;

pub const RESPONSE_BODY_LEN: usize = 256;

const SIGNED_RESPONSE_LEN: usize = 1 + 4 + RESPONSE_BODY_LEN;

/// Total length of an encoded response.
pub const RESPONSE_LEN: usize = SIGNED_RESPONSE_LEN + MAC_LEN;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseStatus {
    Ok = 0,
    Error = 1,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientResponse {
    pub status: ResponseStatus,
    /// Counter of the request this answers.
    pub request_counter: u32,
    body: [u8; RESPONSE_BODY_LEN],
}

impl ClientResponse {
    pub fn ok(request_counter: u32, payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() > RESPONSE_BODY_LEN {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload.len(),
                max: RESPONSE_BODY_LEN,
            });
        }
        let mut body = [0u8; RESPONSE_BODY_LEN];
        body[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            status: ResponseStatus::Ok,
            request_counter,
            body,
        })
    }

    /// An error reply; messages longer than the body are truncated.
    pub fn error(request_counter: u32, message: &str) -> Self {
        let mut end = message.len().min(RESPONSE_BODY_LEN);
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        let mut body = [0u8; RESPONSE_BODY_LEN];
        body[..end].copy_from_slice(&message.as_bytes()[..end]);
        Self {
            status: ResponseStatus::Error,
            request_counter,
            body,
        }
    }

    pub fn body(&self) -> &[u8; RESPONSE_BODY_LEN] {
        &self.body
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }

    /// The error text of an error reply.
    pub fn error_message(&self) -> Option<String> {
        if self.is_ok() {
            return None;
        }
        let end = self
            .body
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(RESPONSE_BODY_LEN);
        Some(String::from_utf8_lossy(&self.body[..end]).into_owned())
    }

    /// Read a big-endian `u32` from the start of the body.
    pub fn body_u32(&self) -> u32 {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&self.body[..4]);
        u32::from_be_bytes(buf)
    }

    fn signed_bytes(&self) -> [u8; SIGNED_RESPONSE_LEN] {
        let mut out = [0u8; SIGNED_RESPONSE_LEN];
        out[0] = self.status as u8;
        out[1..5].copy_from_slice(&self.request_counter.to_be_bytes());
        out[5..].copy_from_slice(&self.body);
        out
    }

    pub fn encode(&self, key: &SecretKey) -> [u8; RESPONSE_LEN] {
        let signed = self.signed_bytes();
        let mut out = [0u8; RESPONSE_LEN];
        out[..SIGNED_RESPONSE_LEN].copy_from_slice(&signed);
        out[SIGNED_RESPONSE_LEN..].copy_from_slice(&sign_message(&signed, key));
        out
    }

    /// Decode and authenticate a response.
    pub fn decode(bytes: &[u8], key: &SecretKey) -> Result<Self, ProtocolError> {
        if bytes.len() != RESPONSE_LEN {
            return Err(ProtocolError::UnexpectedLength {
                expected: RESPONSE_LEN,
                actual: bytes.len(),
            });
        }
        let mut mac = [0u8; MAC_LEN];
        mac.copy_from_slice(&bytes[SIGNED_RESPONSE_LEN..]);
        if !verify_signature(&bytes[..SIGNED_RESPONSE_LEN], &mac, key) {
            return Err(ProtocolError::BadSignature);
        }
        let status = match bytes[0] {
            0 => ResponseStatus::Ok,
            1 => ResponseStatus::Error,
            other => return Err(ProtocolError::Malformed(format!("status byte {other}"))),
        };
        let mut counter = [0u8; 4];
        counter.copy_from_slice(&bytes[1..5]);
        let mut body = [0u8; RESPONSE_BODY_LEN];
        body.copy_from_slice(&bytes[5..SIGNED_RESPONSE_LEN]);
        Ok(Self {
            status,
            request_counter: u32::from_be_bytes(counter),
            body,
        })
    }
}

/// Body of a successful `GetPayment` reply.
///
/// ```text
/// counterparty username(32) ‖ counterparty server(32) ‖ direction(1)
/// ‖ amount(4) ‖ nonce(4) ‖ identifier(32) ‖ root depth(4) ‖ resolved(1)
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentReport {
    pub counterparty: PeerAccount,
    pub direction: PaymentDirection,
    pub amount: u32,
    pub nonce: u32,
    pub id: PaymentId,
    pub depth: u32,
    pub resolved: bool,
}

const REPORT_LEN: usize = 2 * NAME_LEN + 1 + 4 + 4 + 32 + 4 + 1;

impl PaymentReport {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(REPORT_LEN);
        out.extend_from_slice(&self.counterparty.username.to_padded());
        out.extend_from_slice(&self.counterparty.server.to_padded());
        out.push(self.direction.to_byte());
        out.extend_from_slice(&self.amount.to_be_bytes());
        out.extend_from_slice(&self.nonce.to_be_bytes());
        out.extend_from_slice(self.id.as_bytes());
        out.extend_from_slice(&self.depth.to_be_bytes());
        out.push(u8::from(self.resolved));
        out
    }

    pub fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        if body.len() < REPORT_LEN {
            return Err(ProtocolError::UnexpectedLength {
                expected: REPORT_LEN,
                actual: body.len(),
            });
        }
        let mut name = [0u8; NAME_LEN];
        name.copy_from_slice(&body[..NAME_LEN]);
        let username = Username::from_padded(&name).map_err(|source| {
            ProtocolError::InvalidField {
                field: "counterparty username",
                source,
            }
        })?;
        name.copy_from_slice(&body[NAME_LEN..2 * NAME_LEN]);
        let server = ServerAddress::from_padded(&name).map_err(|source| {
            ProtocolError::InvalidField {
                field: "counterparty server",
                source,
            }
        })?;
        let rest = &body[2 * NAME_LEN..];
        let direction =
            PaymentDirection::from_byte(rest[0]).map_err(|source| ProtocolError::InvalidField {
                field: "direction",
                source,
            })?;
        let u32_at = |offset: usize| {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(&rest[offset..offset + 4]);
            u32::from_be_bytes(buf)
        };
        let mut id = [0u8; 32];
        id.copy_from_slice(&rest[9..41]);
        Ok(Self {
            counterparty: PeerAccount::new(username, server),
            direction,
            amount: u32_at(1),
            nonce: u32_at(5),
            id: PaymentId::new(id),
            depth: u32_at(41),
            resolved: rest[45] != 0,
        })
    }
}
