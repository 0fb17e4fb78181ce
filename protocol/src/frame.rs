//! Transport framing.
//!
//! Every reliable message is prefixed with a 4-byte big-endian message id.
//! A frame consisting of the id alone is an acknowledgment for that id.

use crate::{ProtocolError, DATAGRAM_LEN};

pub const MESSAGE_ID_LEN: usize = 4;

/// Length of an acknowledgment frame.
pub const ACK_LEN: usize = MESSAGE_ID_LEN;

/// Length of a frame carrying a datagram.
pub const DATAGRAM_FRAME_LEN: usize = MESSAGE_ID_LEN + DATAGRAM_LEN;

/// A received transport frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Frame<'a> {
    Ack(u32),
    Message { id: u32, payload: &'a [u8] },
}

impl<'a> Frame<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < MESSAGE_ID_LEN {
            return Err(ProtocolError::UnexpectedLength {
                expected: MESSAGE_ID_LEN,
                actual: bytes.len(),
            });
        }
        let mut id = [0u8; MESSAGE_ID_LEN];
        id.copy_from_slice(&bytes[..MESSAGE_ID_LEN]);
        let id = u32::from_be_bytes(id);
        if bytes.len() == ACK_LEN {
            Ok(Self::Ack(id))
        } else {
            Ok(Self::Message {
                id,
                payload: &bytes[MESSAGE_ID_LEN..],
            })
        }
    }

    pub fn encode_ack(id: u32) -> [u8; ACK_LEN] {
        id.to_be_bytes()
    }

    pub fn encode_message(id: u32, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(MESSAGE_ID_LEN + payload.len());
        out.extend_from_slice(&id.to_be_bytes());
        out.extend_from_slice(payload);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_bytes_is_an_ack() {
        let bytes = Frame::encode_ack(0x0102_0304);
        assert_eq!(Frame::parse(&bytes), Ok(Frame::Ack(0x0102_0304)));
    }

    #[test]
    fn message_frame_splits_id_and_payload() {
        let bytes = Frame::encode_message(9, &[0xaa; DATAGRAM_LEN]);
        assert_eq!(bytes.len(), DATAGRAM_FRAME_LEN);
        match Frame::parse(&bytes).unwrap() {
            Frame::Message { id, payload } => {
                assert_eq!(id, 9);
                assert_eq!(payload.len(), DATAGRAM_LEN);
            }
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[test]
    fn runt_frame_rejected() {
        assert!(Frame::parse(&[1, 2]).is_err());
    }
}
