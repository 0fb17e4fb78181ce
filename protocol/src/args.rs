//! The 256-byte argument field and the typed layouts carried in it.
//!
//! Unused trailing bytes are zero. Every layout reads only its own prefix,
//! so decoding a layout never fails.

use ripple_types::PaymentId;

/// Width of the argument field.
pub const ARGUMENTS_LEN: usize = 256;

/// The raw argument field of a datagram.
#[derive(Clone, PartialEq, Eq)]
pub struct Arguments([u8; ARGUMENTS_LEN]);

impl Arguments {
    pub fn zeroed() -> Self {
        Self([0u8; ARGUMENTS_LEN])
    }

    pub fn from_bytes(bytes: [u8; ARGUMENTS_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ARGUMENTS_LEN] {
        &self.0
    }

    pub fn read_u32(&self, offset: usize) -> u32 {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&self.0[offset..offset + 4]);
        u32::from_be_bytes(buf)
    }

    pub fn write_u32(&mut self, offset: usize, value: u32) {
        self.0[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
    }

    pub fn read_array<const N: usize>(&self, offset: usize) -> [u8; N] {
        let mut buf = [0u8; N];
        buf.copy_from_slice(&self.0[offset..offset + N]);
        buf
    }

    pub fn write_bytes(&mut self, offset: usize, bytes: &[u8]) {
        self.0[offset..offset + bytes.len()].copy_from_slice(bytes);
    }
}

impl Default for Arguments {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl std::fmt::Debug for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used = self
            .0
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |last| last + 1);
        write!(f, "Arguments({:02x?})", &self.0[..used])
    }
}

/// A typed view over the argument field.
pub trait ArgumentLayout: Sized {
    fn encode(&self) -> Arguments;
    fn decode(args: &Arguments) -> Self;
}

/// Client `SetTrustline`: the new outgoing trustline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrustlineAmount {
    pub amount: u32,
}

/// Client `NewPaymentOut` / `NewPaymentIn`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaymentRequest {
    pub amount: u32,
    pub nonce: u32,
}

impl PaymentRequest {
    /// The bytes that enter the payment identifier, in wire order.
    pub fn identifier_suffix(&self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[..4].copy_from_slice(&self.amount.to_be_bytes());
        out[4..].copy_from_slice(&self.nonce.to_be_bytes());
        out
    }
}

/// A trustline sync epoch: peer `GetTrustline` (the requester's `sync_in`)
/// and peer `SetSyncOut` (the epoch being acknowledged).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncEpoch {
    pub epoch: u32,
}

/// Peer `SetTrustline`: a trustline value and the epoch it belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrustlineUpdate {
    pub amount: u32,
    pub epoch: u32,
}

/// Peer `FindPathOut` / `FindPathIn`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathProbe {
    pub id: PaymentId,
    pub amount: u32,
}

/// Peer `PathRecurse`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathRecursion {
    pub id: PaymentId,
    pub depth: u32,
}

impl ArgumentLayout for TrustlineAmount {
    fn encode(&self) -> Arguments {
        let mut args = Arguments::zeroed();
        args.write_u32(0, self.amount);
        args
    }

    fn decode(args: &Arguments) -> Self {
        Self {
            amount: args.read_u32(0),
        }
    }
}

impl ArgumentLayout for PaymentRequest {
    fn encode(&self) -> Arguments {
        let mut args = Arguments::zeroed();
        args.write_u32(0, self.amount);
        args.write_u32(4, self.nonce);
        args
    }

    fn decode(args: &Arguments) -> Self {
        Self {
            amount: args.read_u32(0),
            nonce: args.read_u32(4),
        }
    }
}

impl ArgumentLayout for SyncEpoch {
    fn encode(&self) -> Arguments {
        let mut args = Arguments::zeroed();
        args.write_u32(0, self.epoch);
        args
    }

    fn decode(args: &Arguments) -> Self {
        Self {
            epoch: args.read_u32(0),
        }
    }
}

impl ArgumentLayout for TrustlineUpdate {
    fn encode(&self) -> Arguments {
        let mut args = Arguments::zeroed();
        args.write_u32(0, self.amount);
        args.write_u32(4, self.epoch);
        args
    }

    fn decode(args: &Arguments) -> Self {
        Self {
            amount: args.read_u32(0),
            epoch: args.read_u32(4),
        }
    }
}

impl ArgumentLayout for PathProbe {
    fn encode(&self) -> Arguments {
        let mut args = Arguments::zeroed();
        args.write_bytes(0, self.id.as_bytes());
        args.write_u32(32, self.amount);
        args
    }

    fn decode(args: &Arguments) -> Self {
        Self {
            id: PaymentId::new(args.read_array(0)),
            amount: args.read_u32(32),
        }
    }
}

impl ArgumentLayout for PathRecursion {
    fn encode(&self) -> Arguments {
        let mut args = Arguments::zeroed();
        args.write_bytes(0, self.id.as_bytes());
        args.write_u32(32, self.depth);
        args
    }

    fn decode(args: &Arguments) -> Self {
        Self {
            id: PaymentId::new(args.read_array(0)),
            depth: args.read_u32(32),
        }
    }
}
