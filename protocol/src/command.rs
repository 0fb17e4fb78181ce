//! Command bytes.
//!
//! The high bit of the command byte separates the two namespaces: clear for
//! commands a local client sends to its own server, set for commands one
//! server sends to another.

use std::fmt;

use crate::ProtocolError;

/// Bit set on every peer-originated command.
pub const PEER_BIT: u8 = 0x80;

/// Commands sent by an account owner to its home server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ClientCommand {
    SetTrustline = 0x00,
    SyncTrustlineIn = 0x01,
    SyncTrustlineOut = 0x02,
    GetTrustlineIn = 0x03,
    GetTrustlineOut = 0x04,
    NewPaymentOut = 0x05,
    NewPaymentIn = 0x06,
    GetPayment = 0x07,
}

/// Commands exchanged between servers on behalf of their accounts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PeerCommand {
    GetTrustline = 0x80,
    SetTrustline = 0x81,
    SetSyncOut = 0x82,
    SetTimestamp = 0x83,
    FindPathOut = 0x84,
    FindPathIn = 0x85,
    PathRecurse = 0x86,
}

/// Which replay counter gates a client command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandScope {
    /// The peer fields name an existing relation; its client counter applies.
    Relation,
    /// The peer fields name an arbitrary counterparty; the account counter applies.
    Account,
}

impl ClientCommand {
    pub const ALL: [ClientCommand; 8] = [
        Self::SetTrustline,
        Self::SyncTrustlineIn,
        Self::SyncTrustlineOut,
        Self::GetTrustlineIn,
        Self::GetTrustlineOut,
        Self::NewPaymentOut,
        Self::NewPaymentIn,
        Self::GetPayment,
    ];

    pub fn scope(self) -> CommandScope {
        match self {
            Self::NewPaymentOut | Self::NewPaymentIn | Self::GetPayment => CommandScope::Account,
            _ => CommandScope::Relation,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SetTrustline => "set_trustline",
            Self::SyncTrustlineIn => "sync_trustline_in",
            Self::SyncTrustlineOut => "sync_trustline_out",
            Self::GetTrustlineIn => "get_trustline_in",
            Self::GetTrustlineOut => "get_trustline_out",
            Self::NewPaymentOut => "new_payment_out",
            Self::NewPaymentIn => "new_payment_in",
            Self::GetPayment => "get_payment",
        }
    }
}

impl PeerCommand {
    pub const ALL: [PeerCommand; 7] = [
        Self::GetTrustline,
        Self::SetTrustline,
        Self::SetSyncOut,
        Self::SetTimestamp,
        Self::FindPathOut,
        Self::FindPathIn,
        Self::PathRecurse,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GetTrustline => "peer_get_trustline",
            Self::SetTrustline => "peer_set_trustline",
            Self::SetSyncOut => "peer_set_sync_out",
            Self::SetTimestamp => "peer_set_timestamp",
            Self::FindPathOut => "peer_find_path_out",
            Self::FindPathIn => "peer_find_path_in",
            Self::PathRecurse => "peer_path_recurse",
        }
    }
}

/// A decoded command byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    Client(ClientCommand),
    Peer(PeerCommand),
}

impl Command {
    pub fn from_byte(byte: u8) -> Result<Self, ProtocolError> {
        let found = if byte & PEER_BIT == 0 {
            ClientCommand::ALL
                .into_iter()
                .find(|c| *c as u8 == byte)
                .map(Command::Client)
        } else {
            PeerCommand::ALL
                .into_iter()
                .find(|c| *c as u8 == byte)
                .map(Command::Peer)
        };
        found.ok_or(ProtocolError::UnknownCommand(byte))
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Self::Client(c) => c as u8,
            Self::Peer(p) => p as u8,
        }
    }

    pub fn is_peer(self) -> bool {
        matches!(self, Self::Peer(_))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client(c) => c.as_str(),
            Self::Peer(p) => p.as_str(),
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::from_byte(byte)
    }
}

impl From<ClientCommand> for Command {
    fn from(c: ClientCommand) -> Self {
        Self::Client(c)
    }
}

impl From<PeerCommand> for Command {
    fn from(p: PeerCommand) -> Self {
        Self::Peer(p)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ClientCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PeerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
