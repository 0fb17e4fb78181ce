//! Peer accounts and the relations between a local account and its peers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ServerAddress, Username};

/// An account on some server, local or remote.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerAccount {
    pub username: Username,
    pub server: ServerAddress,
}

impl PeerAccount {
    pub fn new(username: Username, server: ServerAddress) -> Self {
        Self { username, server }
    }
}

impl fmt::Display for PeerAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.username, self.server)
    }
}

/// Identifies the trust relation a local account holds with one peer.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationKey {
    pub account: Username,
    pub peer: PeerAccount,
}

impl RelationKey {
    pub fn new(account: Username, peer: PeerAccount) -> Self {
        Self { account, peer }
    }
}

impl fmt::Display for RelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.account, self.peer)
    }
}
