//! Path and payment records.

use std::time::Instant;

use ripple_types::{PaymentDirection, PaymentId, PeerAccount};

/// One node's view of a candidate route: its neighbours on either side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    pub id: PaymentId,
    pub amount: u32,
    /// Neighbour towards the payer.
    pub incoming: Option<PeerAccount>,
    /// Neighbour towards the payee.
    pub outgoing: Option<PeerAccount>,
    /// Recursion round this node expects next.
    pub depth: u32,
    /// Set once the route through this node is known end to end.
    pub committed: bool,
    pub expires_at: Instant,
}

impl Path {
    pub fn new(id: PaymentId, amount: u32, expires_at: Instant) -> Self {
        Self {
            id,
            amount,
            incoming: None,
            outgoing: None,
            depth: 0,
            committed: false,
            expires_at,
        }
    }

    /// The slot a probe travelling in `direction` records its sender in.
    ///
    /// An outgoing probe comes from the payer's side, so its sender is the
    /// incoming neighbour, and vice versa.
    pub fn slot(&self, direction: PaymentDirection) -> Option<&PeerAccount> {
        match direction {
            PaymentDirection::Outgoing => self.incoming.as_ref(),
            PaymentDirection::Incoming => self.outgoing.as_ref(),
        }
    }

    pub fn set_slot(&mut self, direction: PaymentDirection, peer: PeerAccount) {
        match direction {
            PaymentDirection::Outgoing => self.incoming = Some(peer),
            PaymentDirection::Incoming => self.outgoing = Some(peer),
        }
    }

    /// Both neighbours known.
    pub fn is_bridged(&self) -> bool {
        self.incoming.is_some() && self.outgoing.is_some()
    }

    /// The neighbour leading back to the root of whichever search reached
    /// this node, if exactly one side is known.
    pub fn upstream(&self) -> Option<&PeerAccount> {
        match (&self.incoming, &self.outgoing) {
            (Some(peer), None) | (None, Some(peer)) => Some(peer),
            _ => None,
        }
    }
}

/// The payment an account is currently searching a route for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payment {
    pub id: PaymentId,
    pub counterparty: PeerAccount,
    pub direction: PaymentDirection,
    pub amount: u32,
    pub nonce: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_types::{ServerAddress, Username};

    fn peer(name: &str) -> PeerAccount {
        PeerAccount::new(Username::new(name).unwrap(), ServerAddress::new("s").unwrap())
    }

    #[test]
    fn probe_direction_selects_slot() {
        let mut path = Path::new(PaymentId::new([1; 32]), 5, Instant::now());
        path.set_slot(PaymentDirection::Outgoing, peer("from_payer_side"));
        assert_eq!(path.incoming, Some(peer("from_payer_side")));
        assert_eq!(path.slot(PaymentDirection::Outgoing), Some(&peer("from_payer_side")));
        assert_eq!(path.slot(PaymentDirection::Incoming), None);
        assert_eq!(path.upstream(), Some(&peer("from_payer_side")));

        path.set_slot(PaymentDirection::Incoming, peer("from_payee_side"));
        assert!(path.is_bridged());
        assert_eq!(path.upstream(), None);
    }
}
