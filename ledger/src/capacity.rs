//! Spendable capacity along a relation.

use ripple_store::PeerRelation;
use ripple_types::PaymentDirection;

use crate::LedgerError;

/// Capacity left in the given probe direction.
///
/// An outgoing probe moves value from this account to the peer, which draws
/// on the credit the peer extends (`trustline_in`). An incoming probe moves
/// value from the peer to this account, drawing on `trustline_out`.
pub fn available(relation: &PeerRelation, direction: PaymentDirection) -> Result<u32, LedgerError> {
    let (trustline, creditline) = match direction {
        PaymentDirection::Outgoing => (relation.trustline_in, relation.creditline_in),
        PaymentDirection::Incoming => (relation.trustline_out, relation.creditline_out),
    };
    trustline
        .checked_sub(creditline)
        .ok_or(LedgerError::Overdrawn {
            trustline,
            creditline,
        })
}

/// Whether `amount` fits in the remaining capacity. Overdrawn relations
/// never qualify.
pub fn has_capacity(relation: &PeerRelation, direction: PaymentDirection, amount: u32) -> bool {
    match available(relation, direction) {
        Ok(left) => left >= amount,
        Err(e) => {
            tracing::warn!(relation = %relation.key(), error = %e, "relation is overdrawn");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_types::{PeerAccount, ServerAddress, Username};

    fn relation() -> PeerRelation {
        PeerRelation::new(
            Username::new("alice").unwrap(),
            PeerAccount::new(
                Username::new("bob").unwrap(),
                ServerAddress::new("10.0.0.2").unwrap(),
            ),
        )
    }

    #[test]
    fn outgoing_uses_incoming_trustline() {
        let mut rel = relation();
        rel.trustline_in = 100;
        rel.creditline_in = 30;
        rel.trustline_out = 5;
        assert_eq!(available(&rel, PaymentDirection::Outgoing), Ok(70));
        assert!(has_capacity(&rel, PaymentDirection::Outgoing, 70));
        assert!(!has_capacity(&rel, PaymentDirection::Outgoing, 71));
    }

    #[test]
    fn incoming_uses_outgoing_trustline() {
        let mut rel = relation();
        rel.trustline_out = 50;
        assert_eq!(available(&rel, PaymentDirection::Incoming), Ok(50));
        assert!(!has_capacity(&rel, PaymentDirection::Outgoing, 1));
    }

    #[test]
    fn overdrawn_relation_never_qualifies() {
        let mut rel = relation();
        rel.trustline_in = 10;
        rel.creditline_in = 20;
        assert_eq!(
            available(&rel, PaymentDirection::Outgoing),
            Err(LedgerError::Overdrawn {
                trustline: 10,
                creditline: 20
            })
        );
        assert!(!has_capacity(&rel, PaymentDirection::Outgoing, 0));
    }

    #[test]
    fn zero_amount_fits_any_healthy_relation() {
        assert!(has_capacity(&relation(), PaymentDirection::Incoming, 0));
    }
}
