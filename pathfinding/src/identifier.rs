//! Payment identifier derivation.

use ripple_crypto::sha256_multi;
use ripple_types::{PaymentId, PeerAccount};

/// Derive the identifier both ends of a payment agree on.
///
/// The payer is always hashed first, so the payer's `NewPaymentOut` and the
/// payee's `NewPaymentIn` with the same amount and nonce meet on one id.
pub fn payment_id(payer: &PeerAccount, payee: &PeerAccount, amount: u32, nonce: u32) -> PaymentId {
    PaymentId::new(sha256_multi(&[
        &payer.username.to_padded(),
        &payer.server.to_padded(),
        &payee.username.to_padded(),
        &payee.server.to_padded(),
        &amount.to_be_bytes(),
        &nonce.to_be_bytes(),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_types::{ServerAddress, Username};

    fn account(name: &str, server: &str) -> PeerAccount {
        PeerAccount::new(Username::new(name).unwrap(), ServerAddress::new(server).unwrap())
    }

    #[test]
    fn deterministic() {
        let p = account("payer", "a.example");
        let q = account("payee", "b.example");
        assert_eq!(payment_id(&p, &q, 10, 1), payment_id(&p, &q, 10, 1));
    }

    #[test]
    fn order_matters() {
        let p = account("payer", "a.example");
        let q = account("payee", "b.example");
        assert_ne!(payment_id(&p, &q, 10, 1), payment_id(&q, &p, 10, 1));
    }

    #[test]
    fn amount_and_nonce_matter() {
        let p = account("payer", "a.example");
        let q = account("payee", "b.example");
        let base = payment_id(&p, &q, 10, 1);
        assert_ne!(base, payment_id(&p, &q, 11, 1));
        assert_ne!(base, payment_id(&p, &q, 10, 2));
    }

    #[test]
    fn server_is_part_of_identity() {
        let q = account("payee", "b.example");
        assert_ne!(
            payment_id(&account("payer", "a.example"), &q, 10, 1),
            payment_id(&account("payer", "c.example"), &q, 10, 1)
        );
    }
}
