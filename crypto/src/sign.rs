//! HMAC-SHA256 message authentication.

use hmac::{Hmac, Mac};
use ripple_types::SecretKey;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length of a MAC tag in bytes.
pub const MAC_LEN: usize = 32;

fn keyed(key: &SecretKey) -> HmacSha256 {
    <HmacSha256 as Mac>::new_from_slice(key.as_bytes()).expect("HMAC accepts keys of any length")
}

/// Compute the MAC tag of a message under a shared secret.
pub fn sign_message(message: &[u8], key: &SecretKey) -> [u8; MAC_LEN] {
    let mut mac = keyed(key);
    mac.update(message);
    let tag = mac.finalize().into_bytes();
    let mut output = [0u8; MAC_LEN];
    output.copy_from_slice(&tag);
    output
}

/// Verify a MAC tag in constant time.
pub fn verify_signature(message: &[u8], signature: &[u8; MAC_LEN], key: &SecretKey) -> bool {
    let mut mac = keyed(key);
    mac.update(message);
    mac.verify_slice(signature).is_ok()
}
