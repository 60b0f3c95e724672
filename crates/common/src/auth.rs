//! HMAC-SHA256 signing and verification for webhook ingest requests.

use hex;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Sign `payload` (the exact received bytes) with `secret`, producing a
/// lowercase hex-encoded digest.
pub fn sign_hmac(payload: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts a key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a hex-encoded HMAC-SHA256 signature over `payload` against `secret`.
///
/// Comparison is constant-time (via `hmac::Mac::verify_slice`), unlike a naive
/// string-equality check, so the mismatch timing does not leak how many
/// leading bytes of the signature were correct.
pub fn verify_hmac(payload: &[u8], signature_hex: &str, secret: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&signature).is_ok()
}
