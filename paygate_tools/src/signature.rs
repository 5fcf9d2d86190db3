use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// The signature the gateway attaches to every callback: the hex-encoded SHA-256 of `merchant_id:secret:ref_id`.
pub fn callback_signature(merchant_id: &str, secret: &str, ref_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(merchant_id.as_bytes());
    hasher.update(b":");
    hasher.update(secret.as_bytes());
    hasher.update(b":");
    hasher.update(ref_id.as_bytes());
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

pub fn verify_callback_signature(merchant_id: &str, secret: &str, ref_id: &str, signature: &str) -> bool {
    if secret.is_empty() || signature.is_empty() {
        return false;
    }
    let expected = callback_signature(merchant_id, secret, ref_id);
    let provided = signature.trim().to_ascii_lowercase();
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}
