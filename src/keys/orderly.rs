//! Orderly API key (ed25519)
//!
//! The Orderly key authenticates every REST call and the WebSocket
//! handshake. Signatures are standard padded base64 of the raw
//! ed25519 signature over the UTF-8 canonical message.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use super::near_key::{parse_public_key, verify_with_public_key_bytes, NearKeyPair};
use crate::error::SdkResult;

#[derive(Clone)]
pub struct OrderlyKeyPair {
    key: NearKeyPair,
    public_key: String,
}

impl OrderlyKeyPair {
    pub fn generate() -> Self {
        Self::from_near_key(NearKeyPair::generate())
    }

    /// Restore from a NEAR secret string (`ed25519:...`)
    pub fn from_secret_str(secret: &str) -> SdkResult<Self> {
        Ok(Self::from_near_key(NearKeyPair::from_secret_str(secret)?))
    }

    pub fn from_near_key(key: NearKeyPair) -> Self {
        let public_key = key.public_key();
        Self { key, public_key }
    }

    /// `ed25519:<base58>` public key, as sent in `orderly-key`
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Underlying NEAR key, used when the Orderly key also signs chain calls
    pub fn near_key(&self) -> &NearKeyPair {
        &self.key
    }

    /// base64(ed25519(utf8(message)))
    pub fn sign(&self, message: &str) -> String {
        BASE64.encode(self.key.sign(message.as_bytes()))
    }

    pub fn verify(&self, message: &str, signature_b64: &str) -> bool {
        match BASE64.decode(signature_b64) {
            Ok(raw) => self.key.verify(message.as_bytes(), &raw),
            Err(_) => false,
        }
    }
}

impl fmt::Debug for OrderlyKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderlyKeyPair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Verify an Orderly signature given only the public key string
pub fn verify_orderly_signature(public_key: &str, message: &str, signature_b64: &str) -> SdkResult<bool> {
    let public_key = parse_public_key(public_key)?;
    Ok(match BASE64.decode(signature_b64) {
        Ok(raw) => verify_with_public_key_bytes(&public_key, message.as_bytes(), &raw),
        Err(_) => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_padded_base64_of_64_bytes() {
        let key = OrderlyKeyPair::generate();
        let sig = key.sign("1649920583000GET/v1/orders");
        assert_eq!(sig.len(), 88);
        assert!(sig.ends_with("=="));
        assert_eq!(BASE64.decode(&sig).unwrap().len(), 64);
    }

    #[test]
    fn test_sign_is_deterministic() {
        let key = OrderlyKeyPair::generate();
        assert_eq!(key.sign("1700000000000"), key.sign("1700000000000"));
    }

    #[test]
    fn test_verify_with_public_key_string() {
        let key = OrderlyKeyPair::generate();
        let sig = key.sign("1700000000000DELETE/v1/orders?symbol=SPOT_NEAR_USDC");
        assert!(verify_orderly_signature(
            key.public_key(),
            "1700000000000DELETE/v1/orders?symbol=SPOT_NEAR_USDC",
            &sig
        )
        .unwrap());
        assert!(!verify_orderly_signature(key.public_key(), "1700000000001", &sig).unwrap());
    }

    #[test]
    fn test_garbage_signature_fails_verification() {
        let key = OrderlyKeyPair::generate();
        assert!(!key.verify("msg", "not base64!"));
    }

    #[test]
    fn test_public_key_has_near_prefix() {
        let key = OrderlyKeyPair::generate();
        assert!(key.public_key().starts_with("ed25519:"));
    }
}
