//! NEAR-format ed25519 key pairs
//!
//! NEAR encodes keys as `ed25519:<base58>`. Secret keys carry either the
//! 64-byte `seed || public` form produced by wallets or a bare 32-byte seed.

use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::error::{SdkError, SdkResult};

/// Curve prefix used by NEAR key strings
pub const ED25519_PREFIX: &str = "ed25519:";

/// An ed25519 key pair in NEAR encoding
#[derive(Clone)]
pub struct NearKeyPair {
    signing_key: SigningKey,
}

impl NearKeyPair {
    /// Generate a fresh key pair from the OS RNG
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Parse `ed25519:<base58>` (64-byte keypair or 32-byte seed)
    pub fn from_secret_str(secret: &str) -> SdkResult<Self> {
        let encoded = strip_prefix(secret.trim())?;
        let bytes = Zeroizing::new(
            bs58::decode(encoded)
                .into_vec()
                .map_err(|e| SdkError::MalformedKey(format!("invalid base58 secret: {}", e)))?,
        );

        if bytes.len() != 32 && bytes.len() != 64 {
            return Err(SdkError::MalformedKey(format!(
                "ed25519 secret must be 32 or 64 bytes, got {}",
                bytes.len()
            )));
        }

        let mut seed = Zeroizing::new([0u8; 32]);
        seed.copy_from_slice(&bytes[..32]);
        let signing_key = SigningKey::from_bytes(&seed);

        if bytes.len() == 64 && signing_key.verifying_key().as_bytes() != &bytes[32..] {
            return Err(SdkError::MalformedKey(
                "ed25519 secret does not match its embedded public key".into(),
            ));
        }

        Ok(Self { signing_key })
    }

    /// Public key as `ed25519:<base58 32 bytes>`
    pub fn public_key(&self) -> String {
        format!(
            "{}{}",
            ED25519_PREFIX,
            bs58::encode(self.signing_key.verifying_key().as_bytes()).into_string()
        )
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Secret in wallet format `ed25519:<base58 seed||public>`
    pub fn secret_string(&self) -> Zeroizing<String> {
        let mut keypair = Zeroizing::new([0u8; 64]);
        keypair[..32].copy_from_slice(self.signing_key.as_bytes());
        keypair[32..].copy_from_slice(self.signing_key.verifying_key().as_bytes());
        Zeroizing::new(format!(
            "{}{}",
            ED25519_PREFIX,
            bs58::encode(keypair.as_slice()).into_string()
        ))
    }

    /// Raw ed25519 signature over `message`
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Verify a raw signature against this key
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        verify_with_public_key_bytes(&self.public_key_bytes(), message, signature)
    }
}

impl fmt::Debug for NearKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NearKeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// Decode `ed25519:<base58 32 bytes>` into raw bytes
pub fn parse_public_key(public_key: &str) -> SdkResult<[u8; 32]> {
    let encoded = strip_prefix(public_key.trim())?;
    let bytes = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| SdkError::MalformedKey(format!("invalid base58 public key: {}", e)))?;
    bytes.as_slice().try_into().map_err(|_| {
        SdkError::MalformedKey(format!(
            "ed25519 public key must be 32 bytes, got {}",
            bytes.len()
        ))
    })
}

/// Verify a raw ed25519 signature against raw public key bytes
pub fn verify_with_public_key_bytes(public_key: &[u8; 32], message: &[u8], signature: &[u8]) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    verifying_key.verify(message, &signature).is_ok()
}

fn strip_prefix(value: &str) -> SdkResult<&str> {
    value.strip_prefix(ED25519_PREFIX).ok_or_else(|| {
        SdkError::MalformedKey(format!("key must start with '{}'", ED25519_PREFIX))
    })
}
