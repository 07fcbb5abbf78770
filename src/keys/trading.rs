//! Trading key (secp256k1)
//!
//! Order-mutating requests are signed with an ephemeral secp256k1 key.
//! The key is registered on-chain only through its normalized id, which
//! is one-way, so the secret must be persisted by a `CredentialStore`.
//!
//! Signature format: keccak256 of the canonical message, low-s ECDSA,
//! serialized as lowercase hex `r(64) || s(64) || "0" || recovery_id`.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ethers::core::k256::ecdsa::signature::hazmat::PrehashVerifier;
use ethers::core::k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use ethers::core::k256::elliptic_curve::sec1::ToEncodedPoint;
use ethers::core::utils::keccak256;
use ethers::signers::LocalWallet;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::error::{SdkError, SdkResult};

/// Length of a serialized trading signature in hex chars
pub const TRADING_SIGNATURE_HEX_LEN: usize = 130;

const UNCOMPRESSED_PREFIX: &str = "04";

#[derive(Clone)]
pub struct TradingKeyPair {
    wallet: LocalWallet,
    public_key: String,
    normalized_key_id: String,
}

impl TradingKeyPair {
    /// Fresh key pair from the OS RNG
    pub fn generate() -> Self {
        Self::from_wallet(LocalWallet::new(&mut OsRng))
    }

    /// Restore from a persisted 32-byte secret in hex (optional `0x`)
    pub fn from_secret_hex(secret_hex: &str) -> SdkResult<Self> {
        let trimmed = secret_hex.trim();
        let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = Zeroizing::new(
            hex::decode(stripped)
                .map_err(|e| SdkError::MalformedKey(format!("invalid trading key hex: {}", e)))?,
        );
        if bytes.len() != 32 {
            return Err(SdkError::MalformedKey(format!(
                "trading key secret must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let wallet = LocalWallet::from_bytes(&bytes)
            .map_err(|e| SdkError::MalformedKey(format!("invalid secp256k1 scalar: {}", e)))?;
        Ok(Self::from_wallet(wallet))
    }

    fn from_wallet(wallet: LocalWallet) -> Self {
        let public_key = stripped_public_hex(wallet.signer().verifying_key());
        let normalized_key_id = normalize_trading_key(&public_key);
        Self {
            wallet,
            public_key,
            normalized_key_id,
        }
    }

    /// Uncompressed public key hex with the `04` prefix removed (128 chars)
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Identifier registered on-chain for this key
    pub fn normalized_key_id(&self) -> &str {
        &self.normalized_key_id
    }

    /// 32-byte secret as lowercase hex, for persistence only
    pub fn secret_hex(&self) -> Zeroizing<String> {
        let bytes = self.wallet.signer().to_bytes();
        Zeroizing::new(hex::encode(bytes))
    }

    /// Sign a canonical message: keccak256, then fixed-width hex signature
    pub fn sign(&self, message: &str) -> SdkResult<String> {
        let digest = keccak256(message.as_bytes());
        let (signature, recovery_id) = self
            .wallet
            .signer()
            .sign_prehash_recoverable(&digest)
            .map_err(|e| SdkError::Canonicalization(format!("trading key signing failed: {}", e)))?;

        Ok(format!(
            "{}0{}",
            hex::encode(signature.to_bytes()),
            recovery_id.to_byte()
        ))
    }

    pub fn verify(&self, message: &str, signature_hex: &str) -> bool {
        verify_with_verifying_key(self.wallet.signer().verifying_key(), message, signature_hex)
    }
}

impl fmt::Debug for TradingKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TradingKeyPair")
            .field("public_key", &self.public_key)
            .field("normalized_key_id", &self.normalized_key_id)
            .finish_non_exhaustive()
    }
}

/// base64( hex( keccak256( utf8(stripped_public_hex) ) ) )
///
/// The hex string itself is hashed as text, not its decoded bytes.
pub fn normalize_trading_key(stripped_public_hex: &str) -> String {
    let digest_hex = hex::encode(keccak256(stripped_public_hex.as_bytes()));
    BASE64.encode(digest_hex.as_bytes())
}

/// Verify a trading signature against a stripped public key hex
pub fn verify_trading_signature(
    stripped_public_hex: &str,
    message: &str,
    signature_hex: &str,
) -> SdkResult<bool> {
    let sec1 = hex::decode(format!("{}{}", UNCOMPRESSED_PREFIX, stripped_public_hex))
        .map_err(|e| SdkError::MalformedKey(format!("invalid trading public key hex: {}", e)))?;
    let verifying_key = VerifyingKey::from_sec1_bytes(&sec1)
        .map_err(|e| SdkError::MalformedKey(format!("invalid secp256k1 point: {}", e)))?;
    Ok(verify_with_verifying_key(&verifying_key, message, signature_hex))
}

fn verify_with_verifying_key(verifying_key: &VerifyingKey, message: &str, signature_hex: &str) -> bool {
    let Some((signature, recovery_id)) = parse_signature(signature_hex) else {
        return false;
    };
    let digest = keccak256(message.as_bytes());

    if verifying_key.verify_prehash(&digest, &signature).is_err() {
        return false;
    }

    matches!(
        VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id),
        Ok(recovered) if &recovered == verifying_key
    )
}

fn parse_signature(signature_hex: &str) -> Option<(Signature, RecoveryId)> {
    if signature_hex.len() != TRADING_SIGNATURE_HEX_LEN || !signature_hex.is_ascii() {
        return None;
    }
    let (rs_hex, tail) = signature_hex.split_at(128);
    let rs = hex::decode(rs_hex).ok()?;
    let signature = Signature::from_slice(&rs).ok()?;

    let recovery_byte = tail.strip_prefix('0')?.parse::<u8>().ok()?;
    let recovery_id = RecoveryId::from_byte(recovery_byte)?;
    Some((signature, recovery_id))
}

fn stripped_public_hex(verifying_key: &VerifyingKey) -> String {
    let point = verifying_key.to_encoded_point(false);
    let full = hex::encode(point.as_bytes());
    // Uncompressed SEC1 points always start with 0x04
    full.strip_prefix(UNCOMPRESSED_PREFIX)
        .map(str::to_string)
        .unwrap_or(full)
}
