//! Borsh-encoded NEAR transactions
//!
//! Only what a single function call needs. Field order and enum variant
//! order define the wire format and must match nearcore.

use borsh::BorshSerialize;
use sha2::{Digest, Sha256};

use crate::error::{SdkError, SdkResult};
use crate::keys::NearKeyPair;

pub type Nonce = u64;
pub type Gas = u64;
pub type Balance = u128;

/// 30 TGas
pub const DEFAULT_FUNCTION_CALL_GAS: Gas = 30_000_000_000_000;

const ED25519_KEY_TYPE: u8 = 0;

#[derive(BorshSerialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountId(pub String);

#[derive(BorshSerialize, Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    pub key_type: u8,
    pub key_data: [u8; 32],
}

impl PublicKey {
    pub fn from_ed25519_bytes(bytes: [u8; 32]) -> Self {
        Self {
            key_type: ED25519_KEY_TYPE,
            key_data: bytes,
        }
    }
}

#[derive(BorshSerialize, Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub key_type: u8,
    pub signature_data: [u8; 64],
}

#[derive(BorshSerialize, Clone, Debug, PartialEq, Eq)]
pub struct CryptoHash(pub [u8; 32]);

#[derive(BorshSerialize, Clone, Debug, PartialEq, Eq)]
pub struct FunctionCallAction {
    pub method_name: String,
    pub args: Vec<u8>,
    pub gas: Gas,
    pub deposit: Balance,
}

/// Borsh tag = variant index; FunctionCall is 2
#[derive(BorshSerialize, Clone, Debug, PartialEq, Eq)]
pub enum Action {
    CreateAccount,
    DeployContract { code: Vec<u8> },
    FunctionCall(Box<FunctionCallAction>),
}

#[derive(BorshSerialize, Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub signer_id: AccountId,
    pub public_key: PublicKey,
    pub nonce: Nonce,
    pub receiver_id: AccountId,
    pub block_hash: CryptoHash,
    pub actions: Vec<Action>,
}

#[derive(BorshSerialize, Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signature: Signature,
}

impl Transaction {
    /// Single function call from `signer` to `receiver_id`
    pub fn function_call(
        signer_id: &str,
        signer: &NearKeyPair,
        nonce: Nonce,
        receiver_id: &str,
        block_hash: [u8; 32],
        call: FunctionCallAction,
    ) -> Self {
        Self {
            signer_id: AccountId(signer_id.to_string()),
            public_key: PublicKey::from_ed25519_bytes(signer.public_key_bytes()),
            nonce,
            receiver_id: AccountId(receiver_id.to_string()),
            block_hash: CryptoHash(block_hash),
            actions: vec![Action::FunctionCall(Box::new(call))],
        }
    }

    /// sha256 of the borsh encoding
    pub fn hash(&self) -> SdkResult<[u8; 32]> {
        let bytes = borsh::to_vec(self)
            .map_err(|e| SdkError::InvalidResponse(format!("transaction encoding failed: {}", e)))?;
        Ok(Sha256::digest(&bytes).into())
    }

    /// Sign and return the borsh bytes of the signed transaction
    pub fn sign(self, signer: &NearKeyPair) -> SdkResult<Vec<u8>> {
        let hash = self.hash()?;
        let signed = SignedTransaction {
            signature: Signature {
                key_type: ED25519_KEY_TYPE,
                signature_data: signer.sign(&hash),
            },
            transaction: self,
        };
        borsh::to_vec(&signed).map_err(|e| {
            SdkError::InvalidResponse(format!("signed transaction encoding failed: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(signer: &NearKeyPair) -> Transaction {
        Transaction::function_call(
            "alice.testnet",
            signer,
            7,
            "asset-manager.orderly.testnet",
            [9u8; 32],
            FunctionCallAction {
                method_name: "user_announce_key".to_string(),
                args: b"{}".to_vec(),
                gas: DEFAULT_FUNCTION_CALL_GAS,
                deposit: 1,
            },
        )
    }

    #[test]
    fn test_borsh_layout_prefix() {
        let signer = NearKeyPair::generate();
        let bytes = borsh::to_vec(&sample(&signer)).unwrap();

        // signer_id: u32 length + utf8
        assert_eq!(&bytes[..4], &13u32.to_le_bytes());
        assert_eq!(&bytes[4..17], b"alice.testnet");
        // public key: type byte + 32 bytes
        assert_eq!(bytes[17], 0);
        assert_eq!(&bytes[18..50], &signer.public_key_bytes());
        // nonce
        assert_eq!(&bytes[50..58], &7u64.to_le_bytes());
    }

    #[test]
    fn test_function_call_variant_tag() {
        let action = Action::FunctionCall(Box::new(FunctionCallAction {
            method_name: "m".to_string(),
            args: vec![],
            gas: 1,
            deposit: 0,
        }));
        let bytes = borsh::to_vec(&action).unwrap();
        assert_eq!(bytes[0], 2);
    }

    #[test]
    fn test_signature_covers_hash() {
        let signer = NearKeyPair::generate();
        let tx = sample(&signer);
        let hash = tx.hash().unwrap();
        let tx_len = borsh::to_vec(&tx).unwrap().len();
        let signed = tx.sign(&signer).unwrap();

        // signed = tx bytes + key type + 64-byte signature
        assert_eq!(signed.len(), tx_len + 1 + 64);
        assert!(signer.verify(&hash, &signed[tx_len + 1..]));
    }
}
