//! Key material for the three-tier key hierarchy
//!
//! - account identity (NEAR account id + network)
//! - Orderly key (ed25519, authenticates REST and WS)
//! - trading key (secp256k1, authorizes order-mutating requests)
//!
//! Pure value types and conversions; the only I/O is in `FileCredentialStore`.

mod near_key;
mod orderly;
mod store;
mod trading;

pub use near_key::{parse_public_key, NearKeyPair, ED25519_PREFIX};
pub use orderly::{verify_orderly_signature, OrderlyKeyPair};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use trading::{
    normalize_trading_key, verify_trading_signature, TradingKeyPair, TRADING_SIGNATURE_HEX_LEN,
};

use crate::config::{NetworkEndpoints, NetworkId};
use crate::error::{SdkError, SdkResult};

/// The NEAR account a session acts for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountIdentity {
    account_id: String,
    network_id: NetworkId,
}

impl AccountIdentity {
    pub fn new(account_id: impl Into<String>, network_id: NetworkId) -> SdkResult<Self> {
        let account_id = account_id.into();
        if account_id.trim().is_empty() {
            return Err(SdkError::MissingCredential("account_id is empty".into()));
        }
        Ok(Self {
            account_id,
            network_id,
        })
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn network_id(&self) -> NetworkId {
        self.network_id
    }

    pub fn endpoints(&self) -> NetworkEndpoints {
        self.network_id.endpoints()
    }

    /// Private stream URL: base followed by the account id
    pub fn private_ws_url(&self) -> String {
        format!("{}{}", self.endpoints().private_ws_url, self.account_id)
    }
}
