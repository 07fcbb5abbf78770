//! Asset manager contract surface
//!
//! The provisioning client only talks to the chain through this trait,
//! so tests can drive it with a scripted in-memory contract.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::SdkResult;

// NEAR method names on the asset manager contract
pub const METHOD_USER_ACCOUNT_EXISTS: &str = "user_account_exists";
pub const METHOD_STORAGE_DEPOSIT: &str = "storage_deposit";
pub const METHOD_IS_KEY_ANNOUNCED: &str = "is_orderly_key_announced";
pub const METHOD_ANNOUNCE_KEY: &str = "user_announce_key";
pub const METHOD_STORAGE_COST_OF_ANNOUNCE_KEY: &str = "storage_cost_of_announce_key";
pub const METHOD_STORAGE_BALANCE_OF: &str = "storage_balance_of";
pub const METHOD_USER_STORAGE_USAGE: &str = "user_storage_usage";
pub const METHOD_IS_TRADING_KEY_SET: &str = "is_trading_key_set";
pub const METHOD_SET_TRADING_KEY: &str = "user_request_set_trading_key";
pub const METHOD_GET_TRADING_KEY: &str = "get_user_trading_key";

/// NEP-145 storage balance, in yoctoNEAR
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageBalance {
    #[serde(deserialize_with = "deserialize_yocto")]
    pub total: u128,
    #[serde(deserialize_with = "deserialize_yocto")]
    pub available: u128,
}

/// NEAR returns balances as decimal strings; usage sometimes as numbers
pub fn deserialize_yocto<'de, D>(deserializer: D) -> Result<u128, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(u64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s.parse().map_err(serde::de::Error::custom),
        Raw::Num(n) => Ok(u128::from(n)),
    }
}

/// On-chain operations used during provisioning
///
/// Reads are idempotent. Writes must treat "already done" responses as
/// success where the contract reports them.
#[async_trait]
pub trait AssetManagerContract: Send + Sync {
    async fn account_exists(&self, account_id: &str) -> SdkResult<bool>;

    /// `storage_deposit{registration_only: true}` with the minimum deposit
    async fn register_account(&self, account_id: &str) -> SdkResult<()>;

    async fn is_key_announced(&self, account_id: &str, orderly_key: &str) -> SdkResult<bool>;

    async fn announce_key(&self) -> SdkResult<()>;

    /// Storage cost of one key announcement, in yoctoNEAR
    async fn storage_cost_of_announcement(&self) -> SdkResult<u128>;

    /// Zero balance when the account is not registered
    async fn storage_balance_of(&self, account_id: &str) -> SdkResult<StorageBalance>;

    /// Storage used by the account, in yoctoNEAR
    async fn storage_usage_of(&self, account_id: &str) -> SdkResult<u128>;

    /// `storage_deposit{registration_only: false}` attaching `amount` yoctoNEAR
    async fn storage_deposit(&self, account_id: &str, amount: u128) -> SdkResult<()>;

    async fn is_trading_key_set(&self, account_id: &str, orderly_key: &str) -> SdkResult<bool>;

    async fn set_trading_key(&self, normalized_key_id: &str) -> SdkResult<()>;

    async fn get_trading_key_id(&self, account_id: &str, orderly_key: &str) -> SdkResult<String>;
}
