//! `AssetManagerContract` over NEAR JSON-RPC
//!
//! Views go through `query/call_function`. Changes are signed function-call
//! transactions sent with `broadcast_tx_commit`.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::rpc::{is_balance_failure, NearRpcClient};
use super::transaction::{Balance, FunctionCallAction, Transaction, DEFAULT_FUNCTION_CALL_GAS};
use crate::config::ONE_MILLINEAR;
use crate::error::{SdkError, SdkResult};
use crate::keys::NearKeyPair;
use crate::provisioning::{
    deserialize_yocto, AssetManagerContract, StorageBalance, METHOD_ANNOUNCE_KEY,
    METHOD_GET_TRADING_KEY, METHOD_IS_KEY_ANNOUNCED, METHOD_IS_TRADING_KEY_SET,
    METHOD_SET_TRADING_KEY, METHOD_STORAGE_BALANCE_OF, METHOD_STORAGE_COST_OF_ANNOUNCE_KEY,
    METHOD_STORAGE_DEPOSIT, METHOD_USER_ACCOUNT_EXISTS, METHOD_USER_STORAGE_USAGE,
};

/// Minimum deposit for `storage_deposit{registration_only: true}` (0.005 NEAR)
pub const REGISTRATION_DEPOSIT: Balance = 5 * ONE_MILLINEAR;

/// Attached to key announcement and trading key registration
pub const ONE_YOCTO: Balance = 1;

/// `ft_transfer_call` runs the receiver's callback, so it needs more than a plain call
pub const FT_TRANSFER_CALL_GAS: u64 = 100_000_000_000_000;

// Asset management methods outside the provisioning flow
pub const METHOD_DEPOSIT_NATIVE_TOKEN: &str = "user_deposit_native_token";
pub const METHOD_FT_TRANSFER_CALL: &str = "ft_transfer_call";
pub const METHOD_REQUEST_WITHDRAW: &str = "user_request_withdraw";
pub const METHOD_STORAGE_WITHDRAW: &str = "storage_withdraw";
pub const METHOD_IS_TOKEN_LISTED: &str = "is_token_listed";
pub const METHOD_IS_SYMBOL_LISTED: &str = "is_symbol_listed";
pub const METHOD_GET_LISTED_TOKENS: &str = "get_listed_tokens";

/// Contract responses that mean the account was registered concurrently
const ALREADY_REGISTERED_MARKERS: [&str; 2] = ["already registered", "already exists"];

/// Asset manager contract reached through NEAR RPC
pub struct NearAssetManager {
    rpc: NearRpcClient,
    contract_id: String,
    account_id: String,
    signer: NearKeyPair,
    gas: u64,
}

impl NearAssetManager {
    /// # Arguments
    /// * `rpc` - NEAR RPC client
    /// * `contract_id` - Asset manager contract account
    /// * `account_id` - Account that signs change calls
    /// * `signer` - Access key of `account_id` used for change calls
    pub fn new(
        rpc: NearRpcClient,
        contract_id: impl Into<String>,
        account_id: impl Into<String>,
        signer: NearKeyPair,
    ) -> Self {
        Self {
            rpc,
            contract_id: contract_id.into(),
            account_id: account_id.into(),
            signer,
            gas: DEFAULT_FUNCTION_CALL_GAS,
        }
    }

    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = gas;
        self
    }

    pub fn contract_id(&self) -> &str {
        &self.contract_id
    }

    async fn view<T: serde::de::DeserializeOwned>(&self, method: &str, args: Value) -> SdkResult<T> {
        self.rpc.view_function(&self.contract_id, method, &args).await
    }

    /// Sign and submit one function call, returning the decoded success value
    async fn change(&self, method: &str, args: Value, deposit: Balance) -> SdkResult<Value> {
        self.change_on(&self.contract_id, method, args, deposit, self.gas)
            .await
    }

    async fn change_on(
        &self,
        receiver_id: &str,
        method: &str,
        args: Value,
        deposit: Balance,
        gas: u64,
    ) -> SdkResult<Value> {
        let public_key = self.signer.public_key();
        let nonce = self
            .rpc
            .access_key_nonce(&self.account_id, &public_key)
            .await?
            + 1;
        let block_hash = self.rpc.latest_block_hash().await?;

        let tx = Transaction::function_call(
            &self.account_id,
            &self.signer,
            nonce,
            receiver_id,
            block_hash,
            FunctionCallAction {
                method_name: method.to_string(),
                args: serde_json::to_vec(&args)?,
                gas,
                deposit,
            },
        );
        let signed = tx.sign(&self.signer)?;

        info!(
            contract = %receiver_id,
            method = %method,
            deposit = %deposit,
            nonce,
            "Submitting contract call"
        );

        let outcome = self.rpc.broadcast_tx_commit(&signed).await?;
        decode_outcome(method, &outcome)
    }
}

// ============================================================================
// Deposits, withdrawals and storage
// ============================================================================

impl NearAssetManager {
    /// Deposit `amount` yoctoNEAR into the trading account
    pub async fn deposit_native(&self, amount: Balance) -> SdkResult<()> {
        self.change(METHOD_DEPOSIT_NATIVE_TOKEN, json!({}), amount)
            .await?;
        Ok(())
    }

    /// Deposit a NEP-141 token through `ft_transfer_call` on the token contract
    ///
    /// # Arguments
    /// * `token_contract` - Token contract account
    /// * `amount` - Amount in the token's smallest unit
    /// * `msg` - Message forwarded to the asset manager (usually empty)
    pub async fn deposit_token(&self, token_contract: &str, amount: u128, msg: &str) -> SdkResult<()> {
        self.change_on(
            token_contract,
            METHOD_FT_TRANSFER_CALL,
            json!({
                "receiver_id": self.contract_id,
                "amount": amount.to_string(),
                "msg": msg,
            }),
            ONE_YOCTO,
            FT_TRANSFER_CALL_GAS,
        )
        .await?;
        Ok(())
    }

    /// Request a withdrawal of `amount` of `token` back to the wallet
    pub async fn withdraw(&self, token: &str, amount: u128) -> SdkResult<()> {
        self.change(
            METHOD_REQUEST_WITHDRAW,
            json!({ "token": token, "amount": amount.to_string() }),
            ONE_YOCTO,
        )
        .await?;
        Ok(())
    }

    /// Storage balance of the signing account
    pub async fn storage_balance(&self) -> SdkResult<StorageBalance> {
        self.storage_balance_of(&self.account_id).await
    }

    /// Withdraw `amount` of available storage deposit, or all of it with `None`
    pub async fn storage_withdraw(&self, amount: Option<u128>) -> SdkResult<StorageBalance> {
        let args = match amount {
            Some(amount) => json!({ "amount": amount.to_string() }),
            None => json!({}),
        };
        let value = self.change(METHOD_STORAGE_WITHDRAW, args, ONE_YOCTO).await?;
        serde_json::from_value(value).map_err(|e| {
            SdkError::InvalidResponse(format!("{} returned no storage balance: {}", METHOD_STORAGE_WITHDRAW, e))
        })
    }

    pub async fn is_token_listed(&self, token: &str) -> SdkResult<bool> {
        self.view(METHOD_IS_TOKEN_LISTED, json!({ "token": token }))
            .await
    }

    pub async fn is_symbol_listed(&self, pair_symbol: &str) -> SdkResult<bool> {
        self.view(METHOD_IS_SYMBOL_LISTED, json!({ "pair_symbol": pair_symbol }))
            .await
    }

    /// Tokens the contract accepts for deposit
    pub async fn listed_tokens(&self) -> SdkResult<Vec<String>> {
        self.view(METHOD_GET_LISTED_TOKENS, json!({})).await
    }
}

/// Extract the success value of a final execution outcome
fn decode_outcome(method: &str, outcome: &Value) -> SdkResult<Value> {
    let status = outcome.get("status").ok_or_else(|| {
        SdkError::InvalidResponse(format!("{} outcome has no status", method))
    })?;

    if let Some(failure) = status.get("Failure") {
        let text = failure.to_string();
        warn!(method = %method, failure = %text, "Contract call failed");
        if is_balance_failure(&text) {
            return Err(SdkError::InsufficientStorage(format!("{}: {}", method, text)));
        }
        return Err(SdkError::InvalidResponse(format!(
            "{} failed on-chain: {}",
            method, text
        )));
    }

    match status.get("SuccessValue").and_then(Value::as_str) {
        Some("") => Ok(Value::Null),
        Some(encoded) => {
            let bytes = BASE64.decode(encoded).map_err(|e| {
                SdkError::InvalidResponse(format!("{} success value is not base64: {}", method, e))
            })?;
            serde_json::from_slice(&bytes).map_err(|e| {
                SdkError::InvalidResponse(format!("{} success value is not JSON: {}", method, e))
            })
        }
        None => Err(SdkError::InvalidResponse(format!(
            "{} outcome has unexpected status: {}",
            method, status
        ))),
    }
}

#[derive(Deserialize)]
#[serde(transparent)]
struct Yocto(#[serde(deserialize_with = "deserialize_yocto")] u128);

#[async_trait]
impl AssetManagerContract for NearAssetManager {
    async fn account_exists(&self, account_id: &str) -> SdkResult<bool> {
        self.view(METHOD_USER_ACCOUNT_EXISTS, json!({ "user": account_id }))
            .await
    }

    async fn register_account(&self, account_id: &str) -> SdkResult<()> {
        let result = self
            .change(
                METHOD_STORAGE_DEPOSIT,
                json!({ "account_id": account_id, "registration_only": true }),
                REGISTRATION_DEPOSIT,
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(SdkError::InvalidResponse(msg))
                if ALREADY_REGISTERED_MARKERS.iter().any(|m| msg.contains(m)) =>
            {
                debug!(account_id = %account_id, "Account registered concurrently; treating as success");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn is_key_announced(&self, account_id: &str, orderly_key: &str) -> SdkResult<bool> {
        self.view(
            METHOD_IS_KEY_ANNOUNCED,
            json!({ "user": account_id, "orderly_key": orderly_key }),
        )
        .await
    }

    async fn announce_key(&self) -> SdkResult<()> {
        self.change(METHOD_ANNOUNCE_KEY, json!({}), ONE_YOCTO).await?;
        Ok(())
    }

    async fn storage_cost_of_announcement(&self) -> SdkResult<u128> {
        let cost: Yocto = self
            .view(METHOD_STORAGE_COST_OF_ANNOUNCE_KEY, json!({}))
            .await?;
        Ok(cost.0)
    }

    async fn storage_balance_of(&self, account_id: &str) -> SdkResult<StorageBalance> {
        let balance: Option<StorageBalance> = self
            .view(METHOD_STORAGE_BALANCE_OF, json!({ "account_id": account_id }))
            .await?;
        Ok(balance.unwrap_or_default())
    }

    async fn storage_usage_of(&self, account_id: &str) -> SdkResult<u128> {
        let usage: Yocto = self
            .view(METHOD_USER_STORAGE_USAGE, json!({ "user": account_id }))
            .await?;
        Ok(usage.0)
    }

    async fn storage_deposit(&self, account_id: &str, amount: u128) -> SdkResult<()> {
        self.change(
            METHOD_STORAGE_DEPOSIT,
            json!({ "account_id": account_id, "registration_only": false }),
            amount,
        )
        .await?;
        Ok(())
    }

    async fn is_trading_key_set(&self, account_id: &str, orderly_key: &str) -> SdkResult<bool> {
        self.view(
            METHOD_IS_TRADING_KEY_SET,
            json!({ "user": account_id, "orderly_key": orderly_key }),
        )
        .await
    }

    async fn set_trading_key(&self, normalized_key_id: &str) -> SdkResult<()> {
        self.change(
            METHOD_SET_TRADING_KEY,
            json!({ "key": normalized_key_id }),
            ONE_YOCTO,
        )
        .await?;
        Ok(())
    }

    async fn get_trading_key_id(&self, account_id: &str, orderly_key: &str) -> SdkResult<String> {
        self.view(
            METHOD_GET_TRADING_KEY,
            json!({ "user": account_id, "orderly_key": orderly_key }),
        )
        .await
    }
}
