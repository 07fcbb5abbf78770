//! Minimal NEAR JSON-RPC client
//!
//! Covers contract view calls, access key nonces, the latest final block
//! hash and `broadcast_tx_commit`.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, trace};

use crate::error::{SdkError, SdkResult};
use crate::http::map_reqwest_error;

const JSONRPC_ID: &str = "orderly-near-sdk";

#[derive(Debug, Clone)]
pub struct NearRpcClient {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl NearRpcClient {
    pub fn new(http: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Raw JSON-RPC call returning the `result` member
    pub async fn call(&self, method: &str, params: Value) -> SdkResult<Value> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": JSONRPC_ID,
            "method": method,
            "params": params,
        });

        trace!(rpc_method = %method, "NEAR RPC request");

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_reqwest_error(&format!("NEAR RPC {} failed", method), e, self.timeout))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| map_reqwest_error("NEAR RPC body read failed", e, self.timeout))?;

        let body: Value = serde_json::from_str(&text).map_err(|e| {
            SdkError::InvalidResponse(format!(
                "NEAR RPC {} returned non-JSON (HTTP {}): {}",
                method, status, e
            ))
        })?;

        if let Some(error) = body.get("error") {
            return Err(classify_rpc_error(method, error));
        }

        body.get("result").cloned().ok_or_else(|| {
            SdkError::InvalidResponse(format!("NEAR RPC {} response has no result", method))
        })
    }

    /// Call a view method and decode its JSON return value
    pub async fn view_function<T: DeserializeOwned>(
        &self,
        contract_id: &str,
        method_name: &str,
        args: &Value,
    ) -> SdkResult<T> {
        let args_base64 = BASE64.encode(serde_json::to_vec(args)?);
        let result = self
            .call(
                "query",
                json!({
                    "request_type": "call_function",
                    "finality": "final",
                    "account_id": contract_id,
                    "method_name": method_name,
                    "args_base64": args_base64,
                }),
            )
            .await?;

        // contract panics in view calls come back inside the result
        if let Some(error) = result.get("error").and_then(Value::as_str) {
            return Err(SdkError::InvalidResponse(format!(
                "view {} failed: {}",
                method_name, error
            )));
        }

        let raw = result.get("result").cloned().ok_or_else(|| {
            SdkError::InvalidResponse(format!("view {} returned no result bytes", method_name))
        })?;
        let bytes: Vec<u8> = serde_json::from_value(raw)?;

        debug!(method = %method_name, bytes = bytes.len(), "View call returned");
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Current nonce of an access key
    pub async fn access_key_nonce(&self, account_id: &str, public_key: &str) -> SdkResult<u64> {
        let result = self
            .call(
                "query",
                json!({
                    "request_type": "view_access_key",
                    "finality": "final",
                    "account_id": account_id,
                    "public_key": public_key,
                }),
            )
            .await?;

        if let Some(error) = result.get("error").and_then(Value::as_str) {
            return Err(SdkError::MissingCredential(format!(
                "access key {} on {}: {}",
                public_key, account_id, error
            )));
        }

        result.get("nonce").and_then(Value::as_u64).ok_or_else(|| {
            SdkError::InvalidResponse("view_access_key response has no nonce".into())
        })
    }

    /// Hash of the latest final block
    pub async fn latest_block_hash(&self) -> SdkResult<[u8; 32]> {
        let result = self.call("block", json!({ "finality": "final" })).await?;
        let encoded = result
            .pointer("/header/hash")
            .and_then(Value::as_str)
            .ok_or_else(|| SdkError::InvalidResponse("block response has no header.hash".into()))?;

        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| SdkError::InvalidResponse(format!("invalid block hash: {}", e)))?;
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| SdkError::InvalidResponse(format!("block hash is {} bytes", bytes.len())))
    }

    /// Submit a signed transaction and wait for its final outcome
    pub async fn broadcast_tx_commit(&self, signed_tx: &[u8]) -> SdkResult<Value> {
        self.call("broadcast_tx_commit", json!([BASE64.encode(signed_tx)]))
            .await
    }
}

/// Map an RPC error object to an `SdkError`
pub(crate) fn classify_rpc_error(method: &str, error: &Value) -> SdkError {
    let text = error.to_string();
    if is_balance_failure(&text) {
        SdkError::InsufficientStorage(format!("{}: {}", method, text))
    } else if text.contains("UNKNOWN_ACCESS_KEY") || text.contains("InvalidAccessKeyError") {
        SdkError::MissingCredential(format!("{}: access key rejected: {}", method, text))
    } else {
        SdkError::Transport(format!("NEAR RPC {} error: {}", method, text))
    }
}

/// Chain failures that mean the signer cannot pay
pub(crate) fn is_balance_failure(text: &str) -> bool {
    ["NotEnoughBalance", "LackBalanceForState", "NotEnoughAllowance", "insufficient"]
        .iter()
        .any(|needle| text.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(url: String) -> NearRpcClient {
        NearRpcClient::new(reqwest::Client::new(), url, Duration::from_secs(5))
    }

    fn view_result(value: &Value) -> String {
        let bytes = serde_json::to_vec(value).unwrap();
        json!({
            "jsonrpc": "2.0",
            "id": JSONRPC_ID,
            "result": { "result": bytes, "logs": [], "block_height": 1, "block_hash": "x" }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_view_function_decodes_result_bytes() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({
                "method": "query",
                "params": {
                    "request_type": "call_function",
                    "method_name": "user_account_exists",
                    "account_id": "asset-manager.orderly.testnet"
                }
            })))
            .with_status(200)
            .with_body(view_result(&json!(true)))
            .create_async()
            .await;

        let exists: bool = client(server.url())
            .view_function(
                "asset-manager.orderly.testnet",
                "user_account_exists",
                &json!({"user": "alice.testnet"}),
            )
            .await
            .unwrap();
        assert!(exists);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_view_function_surfaces_contract_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","id":"x","result":{"error":"wasm execution failed","logs":[]}}"#)
            .create_async()
            .await;

        let err = client(server.url())
            .view_function::<bool>("c", "m", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::InvalidResponse(_)), "Got: {}", err);
    }

    #[tokio::test]
    async fn test_rpc_error_is_transport() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","id":"x","error":{"name":"HANDLER_ERROR","cause":{"name":"UNKNOWN_BLOCK"}}}"#)
            .create_async()
            .await;

        let err = client(server.url()).latest_block_hash().await.unwrap_err();
        assert!(matches!(err, SdkError::Transport(_)), "Got: {}", err);
    }

    #[tokio::test]
    async fn test_latest_block_hash() {
        let mut server = mockito::Server::new_async().await;
        let hash = bs58::encode([5u8; 32]).into_string();
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(json!({"jsonrpc":"2.0","id":"x","result":{"header":{"hash": hash, "height": 10}}}).to_string())
            .create_async()
            .await;

        assert_eq!(client(server.url()).latest_block_hash().await.unwrap(), [5u8; 32]);
    }

    #[tokio::test]
    async fn test_access_key_nonce() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","id":"x","result":{"nonce":41,"permission":"FullAccess","block_height":1,"block_hash":"x"}}"#)
            .create_async()
            .await;

        let nonce = client(server.url())
            .access_key_nonce("alice.testnet", "ed25519:abc")
            .await
            .unwrap();
        assert_eq!(nonce, 41);
    }

    #[test]
    fn test_balance_failures_classified() {
        let err = classify_rpc_error(
            "broadcast_tx_commit",
            &json!({"data": {"TxExecutionError": {"InvalidTxError": {"NotEnoughBalance": {}}}}}),
        );
        assert!(matches!(err, SdkError::InsufficientStorage(_)));
    }
}
