//! Request signing
//!
//! Two schemes:
//! - Orderly key (ed25519, base64) over `timestamp + METHOD + path [+ query] [+ body]`
//!   for every request.
//! - Trading key (secp256k1, hex) over the sorted `k=v&...` form of an
//!   order payload, added to the payload as `signature` before the outer
//!   Orderly-key signature is computed.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::canonical::{canonical_order_message, orderly_message, sorted_query_string, Params};
use super::{Clock, HttpMethod, SystemClock};
use crate::error::{SdkError, SdkResult};
use crate::keys::{AccountIdentity, OrderlyKeyPair, TradingKeyPair};

// Header names (lowercase on the wire)
pub const HEADER_ACCOUNT_ID: &str = "orderly-account-id";
pub const HEADER_KEY: &str = "orderly-key";
pub const HEADER_SIGNATURE: &str = "orderly-signature";
pub const HEADER_TIMESTAMP: &str = "orderly-timestamp";
pub const HEADER_TRADING_KEY: &str = "orderly-trading-key";
pub const HEADER_CONTENT_TYPE: &str = "content-type";

const CONTENT_TYPE_JSON: &str = "application/json";
const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

/// Field added to order payloads by the trading key
pub const SIGNATURE_FIELD: &str = "signature";

/// Envelope key wrapping batch rows
pub const BATCH_ORDERS_FIELD: &str = "orders";

/// Where request parameters contribute to the canonical message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadPlacement {
    /// Sorted, url-encoded query string
    Query,
    /// JSON body
    Body,
    /// No parameters
    None,
}

impl PayloadPlacement {
    /// DELETE and GET carry parameters in the query; POST and PUT in the body
    pub fn for_method(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Post | HttpMethod::Put => PayloadPlacement::Body,
            HttpMethod::Get | HttpMethod::Delete => PayloadPlacement::Query,
        }
    }
}

/// A request ready for the transport layer
#[derive(Debug, Clone, PartialEq)]
pub struct SignedRequest {
    pub timestamp: u64,
    pub method: HttpMethod,
    pub path: String,
    pub query: Option<String>,
    pub body: Option<String>,
    pub canonical_message: String,
    pub signature: String,
    pub headers: Vec<(&'static str, String)>,
}

impl SignedRequest {
    /// Path plus `?query` when present
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{}", self.path, q),
            None => self.path.clone(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Stateless signer over an account's key material
///
/// `Send + Sync`; safe to share behind an `Arc` and call concurrently.
#[derive(Clone)]
pub struct RequestSigner {
    identity: AccountIdentity,
    orderly_key: OrderlyKeyPair,
    trading_key: Option<TradingKeyPair>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("account_id", &self.identity.account_id())
            .field("orderly_key", &self.orderly_key.public_key())
            .field(
                "trading_key",
                &self.trading_key.as_ref().map(|k| k.public_key().to_string()),
            )
            .finish()
    }
}

impl RequestSigner {
    pub fn new(identity: AccountIdentity, orderly_key: OrderlyKeyPair) -> Self {
        Self {
            identity,
            orderly_key,
            trading_key: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_trading_key(mut self, trading_key: TradingKeyPair) -> Self {
        self.trading_key = Some(trading_key);
        self
    }

    /// Replace the timestamp source (fixed clocks make signatures reproducible)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn identity(&self) -> &AccountIdentity {
        &self.identity
    }

    pub fn orderly_key(&self) -> &OrderlyKeyPair {
        &self.orderly_key
    }

    pub fn trading_key(&self) -> Option<&TradingKeyPair> {
        self.trading_key.as_ref()
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Orderly-key signature over a bare timestamp (WebSocket auth)
    pub fn sign_timestamp(&self, timestamp: u64) -> SdkResult<String> {
        self.require_identity()?;
        Ok(self.orderly_key.sign(&timestamp.to_string()))
    }

    // ========================================================================
    // Orderly-key scheme
    // ========================================================================

    /// Sign a read or delete with the Orderly key
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - Absolute path starting with `/`, without query
    /// * `params` - Request parameters (may be empty)
    /// * `placement` - Where `params` contribute to the canonical message
    pub fn sign_request(
        &self,
        method: HttpMethod,
        path: &str,
        params: &Params,
        placement: PayloadPlacement,
    ) -> SdkResult<SignedRequest> {
        self.require_identity()?;
        self.build(method, path, params, placement, None)
    }

    // ========================================================================
    // Trading-key scheme
    // ========================================================================

    /// Add a trading-key `signature` field to an order payload
    pub fn sign_trading_payload(&self, params: &Params) -> SdkResult<Params> {
        let trading_key = self.require_trading_key()?;
        if params.contains_key(SIGNATURE_FIELD) {
            return Err(SdkError::Canonicalization(format!(
                "payload already contains a '{}' field",
                SIGNATURE_FIELD
            )));
        }

        let message = canonical_order_message(params)?;
        let signature = trading_key.sign(&message)?;

        let mut signed = params.clone();
        signed.insert(SIGNATURE_FIELD.to_string(), Value::String(signature));
        Ok(signed)
    }

    /// Sign a single order-mutating request
    ///
    /// The payload is trading-key signed, then the whole request is
    /// Orderly-key signed with the signed payload in the body (POST/PUT)
    /// or in the query string (DELETE).
    pub fn sign_order_request(
        &self,
        method: HttpMethod,
        path: &str,
        params: &Params,
    ) -> SdkResult<SignedRequest> {
        self.require_identity()?;
        let trading_key = self.require_trading_key()?;
        let signed_payload = self.sign_trading_payload(params)?;

        self.build(
            method,
            path,
            &signed_payload,
            PayloadPlacement::for_method(method),
            Some(trading_key),
        )
    }

    /// Sign a batch of order rows
    ///
    /// Each row is trading-key signed independently; the body is
    /// `{"orders":[row, ...]}` in the given row order.
    pub fn sign_batch_request(
        &self,
        method: HttpMethod,
        path: &str,
        rows: &[Params],
    ) -> SdkResult<SignedRequest> {
        self.require_identity()?;
        let trading_key = self.require_trading_key()?;
        if rows.is_empty() {
            return Err(SdkError::Canonicalization("batch has no rows".into()));
        }

        let signed_rows = rows
            .iter()
            .map(|row| self.sign_trading_payload(row).map(Value::Object))
            .collect::<SdkResult<Vec<_>>>()?;

        let mut envelope = Params::new();
        envelope.insert(BATCH_ORDERS_FIELD.to_string(), Value::Array(signed_rows));

        debug!(rows = rows.len(), path = %path, "Signed batch order rows");

        self.build(method, path, &envelope, PayloadPlacement::Body, Some(trading_key))
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn require_identity(&self) -> SdkResult<()> {
        if self.identity.account_id().trim().is_empty() {
            return Err(SdkError::MissingCredential("account_id is empty".into()));
        }
        if self.orderly_key.public_key().trim().is_empty() {
            return Err(SdkError::MissingCredential("orderly key is empty".into()));
        }
        Ok(())
    }

    fn require_trading_key(&self) -> SdkResult<&TradingKeyPair> {
        self.trading_key
            .as_ref()
            .ok_or_else(|| SdkError::MissingCredential("trading key not provisioned".into()))
    }

    fn build(
        &self,
        method: HttpMethod,
        path: &str,
        params: &Params,
        placement: PayloadPlacement,
        trading_key: Option<&TradingKeyPair>,
    ) -> SdkResult<SignedRequest> {
        if !path.starts_with('/') || path.contains('?') {
            return Err(SdkError::Canonicalization(format!(
                "path must be absolute and query-free: '{}'",
                path
            )));
        }

        let (query, body) = match placement {
            _ if params.is_empty() => (None, None),
            PayloadPlacement::Query => (Some(sorted_query_string(params)?), None),
            PayloadPlacement::Body => (None, Some(serde_json::to_string(params)?)),
            PayloadPlacement::None => {
                return Err(SdkError::Canonicalization(format!(
                    "{} {} has parameters but no payload placement",
                    method, path
                )))
            }
        };

        let timestamp = self.clock.now_ms();
        let canonical_message =
            orderly_message(timestamp, method, path, query.as_deref(), body.as_deref());
        let signature = self.orderly_key.sign(&canonical_message);

        let content_type = match method {
            HttpMethod::Post | HttpMethod::Put => CONTENT_TYPE_JSON,
            HttpMethod::Get | HttpMethod::Delete => CONTENT_TYPE_FORM,
        };

        let mut headers = vec![
            (HEADER_CONTENT_TYPE, content_type.to_string()),
            (HEADER_TIMESTAMP, timestamp.to_string()),
            (HEADER_ACCOUNT_ID, self.identity.account_id().to_string()),
            (HEADER_KEY, self.orderly_key.public_key().to_string()),
        ];
        if let Some(trading_key) = trading_key {
            headers.push((HEADER_TRADING_KEY, trading_key.public_key().to_string()));
        }
        headers.push((HEADER_SIGNATURE, signature.clone()));

        Ok(SignedRequest {
            timestamp,
            method,
            path: path.to_string(),
            query,
            body,
            canonical_message,
            signature,
            headers,
        })
    }
}
