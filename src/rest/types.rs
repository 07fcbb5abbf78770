//! REST request and response types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{SdkError, SdkResult};
use crate::signing::Params;

// ============================================================================
// Envelope
// ============================================================================

/// `{success, data, code, message, timestamp}` wrapper around every response
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<u64>,
}

impl<T> ApiResponse<T> {
    /// Unwrap `data`, turning a failed envelope into `SignatureRejected`
    pub fn into_result(self) -> SdkResult<T> {
        if !self.success {
            return Err(SdkError::SignatureRejected {
                code: self.code.unwrap_or(RestApiErrorCode::Unknown.code()),
                message: self.message.unwrap_or_default(),
            });
        }
        self.data
            .ok_or_else(|| SdkError::InvalidResponse("successful response without data".into()))
    }
}

/// Known exchange error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestApiErrorCode {
    Unknown,
    InvalidSignature,
    Unauthorized,
    TooManyRequest,
    UnknownParam,
    InvalidParam,
    ResourceNotFound,
    DuplicateRequest,
    QuantityTooHigh,
    CanNotWithdrawal,
    RpcNotConnect,
    RpcReject,
    RiskTooHigh,
    MinNotional,
    PriceFilter,
    SizeFilter,
    PercentageFilter,
}

impl RestApiErrorCode {
    const ALL: [RestApiErrorCode; 17] = [
        RestApiErrorCode::Unknown,
        RestApiErrorCode::InvalidSignature,
        RestApiErrorCode::Unauthorized,
        RestApiErrorCode::TooManyRequest,
        RestApiErrorCode::UnknownParam,
        RestApiErrorCode::InvalidParam,
        RestApiErrorCode::ResourceNotFound,
        RestApiErrorCode::DuplicateRequest,
        RestApiErrorCode::QuantityTooHigh,
        RestApiErrorCode::CanNotWithdrawal,
        RestApiErrorCode::RpcNotConnect,
        RestApiErrorCode::RpcReject,
        RestApiErrorCode::RiskTooHigh,
        RestApiErrorCode::MinNotional,
        RestApiErrorCode::PriceFilter,
        RestApiErrorCode::SizeFilter,
        RestApiErrorCode::PercentageFilter,
    ];

    pub fn code(self) -> i64 {
        match self {
            RestApiErrorCode::Unknown => -1000,
            RestApiErrorCode::InvalidSignature => -1001,
            RestApiErrorCode::Unauthorized => -1002,
            RestApiErrorCode::TooManyRequest => -1003,
            RestApiErrorCode::UnknownParam => -1004,
            RestApiErrorCode::InvalidParam => -1005,
            RestApiErrorCode::ResourceNotFound => -1006,
            RestApiErrorCode::DuplicateRequest => -1007,
            RestApiErrorCode::QuantityTooHigh => -1008,
            RestApiErrorCode::CanNotWithdrawal => -1009,
            RestApiErrorCode::RpcNotConnect => -1011,
            RestApiErrorCode::RpcReject => -1012,
            RestApiErrorCode::RiskTooHigh => -1101,
            RestApiErrorCode::MinNotional => -1102,
            RestApiErrorCode::PriceFilter => -1103,
            RestApiErrorCode::SizeFilter => -1104,
            RestApiErrorCode::PercentageFilter => -1105,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }
}

impl SdkError {
    /// Known exchange code carried by a `SignatureRejected` error
    pub fn rest_error_code(&self) -> Option<RestApiErrorCode> {
        match self {
            SdkError::SignatureRejected { code, .. } => RestApiErrorCode::from_code(*code),
            _ => None,
        }
    }
}

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Limit,
    Market,
    Ioc,
    Fok,
    PostOnly,
    Ask,
    Bid,
}

impl OrderType {
    /// Market-style orders may be sized in quote currency
    pub fn accepts_amount(self) -> bool {
        matches!(self, OrderType::Market | OrderType::Ask | OrderType::Bid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    Cancelled,
    PartialFilled,
    Filled,
    Rejected,
    Incomplete,
    Completed,
}

/// Account leverage, one of 1, 2, 3, 4, 5 or 10
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Leverage(u8);

impl Leverage {
    pub const ALLOWED: [u8; 6] = [1, 2, 3, 4, 5, 10];

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Leverage {
    type Error = SdkError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if Self::ALLOWED.contains(&value) {
            Ok(Leverage(value))
        } else {
            Err(SdkError::Canonicalization(format!(
                "leverage must be one of {:?}, got {}",
                Self::ALLOWED,
                value
            )))
        }
    }
}

impl From<Leverage> for u8 {
    fn from(leverage: Leverage) -> Self {
        leverage.0
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Serialize a request struct into signable parameters
pub(crate) fn to_params<T: Serialize>(request: &T) -> SdkResult<Params> {
    match serde_json::to_value(request)? {
        Value::Object(map) => Ok(map),
        other => Err(SdkError::Canonicalization(format!(
            "request must serialize to an object, got {}",
            other
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateOrderRequest {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker_id: Option<String>,
    pub order_type: OrderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_quantity: Option<f64>,
    /// Size in quote currency (MARKET/ASK/BID only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_quantity: Option<f64>,
    pub side: OrderSide,
}

impl CreateOrderRequest {
    pub fn limit(symbol: impl Into<String>, side: OrderSide, price: f64, quantity: f64) -> Self {
        Self {
            symbol: symbol.into(),
            client_order_id: None,
            broker_id: None,
            order_type: OrderType::Limit,
            order_price: Some(price),
            order_quantity: Some(quantity),
            order_amount: None,
            visible_quantity: None,
            side,
        }
    }

    pub fn market(symbol: impl Into<String>, side: OrderSide, quantity: f64) -> Self {
        Self {
            order_type: OrderType::Market,
            order_price: None,
            ..Self::limit(symbol, side, 0.0, quantity)
        }
    }

    pub fn with_client_order_id(mut self, id: impl Into<String>) -> Self {
        self.client_order_id = Some(id.into());
        self
    }

    /// Reject requests the exchange would refuse before signing them
    pub fn validate(&self) -> SdkResult<()> {
        let mut errors = Vec::new();

        if self.symbol.trim().is_empty() {
            errors.push("symbol is required");
        }
        if self.order_type != OrderType::Market && self.order_price.is_none() {
            errors.push("order_price is required");
        }
        if self.order_quantity.is_none() && !(self.order_type.accepts_amount() && self.order_amount.is_some()) {
            errors.push("order_quantity is required");
        }
        if self.order_amount.is_some() && !self.order_type.accepts_amount() {
            errors.push("order_amount is only valid for MARKET, ASK and BID orders");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SdkError::Canonicalization(errors.join(", ")))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancelOrderRequest {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
}

impl CancelOrderRequest {
    pub fn by_order_id(symbol: impl Into<String>, order_id: u64) -> Self {
        Self {
            symbol: symbol.into(),
            order_id: Some(order_id),
            client_order_id: None,
        }
    }

    pub fn by_client_order_id(symbol: impl Into<String>, client_order_id: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            order_id: None,
            client_order_id: Some(client_order_id.into()),
        }
    }

    /// Exactly one of `order_id` and `client_order_id` must be set
    pub fn validate(&self) -> SdkResult<()> {
        match (&self.order_id, &self.client_order_id) {
            (Some(_), None) | (None, Some(_)) => Ok(()),
            _ => Err(SdkError::Canonicalization(
                "pass exactly one of order_id or client_order_id".into(),
            )),
        }
    }

    pub(crate) fn path(&self) -> &'static str {
        if self.client_order_id.is_some() {
            "/v1/client/order"
        } else {
            "/v1/order"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancelOrdersRequest {
    pub symbol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GetOrdersRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<OrderSide>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_type: Option<OrderType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    /// 13-digit millisecond timestamps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_t: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_t: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Page size, at most 500
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateOrderData {
    pub order_id: u64,
    #[serde(default)]
    pub client_order_id: Option<String>,
    pub order_type: OrderType,
    #[serde(default)]
    pub order_price: Option<f64>,
    #[serde(default)]
    pub order_quantity: Option<f64>,
    #[serde(default)]
    pub order_amount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchOrderData {
    pub rows: Vec<CreateOrderData>,
}

/// `{"status": "CANCEL_SENT" | "CANCEL_ALL_SENT" | ...}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CancelData {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Order {
    pub order_id: u64,
    pub user_id: u64,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub executed: Option<f64>,
    #[serde(default)]
    pub visible: Option<f64>,
    pub symbol: String,
    pub side: OrderSide,
    pub status: OrderStatus,
    #[serde(default)]
    pub total_fee: Option<f64>,
    #[serde(default)]
    pub fee_asset: Option<String>,
    #[serde(default)]
    pub client_order_id: Option<Value>,
    #[serde(default)]
    pub average_executed_price: Option<f64>,
    pub created_time: u64,
    pub updated_time: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaginationMeta {
    pub total: u64,
    pub records_per_page: u64,
    pub current_page: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrdersPage {
    pub meta: PaginationMeta,
    pub rows: Vec<Order>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccountInformation {
    pub account_id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub account_mode: String,
    pub tier: String,
    pub taker_fee_rate: f64,
    pub maker_fee_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LeverageData {
    pub leverage: Leverage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failed_envelope_maps_to_signature_rejected() {
        let resp: ApiResponse<Value> = serde_json::from_value(json!({
            "success": false,
            "code": -1001,
            "message": "orderly signature is not valid"
        }))
        .unwrap();
        let err = resp.into_result().unwrap_err();
        match &err {
            SdkError::SignatureRejected { code, message } => {
                assert_eq!(*code, -1001);
                assert_eq!(message, "orderly signature is not valid");
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(err.rest_error_code(), Some(RestApiErrorCode::InvalidSignature));
    }

    #[test]
    fn test_success_without_data_is_invalid() {
        let resp: ApiResponse<Value> = serde_json::from_value(json!({"success": true})).unwrap();
        assert!(matches!(resp.into_result(), Err(SdkError::InvalidResponse(_))));
    }

    #[test]
    fn test_error_code_lookup() {
        assert_eq!(RestApiErrorCode::from_code(-1105), Some(RestApiErrorCode::PercentageFilter));
        assert_eq!(RestApiErrorCode::from_code(-1011), Some(RestApiErrorCode::RpcNotConnect));
        assert_eq!(RestApiErrorCode::from_code(-1010), None);
        assert_eq!(RestApiErrorCode::TooManyRequest.code(), -1003);
    }

    #[test]
    fn test_leverage_restricted() {
        for v in Leverage::ALLOWED {
            assert_eq!(Leverage::try_from(v).unwrap().value(), v);
        }
        assert!(Leverage::try_from(6).is_err());
        assert!(Leverage::try_from(0).is_err());
        assert!(serde_json::from_value::<Leverage>(json!(7)).is_err());
        assert_eq!(serde_json::to_value(Leverage::try_from(10).unwrap()).unwrap(), json!(10));
    }

    #[test]
    fn test_create_order_validation() {
        assert!(CreateOrderRequest::limit("SPOT_NEAR_USDC", OrderSide::Buy, 1.5, 2.0)
            .validate()
            .is_ok());
        assert!(CreateOrderRequest::market("SPOT_NEAR_USDC", OrderSide::Sell, 2.0)
            .validate()
            .is_ok());

        let mut no_price = CreateOrderRequest::limit("SPOT_NEAR_USDC", OrderSide::Buy, 1.0, 1.0);
        no_price.order_price = None;
        let err = no_price.validate().unwrap_err().to_string();
        assert!(err.contains("order_price is required"), "Got: {}", err);

        let mut amount_on_limit = CreateOrderRequest::limit("SPOT_NEAR_USDC", OrderSide::Buy, 1.0, 1.0);
        amount_on_limit.order_amount = Some(10.0);
        assert!(amount_on_limit.validate().is_err());

        let mut bid_by_amount = CreateOrderRequest::limit("SPOT_NEAR_USDC", OrderSide::Buy, 1.0, 1.0);
        bid_by_amount.order_type = OrderType::Bid;
        bid_by_amount.order_quantity = None;
        bid_by_amount.order_amount = Some(10.0);
        assert!(bid_by_amount.validate().is_ok());
    }

    #[test]
    fn test_create_order_params_skip_absent_fields() {
        let params = to_params(&CreateOrderRequest::market("SPOT_NEAR_USDC", OrderSide::Buy, 3.0)).unwrap();
        assert_eq!(params.get("order_type"), Some(&json!("MARKET")));
        assert_eq!(params.get("side"), Some(&json!("BUY")));
        assert!(!params.contains_key("order_price"));
        assert!(!params.contains_key("client_order_id"));
    }

    #[test]
    fn test_cancel_order_path_and_validation() {
        let by_id = CancelOrderRequest::by_order_id("SPOT_NEAR_USDC", 42);
        assert_eq!(by_id.path(), "/v1/order");
        assert!(by_id.validate().is_ok());

        let by_client = CancelOrderRequest::by_client_order_id("SPOT_NEAR_USDC", "abc");
        assert_eq!(by_client.path(), "/v1/client/order");

        let neither = CancelOrderRequest {
            symbol: "SPOT_NEAR_USDC".into(),
            order_id: None,
            client_order_id: None,
        };
        assert!(neither.validate().is_err());
    }

    #[test]
    fn test_order_entity_deserializes() {
        let order: Order = serde_json::from_value(json!({
            "order_id": 13, "user_id": 2, "price": 1.5, "type": "LIMIT",
            "quantity": 20, "amount": null, "executed": 20, "visible": 1,
            "symbol": "SPOT_NEAR_USDC", "side": "BUY", "status": "FILLED",
            "total_fee": 0.5, "fee_asset": "NEAR", "client_order_id": null,
            "average_executed_price": 1.5, "created_time": 1653563963000u64,
            "updated_time": 1653564213000u64
        }))
        .unwrap();
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.order_type, OrderType::Limit);
        assert_eq!(order.amount, None);
    }
}
