//! Signed REST client for the private Orderly endpoints

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};

use super::types::{
    to_params, AccountInformation, ApiResponse, BatchOrderData, CancelData, CancelOrderRequest,
    CancelOrdersRequest, CreateOrderData, CreateOrderRequest, GetOrdersRequest, Leverage,
    LeverageData, Order, OrdersPage,
};
use crate::error::{SdkError, SdkResult};
use crate::http::map_reqwest_error;
use crate::signing::{HttpMethod, Params, PayloadPlacement, RequestSigner, SignedRequest};

pub const PATH_ORDER: &str = "/v1/order";
pub const PATH_BATCH_ORDER: &str = "/v1/batch-order";
pub const PATH_ORDERS: &str = "/v1/orders";
pub const PATH_CLIENT_INFO: &str = "/v1/client/info";
pub const PATH_CLIENT_LEVERAGE: &str = "/v1/client/leverage";

#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    signer: Arc<RequestSigner>,
    timeout: Duration,
}

impl RestClient {
    /// # Arguments
    /// * `http` - Shared client from `create_http_client`
    /// * `base_url` - Scheme and host, without a trailing `/v1`
    /// * `signer` - Signer holding the Orderly key (and trading key for orders)
    /// * `timeout` - Request timeout, reported in `NetworkTimeout`
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        signer: Arc<RequestSigner>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            signer,
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn signer(&self) -> &RequestSigner {
        &self.signer
    }

    // ========================================================================
    // Orders
    // ========================================================================

    /// POST /v1/order
    #[instrument(skip(self, request), fields(symbol = %request.symbol))]
    pub async fn create_order(&self, request: &CreateOrderRequest) -> SdkResult<CreateOrderData> {
        request.validate()?;
        let signed = self
            .signer
            .sign_order_request(HttpMethod::Post, PATH_ORDER, &to_params(request)?)?;
        self.send(signed).await
    }

    /// POST /v1/batch-order, rows signed independently in the given order
    #[instrument(skip(self, requests), fields(rows = requests.len()))]
    pub async fn create_batch_orders(
        &self,
        requests: &[CreateOrderRequest],
    ) -> SdkResult<Vec<CreateOrderData>> {
        let rows = requests
            .iter()
            .map(|r| r.validate().and_then(|_| to_params(r)))
            .collect::<SdkResult<Vec<Params>>>()?;
        let signed = self
            .signer
            .sign_batch_request(HttpMethod::Post, PATH_BATCH_ORDER, &rows)?;
        let data: BatchOrderData = self.send(signed).await?;
        Ok(data.rows)
    }

    /// DELETE /v1/order or /v1/client/order
    #[instrument(skip(self, request), fields(symbol = %request.symbol))]
    pub async fn cancel_order(&self, request: &CancelOrderRequest) -> SdkResult<CancelData> {
        request.validate()?;
        let signed = self.signer.sign_order_request(
            HttpMethod::Delete,
            request.path(),
            &to_params(request)?,
        )?;
        self.send(signed).await
    }

    /// DELETE /v1/orders for every open order on a symbol
    #[instrument(skip(self, request), fields(symbol = %request.symbol))]
    pub async fn cancel_orders(&self, request: &CancelOrdersRequest) -> SdkResult<CancelData> {
        let signed =
            self.signer
                .sign_order_request(HttpMethod::Delete, PATH_ORDERS, &to_params(request)?)?;
        self.send(signed).await
    }

    /// GET /v1/order/{order_id}
    pub async fn get_order(&self, order_id: u64) -> SdkResult<Order> {
        let path = format!("{}/{}", PATH_ORDER, order_id);
        let signed =
            self.signer
                .sign_request(HttpMethod::Get, &path, &Params::new(), PayloadPlacement::None)?;
        self.send(signed).await
    }

    /// GET /v1/orders with optional filters
    pub async fn get_orders(&self, request: &GetOrdersRequest) -> SdkResult<OrdersPage> {
        let signed = self.signer.sign_request(
            HttpMethod::Get,
            PATH_ORDERS,
            &to_params(request)?,
            PayloadPlacement::Query,
        )?;
        self.send(signed).await
    }

    // ========================================================================
    // Account
    // ========================================================================

    /// GET /v1/client/info
    pub async fn get_account_information(&self) -> SdkResult<AccountInformation> {
        let signed = self.signer.sign_request(
            HttpMethod::Get,
            PATH_CLIENT_INFO,
            &Params::new(),
            PayloadPlacement::None,
        )?;
        self.send(signed).await
    }

    /// POST /v1/client/leverage
    pub async fn update_leverage(&self, leverage: Leverage) -> SdkResult<Leverage> {
        let mut params = Params::new();
        params.insert("leverage".to_string(), leverage.value().into());
        let signed = self
            .signer
            .sign_order_request(HttpMethod::Post, PATH_CLIENT_LEVERAGE, &params)?;
        let data: LeverageData = self.send(signed).await?;
        Ok(data.leverage)
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Send exactly the signed query/body with the signed headers
    async fn send<T: DeserializeOwned>(&self, signed: SignedRequest) -> SdkResult<T> {
        let url = format!("{}{}", self.base_url, signed.path_and_query());
        let method = match signed.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.http.request(method, &url);
        for (name, value) in &signed.headers {
            builder = builder.header(*name, value);
        }
        if let Some(body) = signed.body {
            builder = builder.body(body);
        }

        debug!(method = %signed.method, path = %signed.path, timestamp = signed.timestamp, "REST request");

        let context = format!("{} {}", signed.method, signed.path);
        let response = builder
            .send()
            .await
            .map_err(|e| map_reqwest_error(&context, e, self.timeout))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(&context, e, self.timeout))?;

        let envelope: ApiResponse<T> = serde_json::from_str(&text).map_err(|e| {
            SdkError::InvalidResponse(format!(
                "{} returned HTTP {} with unexpected body: {}",
                context, status, e
            ))
        })?;

        envelope.into_result().map_err(|e| {
            if let SdkError::SignatureRejected { code, message } = &e {
                error!(request = %context, http_status = status.as_u16(), code, message = %message, "REST request rejected");
            }
            e
        })
    }
}
