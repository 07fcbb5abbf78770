//! Private REST endpoints signed with the Orderly and trading keys

mod client;
mod types;

pub use client::{
    RestClient, PATH_BATCH_ORDER, PATH_CLIENT_INFO, PATH_CLIENT_LEVERAGE, PATH_ORDER, PATH_ORDERS,
};
pub use types::{
    AccountInformation, ApiResponse, BatchOrderData, CancelData, CancelOrderRequest,
    CancelOrdersRequest, CreateOrderData, CreateOrderRequest, GetOrdersRequest, Leverage,
    LeverageData, Order, OrderSide, OrderStatus, OrderType, OrdersPage, PaginationMeta,
    RestApiErrorCode,
};
