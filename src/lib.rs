//! Orderly DEX on NEAR - client SDK
//!
//! Key hierarchy provisioning and request signing:
//! - Account, Orderly (ed25519) and trading (secp256k1) keys
//! - Idempotent on-chain provisioning against the asset manager contract
//! - Canonical messages and request signatures for REST
//! - Authenticated private WebSocket stream with keep-alive

pub mod config;
pub mod error;
pub mod http;
pub mod keys;
pub mod near;
pub mod provisioning;
pub mod rest;
pub mod session;
pub mod signing;
pub mod ws;

pub use error::{SdkError, SdkResult};
pub use session::OrderlySession;
