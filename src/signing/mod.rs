//! Canonical messages and request signatures
//!
//! Pure functions of key material plus request shape; timestamps come
//! from an injectable `Clock`.

mod canonical;
mod signer;

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

pub use canonical::{canonical_order_message, orderly_message, sorted_query_string, Params};
pub use signer::{
    PayloadPlacement, RequestSigner, SignedRequest, BATCH_ORDERS_FIELD, HEADER_ACCOUNT_ID,
    HEADER_CONTENT_TYPE, HEADER_KEY, HEADER_SIGNATURE, HEADER_TIMESTAMP, HEADER_TRADING_KEY,
    SIGNATURE_FIELD,
};

/// HTTP methods used by the exchange API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Millisecond timestamp source
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        current_time_ms()
    }
}

/// Always returns the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_ms(&self) -> u64 {
        self.0
    }
}

/// Current Unix timestamp in milliseconds
#[inline]
pub fn current_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
