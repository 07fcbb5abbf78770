//! Private stream types: session state, settings and frame classification

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use super::reconnect::ReconnectConfig;
use crate::config::SdkConfig;
use crate::error::{SdkError, SdkResult};

/// Default keep-alive period
pub const WS_KEEPALIVE_INTERVAL_SECS: u64 = 10;

/// Consecutive silent keep-alive periods before the connection is declared dead
pub const WS_MAX_MISSED_KEEPALIVES: u32 = 3;

/// Default wait for the auth acknowledgement
pub const WS_AUTH_TIMEOUT_MS: u64 = 10_000;

/// Lifecycle of a private stream session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Authenticating,
    Authenticated,
    Closing,
    Errored,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Authenticating => "authenticating",
            SessionState::Authenticated => "authenticated",
            SessionState::Closing => "closing",
            SessionState::Errored => "errored",
        };
        f.write_str(s)
    }
}

/// Session tunables
#[derive(Debug, Clone)]
pub struct WsSessionConfig {
    pub keepalive_interval: Duration,
    pub max_missed_keepalives: u32,
    pub auth_timeout: Duration,
    pub reconnect: ReconnectConfig,
}

impl Default for WsSessionConfig {
    fn default() -> Self {
        Self {
            keepalive_interval: Duration::from_secs(WS_KEEPALIVE_INTERVAL_SECS),
            max_missed_keepalives: WS_MAX_MISSED_KEEPALIVES,
            auth_timeout: Duration::from_millis(WS_AUTH_TIMEOUT_MS),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl From<&SdkConfig> for WsSessionConfig {
    fn from(config: &SdkConfig) -> Self {
        Self {
            keepalive_interval: Duration::from_secs(config.keepalive.interval_secs),
            max_missed_keepalives: config.keepalive.max_missed,
            auth_timeout: Duration::from_millis(config.timeouts.ws_auth_ms),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl WsSessionConfig {
    /// Silence after which the connection is considered dead
    pub fn liveness_window(&self) -> Duration {
        self.keepalive_interval * self.max_missed_keepalives.max(1)
    }
}

// ============================================================================
// Outbound payloads
// ============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WsAuthParams {
    pub orderly_key: String,
    pub sign: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WsAuthRequest {
    pub id: String,
    pub event: &'static str,
    pub params: WsAuthParams,
}

impl WsAuthRequest {
    pub fn new(id: impl Into<String>, params: WsAuthParams) -> Self {
        Self {
            id: id.into(),
            event: "auth",
            params,
        }
    }
}

/// Keep-alive frame sent every interval and in answer to server pings
pub fn pong_frame() -> String {
    r#"{"event":"pong"}"#.to_string()
}

/// `{"id", "topic", "event": "subscribe"}` for a private topic
pub fn subscription_request(topic: &str) -> Value {
    serde_json::json!({
        "id": uuid::Uuid::new_v4().to_string(),
        "topic": topic,
        "event": "subscribe",
    })
}

// ============================================================================
// Inbound frames
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum InboundFrame {
    AuthAck { success: bool, message: Option<String> },
    Ping,
    Pong,
    Data(Value),
}

/// Classify a text frame by its `event` field
pub(crate) fn classify_frame(text: &str) -> SdkResult<InboundFrame> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| SdkError::InvalidResponse(format!("non-JSON frame: {}", e)))?;

    match value.get("event").and_then(Value::as_str) {
        Some("auth") => Ok(InboundFrame::AuthAck {
            success: value.get("success").and_then(Value::as_bool).unwrap_or(false),
            message: value
                .get("errorMsg")
                .or_else(|| value.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string),
        }),
        Some("ping") => Ok(InboundFrame::Ping),
        Some("pong") => Ok(InboundFrame::Pong),
        _ => Ok(InboundFrame::Data(value)),
    }
}
