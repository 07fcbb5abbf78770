//! Shared HTTP client construction

use std::time::Duration;

const HTTP_CONNECT_TIMEOUT_MS: u64 = 5_000;
const HTTP_POOL_MAX_IDLE: usize = 4;
const HTTP_POOL_IDLE_TIMEOUT_SECS: u64 = 60;
const HTTP_TCP_KEEPALIVE_SECS: u64 = 30;

/// Create a pooled HTTP client for one remote service
///
/// # Arguments
/// * `service` - Name used in logs (e.g. `near-rpc`, `orderly-rest`)
/// * `request_timeout` - Whole-request timeout
pub fn create_http_client(service: &str, request_timeout: Duration) -> reqwest::Client {
    let client = reqwest::Client::builder()
        .timeout(request_timeout)
        .pool_max_idle_per_host(HTTP_POOL_MAX_IDLE)
        .pool_idle_timeout(Duration::from_secs(HTTP_POOL_IDLE_TIMEOUT_SECS))
        .tcp_keepalive(Duration::from_secs(HTTP_TCP_KEEPALIVE_SECS))
        .connect_timeout(Duration::from_millis(HTTP_CONNECT_TIMEOUT_MS))
        .tcp_nodelay(true)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());
    tracing::info!(
        phase = "init",
        service = %service,
        timeout_ms = request_timeout.as_millis() as u64,
        connect_timeout_ms = HTTP_CONNECT_TIMEOUT_MS,
        pool_max_idle = HTTP_POOL_MAX_IDLE,
        "HTTP client configured"
    );
    client
}

/// Map a reqwest failure onto the SDK taxonomy
pub(crate) fn map_reqwest_error(context: &str, err: reqwest::Error, timeout: Duration) -> crate::error::SdkError {
    if err.is_timeout() {
        crate::error::SdkError::NetworkTimeout(timeout.as_millis() as u64)
    } else {
        crate::error::SdkError::Transport(format!("{}: {}", context, err))
    }
}
