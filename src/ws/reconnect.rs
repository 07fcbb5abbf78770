//! Reconnection with exponential backoff and jitter

use std::time::Duration;

use crate::error::{SdkError, SdkResult};

/// Configuration for reconnection attempts
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    pub max_attempts: u32,
    /// Initial delay in milliseconds (doubles each attempt)
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

impl ReconnectConfig {
    /// Capped exponential delay for `attempt` (0-based), without jitter
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(
            self.initial_delay_ms
                .saturating_mul(factor)
                .min(self.max_delay_ms),
        )
    }
}

/// Retry `connect_fn` with exponential backoff and 0-199ms jitter
///
/// Errors that are not retryable (bad credentials, refused auth) end the
/// loop immediately.
///
/// # Arguments
/// * `config` - Attempts and delays
/// * `name` - Connection name for logs
/// * `connect_fn` - Produces one connection attempt
pub async fn reconnect_with_backoff<T, F, Fut>(
    config: ReconnectConfig,
    name: &str,
    mut connect_fn: F,
) -> SdkResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = SdkResult<T>>,
{
    let mut last_error: Option<SdkError> = None;

    for attempt in 0..config.max_attempts {
        let jitter = Duration::from_millis(rand::random::<u64>() % 200);
        let backoff = config.base_delay(attempt) + jitter;

        tracing::info!(
            connection = %name,
            attempt = attempt + 1,
            max_attempts = config.max_attempts,
            backoff_ms = backoff.as_millis() as u64,
            "Reconnect attempt"
        );

        tokio::time::sleep(backoff).await;

        match connect_fn().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => {
                tracing::warn!(connection = %name, error = %e, "Reconnect aborted on non-retryable error");
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(connection = %name, attempt = attempt + 1, error = %e, "Reconnect attempt failed");
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        SdkError::Transport(format!("{}: reconnection failed after max attempts", name))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_config(max_attempts: u32) -> ReconnectConfig {
        ReconnectConfig {
            max_attempts,
            initial_delay_ms: 10,
            max_delay_ms: 100,
        }
    }

    #[tokio::test]
    async fn test_reconnect_succeeds_on_second_attempt() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = call_count.clone();

        let result = reconnect_with_backoff(fast_config(3), "test", || {
            let cc = cc.clone();
            async move {
                let n = cc.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err(SdkError::Transport("first try".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_reconnect_exhausts_attempts_and_returns_last_error() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = call_count.clone();

        let result: SdkResult<()> = reconnect_with_backoff(fast_config(3), "test", || {
            let cc = cc.clone();
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err(SdkError::Transport("always fail".into()))
            }
        })
        .await;

        assert_eq!(call_count.load(Ordering::SeqCst), 3);
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("always fail"), "Got: {}", msg);
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_retried() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = call_count.clone();

        let result: SdkResult<()> = reconnect_with_backoff(fast_config(5), "test", || {
            let cc = cc.clone();
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err(SdkError::AuthenticationFailed("invalid signature".into()))
            }
        })
        .await;

        assert!(matches!(result, Err(SdkError::AuthenticationFailed(_))));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_base_delay_doubles_and_caps() {
        let config = fast_config(10);
        assert_eq!(config.base_delay(0), Duration::from_millis(10));
        assert_eq!(config.base_delay(1), Duration::from_millis(20));
        assert_eq!(config.base_delay(3), Duration::from_millis(80));
        assert_eq!(config.base_delay(4), Duration::from_millis(100));
        assert_eq!(config.base_delay(70), Duration::from_millis(100));
    }
}
