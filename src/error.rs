//! SDK-wide error types using thiserror
//!
//! Every fallible operation in the crate returns `SdkResult<T>`.
//! Credential and encoding errors are raised before any network I/O;
//! remote rejections carry the exchange's code and message untouched.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SdkError {
    /// An identity field or key required for the operation is absent
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    /// Key material could not be decoded (bad hex/base58/length/curve point)
    #[error("Malformed key: {0}")]
    MalformedKey(String),

    /// Request parameters cannot be turned into a canonical message
    #[error("Canonicalization error: {0}")]
    Canonicalization(String),

    /// On-chain state kept disagreeing with the writes we just made
    #[error("Provisioning conflict: {0}")]
    ProvisioningConflict(String),

    /// The account cannot fund the storage needed for a key announcement
    #[error("Insufficient storage: {0}")]
    InsufficientStorage(String),

    /// RPC or HTTP transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The exchange rejected the request; code and message are verbatim
    #[error("Request rejected ({code}): {message}")]
    SignatureRejected { code: i64, message: String },

    /// WebSocket auth handshake was refused or never acknowledged
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Network timeout after {0}ms")]
    NetworkTimeout(u64),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// WebSocket protocol error (boxed to reduce enum size)
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SdkError {
    /// Whether the caller may reasonably retry the same operation later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SdkError::Transport(_) | SdkError::NetworkTimeout(_) | SdkError::WebSocket(_)
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SdkError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        SdkError::WebSocket(Box::new(err))
    }
}

/// Result type alias for SDK operations
pub type SdkResult<T> = std::result::Result<T, SdkError>;
