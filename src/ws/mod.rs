//! Private WebSocket stream: connection, reconnect backoff and the
//! authenticated session

pub mod connect;
pub mod reconnect;
pub mod session;
pub mod types;

pub use connect::{connect_tls, TlsWebSocketStream};
pub use reconnect::{reconnect_with_backoff, ReconnectConfig};
pub use session::{auth_request, MessageCallback, WebSocketAuthSession};
pub use types::{pong_frame, subscription_request, SessionState, WsAuthParams, WsAuthRequest, WsSessionConfig};
