//! WebSocket connection helper

use tokio_tungstenite::{connect_async_tls_with_config, Connector, MaybeTlsStream, WebSocketStream};

use crate::error::{SdkError, SdkResult};

/// WebSocket stream over TCP, TLS for `wss://`
pub type TlsWebSocketStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Connect to a WebSocket endpoint (TLSv1.2 minimum for `wss://`)
///
/// # Arguments
/// * `url` - `wss://` endpoint (plain `ws://` is accepted for local servers)
pub async fn connect_tls(url: &str) -> SdkResult<TlsWebSocketStream> {
    let tls = native_tls::TlsConnector::builder()
        .min_protocol_version(Some(native_tls::Protocol::Tlsv12))
        .build()
        .map_err(|e| SdkError::Transport(format!("TLS error: {}", e)))?;

    let (ws_stream, _response) =
        connect_async_tls_with_config(url, None, false, Some(Connector::NativeTls(tls)))
            .await
            .map_err(SdkError::from)?;

    Ok(ws_stream)
}
