//! Authenticated private WebSocket session
//!
//! Lifecycle: `Disconnected -> Connecting -> Authenticating -> Authenticated`,
//! then `Closing -> Disconnected` on `close()` or `Errored` when the stream
//! dies, the auth is refused or the keep-alive detects silence.
//!
//! On every (re)open, subscriptions registered earlier are sent again before
//! the auth request. Data frames go to a single callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::connect::{connect_tls, TlsWebSocketStream};
use super::reconnect::reconnect_with_backoff;
use super::types::{
    classify_frame, pong_frame, subscription_request, InboundFrame, SessionState, WsAuthParams,
    WsAuthRequest, WsSessionConfig,
};
use crate::error::{SdkError, SdkResult};
use crate::signing::{current_time_ms, RequestSigner};

type WsWriter = SplitSink<TlsWebSocketStream, Message>;
type WsReader = SplitStream<TlsWebSocketStream>;

/// Receives every inbound data frame
pub type MessageCallback = Arc<dyn Fn(Value) + Send + Sync>;

/// Grace period for the reader task after the close frame is sent
const READER_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

// ============================================================================
// Shared state
// ============================================================================

/// State visible to the session handle and its background tasks
struct SessionShared {
    state_tx: watch::Sender<SessionState>,
    last_inbound_ms: AtomicU64,
    callback: RwLock<Option<MessageCallback>>,
    subscriptions: Mutex<Vec<Value>>,
}

impl SessionShared {
    fn set_state(&self, state: SessionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "WS session state change");
        }
    }

    fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    fn touch(&self) {
        self.last_inbound_ms.store(current_time_ms(), Ordering::Relaxed);
    }

    fn dispatch(&self, value: Value) {
        let callback = self
            .callback
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        match callback {
            Some(cb) => cb(value),
            None => debug!("WS data frame dropped: no callback registered"),
        }
    }
}

/// Everything needed to open one connection; cheap to clone per attempt
#[derive(Clone)]
struct ConnectContext {
    url: String,
    signer: Arc<RequestSigner>,
    config: WsSessionConfig,
    shared: Arc<SessionShared>,
}

/// Live socket plus its background tasks
struct ActiveConnection {
    writer: Arc<Mutex<WsWriter>>,
    reader_handle: JoinHandle<()>,
    keepalive_handle: JoinHandle<()>,
    cancel: CancellationToken,
}

// ============================================================================
// WebSocketAuthSession
// ============================================================================

pub struct WebSocketAuthSession {
    ctx: ConnectContext,
    active: Option<ActiveConnection>,
}

impl WebSocketAuthSession {
    /// Session for the signer's account on its network's private endpoint
    pub fn new(signer: Arc<RequestSigner>, config: WsSessionConfig) -> Self {
        let url = signer.identity().private_ws_url();
        Self::with_url(signer, url, config)
    }

    /// Session against an explicit URL
    pub fn with_url(signer: Arc<RequestSigner>, url: impl Into<String>, config: WsSessionConfig) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Disconnected);
        Self {
            ctx: ConnectContext {
                url: url.into(),
                signer,
                config,
                shared: Arc::new(SessionShared {
                    state_tx,
                    last_inbound_ms: AtomicU64::new(0),
                    callback: RwLock::new(None),
                    subscriptions: Mutex::new(Vec::new()),
                }),
            },
            active: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.ctx.url
    }

    /// Register the data callback, replacing any previous one
    pub fn on_message<F>(&self, callback: F)
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        let mut slot = self
            .ctx
            .shared
            .callback
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(Arc::new(callback));
    }

    pub fn state(&self) -> SessionState {
        self.ctx.shared.state()
    }

    /// Watch state transitions (an `Errored` value means reconnect is due)
    pub fn state_changes(&self) -> watch::Receiver<SessionState> {
        self.ctx.shared.state_tx.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    /// Subscriptions that will be replayed on the next open
    pub async fn subscriptions(&self) -> Vec<Value> {
        self.ctx.shared.subscriptions.lock().await.clone()
    }

    /// Register a subscription request and send it if the socket is up
    pub async fn subscribe(&self, request: Value) -> SdkResult<()> {
        {
            let mut subs = self.ctx.shared.subscriptions.lock().await;
            if subs.contains(&request) {
                return Ok(());
            }
            subs.push(request.clone());
        }

        if let Some(active) = &self.active {
            if self.state() == SessionState::Authenticated {
                let mut writer = active.writer.lock().await;
                writer.send(Message::Text(request.to_string())).await?;
            }
        }
        Ok(())
    }

    /// Subscribe to a private topic such as `executionreport`
    pub async fn subscribe_topic(&self, topic: &str) -> SdkResult<()> {
        let exists = self
            .ctx
            .shared
            .subscriptions
            .lock()
            .await
            .iter()
            .any(|sub| sub.get("topic").and_then(Value::as_str) == Some(topic));
        if exists {
            return Ok(());
        }
        self.subscribe(subscription_request(topic)).await
    }

    /// Open the socket, replay subscriptions and authenticate
    pub async fn connect(&mut self) -> SdkResult<()> {
        if self.active.is_some() {
            self.teardown().await;
        }
        let active = establish(self.ctx.clone()).await?;
        self.active = Some(active);
        Ok(())
    }

    /// Drop the current connection and authenticate again with backoff
    pub async fn reconnect(&mut self) -> SdkResult<()> {
        warn!(url = %self.ctx.url, "Reconnecting private stream");
        self.teardown().await;

        let ctx = self.ctx.clone();
        let config = ctx.config.reconnect.clone();
        let active =
            reconnect_with_backoff(config, "orderly-private-ws", move || establish(ctx.clone())).await?;
        self.active = Some(active);

        info!(url = %self.ctx.url, "Private stream reconnected");
        Ok(())
    }

    /// Stop keep-alive and reader tasks, then close the socket
    pub async fn close(&mut self) -> SdkResult<()> {
        if self.active.is_none() {
            self.ctx.shared.set_state(SessionState::Disconnected);
            return Ok(());
        }
        self.ctx.shared.set_state(SessionState::Closing);
        self.teardown().await;
        info!(url = %self.ctx.url, "Private stream closed");
        Ok(())
    }

    async fn teardown(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        // keep-alive stops before the socket goes away
        active.cancel.cancel();
        let _ = active.keepalive_handle.await;

        {
            let mut writer = active.writer.lock().await;
            let _ = writer.send(Message::Close(None)).await;
            let _ = writer.close().await;
        }

        let mut reader_handle = active.reader_handle;
        if tokio::time::timeout(READER_SHUTDOWN_GRACE, &mut reader_handle)
            .await
            .is_err()
        {
            reader_handle.abort();
        }

        self.ctx.shared.set_state(SessionState::Disconnected);
    }
}

impl Drop for WebSocketAuthSession {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
            active.keepalive_handle.abort();
            active.reader_handle.abort();
        }
    }
}

// ============================================================================
// Connection setup
// ============================================================================

/// Build the auth request for `timestamp`
pub fn auth_request(signer: &RequestSigner, timestamp: u64) -> SdkResult<WsAuthRequest> {
    let sign = signer.sign_timestamp(timestamp)?;
    Ok(WsAuthRequest::new(
        uuid::Uuid::new_v4().to_string(),
        WsAuthParams {
            orderly_key: signer.orderly_key().public_key().to_string(),
            sign,
            timestamp: timestamp.to_string(),
        },
    ))
}

async fn establish(ctx: ConnectContext) -> SdkResult<ActiveConnection> {
    let shared = ctx.shared.clone();
    shared.set_state(SessionState::Connecting);

    let stream = match connect_tls(&ctx.url).await {
        Ok(stream) => stream,
        Err(e) => {
            error!(url = %ctx.url, error = %e, "WS connect failed");
            shared.set_state(SessionState::Errored);
            return Err(e);
        }
    };
    info!(url = %ctx.url, "WS connected");

    let (write, mut read) = stream.split();
    let writer = Arc::new(Mutex::new(write));
    shared.touch();

    if let Err(e) = open_handshake(&ctx, &writer, &mut read).await {
        shared.set_state(SessionState::Errored);
        let mut w = writer.lock().await;
        let _ = w.close().await;
        return Err(e);
    }

    shared.set_state(SessionState::Authenticated);
    info!(
        account_id = %ctx.signer.identity().account_id(),
        "WS authenticated"
    );

    let cancel = CancellationToken::new();
    let reader_handle = tokio::spawn(message_reader_loop(
        read,
        Arc::clone(&writer),
        Arc::clone(&shared),
        cancel.clone(),
    ));
    let keepalive_handle = tokio::spawn(keepalive_loop(
        Arc::clone(&writer),
        Arc::clone(&shared),
        ctx.config.clone(),
        cancel.clone(),
    ));

    Ok(ActiveConnection {
        writer,
        reader_handle,
        keepalive_handle,
        cancel,
    })
}

/// Replay subscriptions, send auth and wait for the acknowledgement
///
/// The auth timestamp is taken once the socket is open.
async fn open_handshake(
    ctx: &ConnectContext,
    writer: &Arc<Mutex<WsWriter>>,
    read: &mut WsReader,
) -> SdkResult<()> {
    let subscriptions = ctx.shared.subscriptions.lock().await.clone();
    {
        let mut w = writer.lock().await;
        for sub in &subscriptions {
            w.send(Message::Text(sub.to_string())).await?;
        }
        if !subscriptions.is_empty() {
            debug!(count = subscriptions.len(), "Replayed subscriptions");
        }

        ctx.shared.set_state(SessionState::Authenticating);
        let auth = auth_request(&ctx.signer, ctx.signer.now_ms())?;
        w.send(Message::Text(serde_json::to_string(&auth)?)).await?;
    }

    let timeout = ctx.config.auth_timeout;
    match tokio::time::timeout(timeout, await_auth_ack(writer, read, &ctx.shared)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "WS auth not acknowledged");
            Err(SdkError::AuthenticationFailed(format!(
                "no auth acknowledgement within {}ms",
                timeout.as_millis()
            )))
        }
    }
}

async fn await_auth_ack(
    writer: &Arc<Mutex<WsWriter>>,
    read: &mut WsReader,
    shared: &SessionShared,
) -> SdkResult<()> {
    while let Some(msg) = read.next().await {
        let msg = msg?;
        shared.touch();
        match msg {
            Message::Text(text) => match classify_frame(&text) {
                Ok(InboundFrame::AuthAck { success: true, .. }) => return Ok(()),
                Ok(InboundFrame::AuthAck { success: false, message }) => {
                    let reason = message.unwrap_or_else(|| "auth refused".to_string());
                    error!(reason = %reason, "WS auth rejected");
                    return Err(SdkError::AuthenticationFailed(reason));
                }
                Ok(InboundFrame::Ping) => {
                    writer.lock().await.send(Message::Text(pong_frame())).await?;
                }
                Ok(InboundFrame::Pong) => {}
                Ok(InboundFrame::Data(value)) => shared.dispatch(value),
                Err(e) => debug!(error = %e, "Ignoring frame during auth"),
            },
            Message::Close(frame) => {
                return Err(SdkError::AuthenticationFailed(format!(
                    "socket closed during auth: {:?}",
                    frame
                )));
            }
            _ => {}
        }
    }
    Err(SdkError::AuthenticationFailed("stream ended during auth".into()))
}

// ============================================================================
// Background tasks
// ============================================================================

/// Dispatch data frames, answer server pings, flag dead streams
async fn message_reader_loop(
    mut read: WsReader,
    writer: Arc<Mutex<WsWriter>>,
    shared: Arc<SessionShared>,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = read.next() => next,
        };

        let msg = match next {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                if !cancel.is_cancelled() {
                    error!(error = %e, "WS read error");
                    shared.set_state(SessionState::Errored);
                    cancel.cancel();
                }
                break;
            }
            None => {
                if !cancel.is_cancelled() {
                    warn!("WS stream ended");
                    shared.set_state(SessionState::Errored);
                    cancel.cancel();
                }
                break;
            }
        };

        shared.touch();
        match msg {
            Message::Text(text) => match classify_frame(&text) {
                Ok(InboundFrame::Ping) => {
                    let mut w = writer.lock().await;
                    if let Err(e) = w.send(Message::Text(pong_frame())).await {
                        warn!(error = %e, "Failed to answer server ping");
                    }
                }
                Ok(InboundFrame::Pong) => {}
                Ok(InboundFrame::AuthAck { success, .. }) => {
                    debug!(success, "Late auth frame ignored");
                }
                Ok(InboundFrame::Data(value)) => shared.dispatch(value),
                Err(e) => warn!(error = %e, "Unparseable WS frame"),
            },
            Message::Close(frame) => {
                if !cancel.is_cancelled() {
                    warn!(frame = ?frame, "WS closed by server");
                    shared.set_state(SessionState::Errored);
                    cancel.cancel();
                }
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Binary(data) => debug!(bytes = data.len(), "Binary WS frame ignored"),
            _ => {}
        }
    }
    debug!("WS reader loop exited");
}

/// Send `{"event":"pong"}` each interval; silence past the window is fatal
async fn keepalive_loop(
    writer: Arc<Mutex<WsWriter>>,
    shared: Arc<SessionShared>,
    config: WsSessionConfig,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(config.keepalive_interval);
    interval.tick().await;
    let window_ms = config.liveness_window().as_millis() as u64;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        {
            let mut w = writer.lock().await;
            if let Err(e) = w.send(Message::Text(pong_frame())).await {
                if !cancel.is_cancelled() {
                    error!(error = %e, "Keep-alive send failed");
                    shared.set_state(SessionState::Errored);
                    cancel.cancel();
                }
                break;
            }
        }

        let silent_ms = current_time_ms().saturating_sub(shared.last_inbound_ms.load(Ordering::Relaxed));
        if silent_ms >= window_ms {
            warn!(
                silent_ms,
                max_missed = config.max_missed_keepalives,
                "No inbound frames, connection considered dead"
            );
            shared.set_state(SessionState::Errored);
            cancel.cancel();
            break;
        }
    }
    debug!("Keep-alive loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkId;
    use crate::keys::{AccountIdentity, OrderlyKeyPair};
    use crate::signing::FixedClock;
    use std::sync::atomic::AtomicUsize;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    fn signer() -> Arc<RequestSigner> {
        let identity = AccountIdentity::new("alice.testnet", NetworkId::Testnet).unwrap();
        Arc::new(
            RequestSigner::new(identity, OrderlyKeyPair::generate())
                .with_clock(Arc::new(FixedClock(1_649_920_583_000))),
        )
    }

    fn fast_config() -> WsSessionConfig {
        WsSessionConfig {
            keepalive_interval: Duration::from_millis(50),
            max_missed_keepalives: 3,
            auth_timeout: Duration::from_millis(300),
            reconnect: crate::ws::ReconnectConfig {
                max_attempts: 2,
                initial_delay_ms: 10,
                max_delay_ms: 20,
            },
        }
    }

    /// Local server; `behaviour` drives one accepted connection
    async fn spawn_server<F, Fut>(behaviour: F) -> String
    where
        F: Fn(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let behaviour = Arc::new(behaviour);
        tokio::spawn(async move {
            while let Ok((tcp, _)) = listener.accept().await {
                let behaviour = behaviour.clone();
                tokio::spawn(async move {
                    if let Ok(ws) = accept_async(tcp).await {
                        behaviour(ws).await;
                    }
                });
            }
        });
        format!("ws://{}/ws/private/v1/alice.testnet", addr)
    }

    fn event_of(msg: &Message) -> Option<String> {
        match msg {
            Message::Text(text) => serde_json::from_str::<Value>(text)
                .ok()
                .and_then(|v| v.get("event").and_then(Value::as_str).map(str::to_string)),
            _ => None,
        }
    }

    #[test]
    fn test_auth_request_signs_timestamp() {
        let signer = signer();
        let req = auth_request(&signer, 1_649_920_583_000).unwrap();
        assert_eq!(req.event, "auth");
        assert_eq!(req.params.timestamp, "1649920583000");
        assert_eq!(req.params.orderly_key, signer.orderly_key().public_key());
        assert!(signer.orderly_key().verify("1649920583000", &req.params.sign));
    }

    #[tokio::test]
    async fn test_connect_authenticates_and_dispatches_data() {
        let url = spawn_server(|mut ws| async move {
            while let Some(Ok(msg)) = ws.next().await {
                if event_of(&msg).as_deref() == Some("auth") {
                    ws.send(Message::Text(r#"{"event":"auth","success":true}"#.into()))
                        .await
                        .unwrap();
                    ws.send(Message::Text(r#"{"topic":"executionreport","data":{"orderId":1}}"#.into()))
                        .await
                        .unwrap();
                }
            }
        })
        .await;

        let received = Arc::new(AtomicUsize::new(0));
        let counter = received.clone();
        let mut session = WebSocketAuthSession::with_url(signer(), url, fast_config());
        session.on_message(move |value| {
            if value["topic"] == "executionreport" {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        session.connect().await.unwrap();
        assert_eq!(session.state(), SessionState::Authenticated);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(received.load(Ordering::SeqCst), 1);

        session.close().await.unwrap();
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    /// Clock the test server can move
    struct SharedClock(Arc<AtomicU64>);

    impl crate::signing::Clock for SharedClock {
        fn now_ms(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn test_auth_timestamp_taken_after_socket_opens() {
        let now = Arc::new(AtomicU64::new(1_000));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Value>();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server_clock = now.clone();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            // the client cannot finish its handshake before this point
            server_clock.store(2_000, Ordering::SeqCst);
            let mut ws = accept_async(tcp).await.unwrap();
            while let Some(Ok(msg)) = ws.next().await {
                if event_of(&msg).as_deref() == Some("auth") {
                    if let Message::Text(text) = &msg {
                        let _ = tx.send(serde_json::from_str(text).unwrap());
                    }
                    ws.send(Message::Text(r#"{"event":"auth","success":true}"#.into()))
                        .await
                        .unwrap();
                }
            }
        });

        let identity = AccountIdentity::new("alice.testnet", NetworkId::Testnet).unwrap();
        let orderly_key = OrderlyKeyPair::generate();
        let signer = Arc::new(
            RequestSigner::new(identity, orderly_key.clone()).with_clock(Arc::new(SharedClock(now))),
        );

        let mut session =
            WebSocketAuthSession::with_url(signer, format!("ws://{}/ws/alice.testnet", addr), fast_config());
        session.connect().await.unwrap();

        let auth = rx.recv().await.unwrap();
        assert_eq!(auth["params"]["timestamp"], "2000");
        assert!(orderly_key.verify("2000", auth["params"]["sign"].as_str().unwrap()));

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_subscriptions_replayed_before_auth() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
        let url = spawn_server(move |mut ws| {
            let tx = tx.clone();
            async move {
                while let Some(Ok(msg)) = ws.next().await {
                    if let Some(event) = event_of(&msg) {
                        let _ = tx.send(event.clone());
                        if event == "auth" {
                            ws.send(Message::Text(r#"{"event":"auth","success":true}"#.into()))
                                .await
                                .unwrap();
                        }
                    }
                }
            }
        })
        .await;

        let mut session = WebSocketAuthSession::with_url(signer(), url, fast_config());
        session.subscribe_topic("executionreport").await.unwrap();
        session.subscribe_topic("executionreport").await.unwrap();
        assert_eq!(session.subscriptions().await.len(), 1);

        session.connect().await.unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("subscribe"));
        assert_eq!(rx.recv().await.as_deref(), Some("auth"));

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_auth_rejection_is_errored() {
        let url = spawn_server(|mut ws| async move {
            while let Some(Ok(msg)) = ws.next().await {
                if event_of(&msg).as_deref() == Some("auth") {
                    ws.send(Message::Text(
                        r#"{"event":"auth","success":false,"errorMsg":"invalid signature"}"#.into(),
                    ))
                    .await
                    .unwrap();
                }
            }
        })
        .await;

        let mut session = WebSocketAuthSession::with_url(signer(), url, fast_config());
        let err = session.connect().await.unwrap_err();
        assert!(matches!(err, SdkError::AuthenticationFailed(ref m) if m.contains("invalid signature")));
        assert_eq!(session.state(), SessionState::Errored);

        // refused credentials are not retried
        let err = session.reconnect().await.unwrap_err();
        assert!(matches!(err, SdkError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn test_auth_timeout() {
        let url = spawn_server(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} }).await;

        let mut session = WebSocketAuthSession::with_url(signer(), url, fast_config());
        let err = session.connect().await.unwrap_err();
        assert!(matches!(err, SdkError::AuthenticationFailed(ref m) if m.contains("acknowledgement")));
        assert_eq!(session.state(), SessionState::Errored);
    }

    #[tokio::test]
    async fn test_server_ping_answered_and_keepalive_sent() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
        let url = spawn_server(move |mut ws| {
            let tx = tx.clone();
            async move {
                while let Some(Ok(msg)) = ws.next().await {
                    match event_of(&msg).as_deref() {
                        Some("auth") => {
                            ws.send(Message::Text(r#"{"event":"auth","success":true}"#.into()))
                                .await
                                .unwrap();
                            ws.send(Message::Text(r#"{"event":"ping","ts":1}"#.into()))
                                .await
                                .unwrap();
                        }
                        Some("pong") => {
                            let _ = tx.send("pong".into());
                        }
                        _ => {}
                    }
                }
            }
        })
        .await;

        let mut session = WebSocketAuthSession::with_url(signer(), url, fast_config());
        session.connect().await.unwrap();

        let first = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await.unwrap();
        let second = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await.unwrap();
        assert_eq!(first.as_deref(), Some("pong"));
        assert_eq!(second.as_deref(), Some("pong"));

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_silent_server_marks_session_errored() {
        let url = spawn_server(|mut ws| async move {
            // ack, then swallow everything without replying
            while let Some(Ok(msg)) = ws.next().await {
                if event_of(&msg).as_deref() == Some("auth") {
                    ws.send(Message::Text(r#"{"event":"auth","success":true}"#.into()))
                        .await
                        .unwrap();
                }
            }
        })
        .await;

        let mut session = WebSocketAuthSession::with_url(signer(), url, fast_config());
        let mut changes = session.state_changes();
        session.connect().await.unwrap();

        let errored = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if *changes.borrow_and_update() == SessionState::Errored {
                    return;
                }
                if changes.changed().await.is_err() {
                    return;
                }
            }
        })
        .await;
        assert!(errored.is_ok());
        assert_eq!(session.state(), SessionState::Errored);

        session.reconnect().await.unwrap();
        assert_eq!(session.state(), SessionState::Authenticated);
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_without_connect() {
        let mut session = WebSocketAuthSession::with_url(signer(), "ws://127.0.0.1:1", fast_config());
        session.close().await.unwrap();
        assert_eq!(session.state(), SessionState::Disconnected);
    }
}
