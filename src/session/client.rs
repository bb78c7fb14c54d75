//! WebSocket session client
//!
//! Maintains one persistent connection to the remote multi-bot service.
//! A single connection task multiplexes outbound messages, inbound frames
//! and cancellation; every state change and notification happens under the
//! session lock so nothing leaks out after `disconnect` returns.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::core::config::SessionConfig;
use crate::core::{MultichatError, Notification, NotificationSink, Result};
use crate::session::protocol::{connect_url, decode_frame, encode_message, SessionState};

/// How long `disconnect` waits for the close handshake to be sent
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Mutable session data guarded by one lock
#[derive(Debug)]
struct Inner {
    state: SessionState,
    session_id: Option<String>,
    user_name: String,
    /// Incremented on every connect; stale connection tasks compare against it
    epoch: u64,
    outbound: Option<mpsc::UnboundedSender<String>>,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl Inner {
    fn release(&mut self) {
        self.session_id = None;
        self.outbound = None;
        self.cancel = None;
    }
}

/// Client side of the session protocol
pub struct SessionClient {
    endpoint: String,
    sink: NotificationSink,
    inner: Arc<Mutex<Inner>>,
}

impl SessionClient {
    /// Create a disconnected client for `endpoint` (a ws:// or wss:// URL)
    pub fn new(endpoint: impl Into<String>, sink: NotificationSink) -> Self {
        Self {
            endpoint: endpoint.into(),
            sink,
            inner: Arc::new(Mutex::new(Inner {
                state: SessionState::Disconnected,
                session_id: None,
                user_name: String::new(),
                epoch: 0,
                outbound: None,
                cancel: None,
                task: None,
            })),
        }
    }

    pub fn from_config(config: &SessionConfig, sink: NotificationSink) -> Self {
        Self::new(config.url.clone(), sink)
    }

    /// Open the connection.
    ///
    /// The transport being open moves the state to `Connected`; the session is
    /// ready for chat once the service sends `session_info`.
    pub async fn connect(&self, user_id: &str, user_name: &str) -> Result<()> {
        let epoch = {
            let mut inner = lock(&self.inner);
            if matches!(inner.state, SessionState::Connecting | SessionState::Connected) {
                return Err(MultichatError::AlreadyConnected);
            }
            inner.state = SessionState::Connecting;
            inner.epoch += 1;
            inner.user_name = user_name.to_string();
            inner.release();
            inner.epoch
        };

        let url = match connect_url(&self.endpoint, user_id, user_name) {
            Ok(url) => url,
            Err(e) => {
                let mut inner = lock(&self.inner);
                if inner.epoch == epoch && inner.state == SessionState::Connecting {
                    inner.state = SessionState::Disconnected;
                }
                return Err(e);
            }
        };

        tracing::info!(endpoint = %self.endpoint, user_id, "connecting session");

        let stream = match connect_async(url.as_str()).await {
            Ok((stream, _response)) => stream,
            Err(e) => {
                let error = MultichatError::from(e);
                finish(&self.inner, &self.sink, epoch, Some(error.to_string()));
                return Err(error);
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let mut inner = lock(&self.inner);
        if inner.epoch != epoch || inner.state != SessionState::Connecting {
            // disconnect() ran while the handshake was in flight
            return Err(MultichatError::transport("connection aborted"));
        }
        inner.state = SessionState::Connected;
        inner.outbound = Some(tx);
        inner.cancel = Some(cancel.clone());

        let connection = Connection {
            inner: self.inner.clone(),
            sink: self.sink.clone(),
            epoch,
            cancel,
        };
        inner.task = Some(tokio::spawn(connection.run(stream, rx)));
        tracing::debug!("session transport open");

        Ok(())
    }

    /// Send a chat message; fails fast unless the session is ready
    pub fn send(&self, content: &str) -> Result<()> {
        let inner = lock(&self.inner);
        if inner.state != SessionState::Connected {
            return Err(MultichatError::NotConnected(inner.state));
        }
        if inner.session_id.is_none() {
            return Err(MultichatError::NotReady);
        }

        let outbound = inner
            .outbound
            .as_ref()
            .ok_or_else(|| MultichatError::transport("transport unavailable"))?;
        let frame = encode_message(content, &inner.user_name)?;
        outbound
            .send(frame)
            .map_err(|_| MultichatError::transport("transport unavailable"))
    }

    /// Close the connection with a normal-closure code.
    ///
    /// Idempotent: only the first call after a connect has any effect, and
    /// no notification fires after it.
    pub async fn disconnect(&self) {
        let (cancel, task) = {
            let mut inner = lock(&self.inner);
            if !matches!(inner.state, SessionState::Connecting | SessionState::Connected) {
                return;
            }
            inner.state = SessionState::Closed;
            let cancel = inner.cancel.take();
            let task = inner.task.take();
            inner.release();
            self.sink.notify(Notification::Disconnected);
            (cancel, task)
        };

        tracing::info!("session disconnected");

        if let Some(cancel) = cancel {
            cancel.cancel();
        }
        if let Some(task) = task {
            if tokio::time::timeout(CLOSE_TIMEOUT, task).await.is_err() {
                tracing::warn!("close handshake timed out");
            }
        }
    }

    pub fn state(&self) -> SessionState {
        lock(&self.inner).state
    }

    pub fn session_id(&self) -> Option<String> {
        lock(&self.inner).session_id.clone()
    }

    /// Connected and assigned a session id
    pub fn is_ready(&self) -> bool {
        let inner = lock(&self.inner);
        inner.state == SessionState::Connected && inner.session_id.is_some()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        let mut inner = lock(&self.inner);
        if let Some(cancel) = inner.cancel.take() {
            cancel.cancel();
        }
        inner.state = SessionState::Closed;
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Move a live connection of `epoch` to `Disconnected`, reporting `error` first
fn finish(inner: &Mutex<Inner>, sink: &NotificationSink, epoch: u64, error: Option<String>) {
    let mut inner = lock(inner);
    if inner.epoch != epoch
        || !matches!(inner.state, SessionState::Connecting | SessionState::Connected)
    {
        return;
    }

    inner.state = SessionState::Disconnected;
    inner.release();
    inner.task = None;

    if let Some(error) = error {
        tracing::warn!("session transport failed: {}", error);
        sink.notify(Notification::Error(error));
    }
    sink.notify(Notification::Disconnected);
}

/// The task owning one open WebSocket
struct Connection {
    inner: Arc<Mutex<Inner>>,
    sink: NotificationSink,
    epoch: u64,
    cancel: CancellationToken,
}

impl Connection {
    async fn run(self, stream: WsStream, mut outbound: mpsc::UnboundedReceiver<String>) {
        let (mut ws_sender, mut ws_receiver) = stream.split();

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: "client disconnect".into(),
                    };
                    if let Err(e) = ws_sender.send(WsMessage::Close(Some(frame))).await {
                        tracing::debug!("close frame not sent: {}", e);
                    }
                    break;
                }

                Some(frame) = outbound.recv() => {
                    if let Err(e) = ws_sender.send(WsMessage::Text(frame)).await {
                        self.finish(Some(format!("send failed: {}", e)));
                        break;
                    }
                }

                received = ws_receiver.next() => {
                    match received {
                        Some(Ok(WsMessage::Text(text))) => self.handle_text(&text),
                        Some(Ok(WsMessage::Close(frame))) => {
                            let abnormal = frame
                                .as_ref()
                                .filter(|f| !matches!(f.code, CloseCode::Normal | CloseCode::Away))
                                .map(|f| format!("closed by server ({}): {}", f.code, f.reason));
                            self.finish(abnormal);
                            break;
                        }
                        Some(Ok(WsMessage::Binary(data))) => {
                            tracing::warn!(bytes = data.len(), "dropping binary frame");
                        }
                        // ping/pong are answered by tungstenite
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            self.finish(Some(e.to_string()));
                            break;
                        }
                        None => {
                            self.finish(None);
                            break;
                        }
                    }
                }
            }
        }

        tracing::debug!(epoch = self.epoch, "session connection task finished");
    }

    fn handle_text(&self, text: &str) {
        let notification = match decode_frame(text) {
            Ok(notification) => notification,
            Err(e) => {
                tracing::warn!("dropping frame: {}", e);
                return;
            }
        };

        let mut inner = lock(&self.inner);
        if inner.epoch != self.epoch || inner.state != SessionState::Connected {
            return;
        }
        if let Notification::Connected { ref session_id } = notification {
            tracing::info!(session_id = %session_id, "session ready");
            inner.session_id = Some(session_id.clone());
        }
        self.sink.notify(notification);
    }

    fn finish(&self, error: Option<String>) {
        finish(&self.inner, &self.sink, self.epoch, error);
    }
}
