//! Reconnecting duplex stream to the speech-recognition backend.
//!
//! One `StreamTransport` owns one logical connection. On unexpected closure
//! it retries with a bounded backoff schedule and, after every successful
//! (re)connection, replays the session-scoped subscription state in order:
//! session binding, speaker binding, then start-transcription. Exhausting
//! the retry budget is terminal until the caller connects again.

use crate::error::ClientError;
use crate::transport::messages::{ClientMessage, ServerMessage};
use crate::transport::socket::{SocketConnector, SocketSink, SocketStream, WireFrame};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Failed,
}

/// Connection status reported to observers. Informational only: pause and
/// resume decisions belong to the session, not the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub attempt: u32,
    pub max_attempts: u32,
    pub next_retry_ms: Option<u64>,
}

/// Bounded reconnection policy.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    max_attempts: u32,
    delays_ms: Vec<u64>,
}

/// Hard cap on automatic reconnect attempts, regardless of configuration.
const MAX_RECONNECT_ATTEMPTS: u32 = 5;

impl ReconnectPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.min(MAX_RECONNECT_ATTEMPTS),
            delays_ms: vec![1_000, 2_000, 5_000, 10_000],
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the given 1-based attempt; the last configured delay
    /// repeats for the remaining attempts.
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        let idx = (attempt.saturating_sub(1) as usize).min(self.delays_ms.len() - 1);
        self.delays_ms[idx]
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(MAX_RECONNECT_ATTEMPTS)
    }
}

type MessageListener = Arc<dyn Fn(&ServerMessage) + Send + Sync>;
type StatusListener = Arc<dyn Fn(&ConnectionStatus) + Send + Sync>;
type ErrorListener = Arc<dyn Fn(&ClientError) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    message: Vec<MessageListener>,
    status: Vec<StatusListener>,
    error: Vec<ErrorListener>,
}

/// Session-scoped subscription state replayed after every (re)connection.
#[derive(Default)]
struct ReplayState {
    session: Option<ClientMessage>,
    speaker: Option<ClientMessage>,
    transcribe: Option<ClientMessage>,
}

impl ReplayState {
    fn frames(&self) -> Vec<ClientMessage> {
        [&self.session, &self.speaker, &self.transcribe]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }
}

struct Inner {
    connector: Box<dyn SocketConnector>,
    policy: ReconnectPolicy,
    url: StdMutex<String>,
    status: StdMutex<ConnectionStatus>,
    listeners: StdMutex<Listeners>,
    replay: StdMutex<ReplayState>,
    sink: Mutex<Option<Box<dyn SocketSink>>>,
    /// Bumped on every successful install and every caller-initiated
    /// disconnect; stale readers and pending reconnect timers compare their
    /// captured epoch against this and stand down.
    epoch: AtomicU64,
    /// Serializes connect attempts so concurrent `connect()` calls share one
    /// in-flight dial.
    connect_lock: Mutex<()>,
}

/// Reconnecting message channel carrying binary audio and JSON control
/// frames over a single logical stream.
pub struct StreamTransport {
    inner: Arc<Inner>,
}

impl StreamTransport {
    pub fn new(connector: Box<dyn SocketConnector>, url: &str, policy: ReconnectPolicy) -> Self {
        let max_attempts = policy.max_attempts();
        Self {
            inner: Arc::new(Inner {
                connector,
                policy,
                url: StdMutex::new(url.to_string()),
                status: StdMutex::new(ConnectionStatus {
                    state: ConnectionState::Disconnected,
                    attempt: 0,
                    max_attempts,
                    next_retry_ms: None,
                }),
                listeners: StdMutex::new(Listeners::default()),
                replay: StdMutex::new(ReplayState::default()),
                sink: Mutex::new(None),
                epoch: AtomicU64::new(0),
                connect_lock: Mutex::new(()),
            }),
        }
    }

    /// Current connection status snapshot.
    pub fn status(&self) -> ConnectionStatus {
        self.inner.status.lock().unwrap().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.status().state == ConnectionState::Connected
    }

    /// Change the backend URL at runtime.
    ///
    /// If connected and no transcription is in progress the transport
    /// reconnects transparently; mid-transcription the new URL only takes
    /// effect on the next (re)connect.
    pub async fn set_url(&self, url: &str) {
        *self.inner.url.lock().unwrap() = url.to_string();
        let transcribing = self.inner.replay.lock().unwrap().transcribe.is_some();
        if self.is_connected() && !transcribing {
            info!("Socket URL changed, reconnecting to {}", url);
            self.disconnect().await;
            if let Err(e) = self.connect().await {
                warn!("Reconnect to new URL failed: {}", e);
            }
        }
    }

    pub fn on_message(&self, handler: impl Fn(&ServerMessage) + Send + Sync + 'static) {
        self.inner
            .listeners
            .lock()
            .unwrap()
            .message
            .push(Arc::new(handler));
    }

    pub fn on_connection_status(&self, handler: impl Fn(&ConnectionStatus) + Send + Sync + 'static) {
        self.inner
            .listeners
            .lock()
            .unwrap()
            .status
            .push(Arc::new(handler));
    }

    pub fn on_error(&self, handler: impl Fn(&ClientError) + Send + Sync + 'static) {
        self.inner
            .listeners
            .lock()
            .unwrap()
            .error
            .push(Arc::new(handler));
    }

    pub fn remove_all_listeners(&self) {
        *self.inner.listeners.lock().unwrap() = Listeners::default();
    }

    /// Establish the connection. Idempotent: a no-op when already connected,
    /// and concurrent callers share one in-flight attempt.
    pub async fn connect(&self) -> crate::error::Result<()> {
        let _guard = self.inner.connect_lock.lock().await;
        if self.is_connected() {
            return Ok(());
        }

        self.inner
            .set_status(ConnectionState::Connecting, 0, None);

        let url = self.inner.url.lock().unwrap().clone();
        match self.inner.connector.connect(&url).await {
            Ok((sink, stream)) => {
                Inner::install(Arc::clone(&self.inner), sink, stream).await;
                Ok(())
            }
            Err(e) => {
                self.inner
                    .set_status(ConnectionState::Disconnected, 0, None);
                Err(ClientError::Connect {
                    url,
                    message: e.to_string(),
                })
            }
        }
    }

    /// Caller-initiated teardown. Cancels pending reconnect timers and never
    /// triggers automatic reconnection.
    pub async fn disconnect(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(mut sink) = self.inner.sink.lock().await.take() {
            let _ = sink.close().await;
        }
        self.inner
            .set_status(ConnectionState::Disconnected, 0, None);
    }

    /// Send raw audio bytes. A no-op with a warning while disconnected so a
    /// producer mid-frame never crashes.
    pub async fn send(&self, bytes: &[u8]) {
        let mut sink = self.inner.sink.lock().await;
        match sink.as_mut() {
            None => warn!("Dropping audio frame: transport not connected"),
            Some(s) => {
                if let Err(e) = s.send(WireFrame::Binary(bytes.to_vec())).await {
                    warn!("Audio send failed: {}", e);
                }
            }
        }
    }

    /// Send a JSON control message. Session/speaker/transcription bindings
    /// that reach the sink are recorded for replay after reconnection; a
    /// message dropped while disconnected is not. Same
    /// no-op-while-disconnected semantics as `send`.
    pub async fn send_control(&self, msg: &ClientMessage) {
        let json = match serde_json::to_string(msg) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to encode control message: {}", e);
                return;
            }
        };

        let mut sink = self.inner.sink.lock().await;
        match sink.as_mut() {
            None => {
                // A dropped message never becomes replay state, but a stop
                // still clears any recorded transcription so a later connect
                // does not resurrect it.
                if matches!(msg, ClientMessage::StopTranscribe) {
                    self.inner.track_subscription(msg);
                }
                warn!("Dropping control message: transport not connected");
            }
            Some(s) => {
                self.inner.track_subscription(msg);
                if let Err(e) = s.send(WireFrame::Text(json)).await {
                    warn!("Control send failed: {}", e);
                }
            }
        }
    }
}

impl Inner {
    fn set_status(&self, state: ConnectionState, attempt: u32, next_retry_ms: Option<u64>) {
        let status = {
            let mut current = self.status.lock().unwrap();
            current.state = state;
            current.attempt = attempt;
            current.next_retry_ms = next_retry_ms;
            current.clone()
        };
        for listener in self.status_listeners() {
            listener(&status);
        }
    }

    fn status_listeners(&self) -> Vec<StatusListener> {
        self.listeners.lock().unwrap().status.clone()
    }

    fn message_listeners(&self) -> Vec<MessageListener> {
        self.listeners.lock().unwrap().message.clone()
    }

    fn error_listeners(&self) -> Vec<ErrorListener> {
        self.listeners.lock().unwrap().error.clone()
    }

    fn track_subscription(&self, msg: &ClientMessage) {
        let mut replay = self.replay.lock().unwrap();
        match msg {
            ClientMessage::SetSession { .. } => replay.session = Some(msg.clone()),
            ClientMessage::SetSpeaker { .. } => replay.speaker = Some(msg.clone()),
            ClientMessage::StartTranscribe { .. } => replay.transcribe = Some(msg.clone()),
            ClientMessage::StopTranscribe => replay.transcribe = None,
            ClientMessage::EndTurn { .. } => {}
        }
    }

    /// Store the freshly connected socket, replay subscription state, and
    /// start the reader. Returns a boxed future: the reader re-enters
    /// `install` through reconnection, and boxing keeps the future type
    /// finite.
    fn install(
        inner: Arc<Inner>,
        sink: Box<dyn SocketSink>,
        stream: Box<dyn SocketStream>,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(Inner::install_inner(inner, sink, stream))
    }

    async fn install_inner(
        inner: Arc<Inner>,
        mut sink: Box<dyn SocketSink>,
        stream: Box<dyn SocketStream>,
    ) {
        let frames = inner.replay.lock().unwrap().frames();
        for msg in frames {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if let Err(e) = sink.send(WireFrame::Text(json)).await {
                        warn!("Subscription replay send failed: {}", e);
                    }
                }
                Err(e) => warn!("Failed to encode replay message: {}", e),
            }
        }

        *inner.sink.lock().await = Some(sink);
        let epoch = inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        inner.set_status(ConnectionState::Connected, 0, None);

        let reader_inner = Arc::clone(&inner);
        tokio::spawn(async move {
            Inner::read_loop(reader_inner, stream, epoch).await;
        });
    }

    async fn read_loop(inner: Arc<Inner>, mut stream: Box<dyn SocketStream>, epoch: u64) {
        while let Some(frame) = stream.next().await {
            if inner.epoch.load(Ordering::SeqCst) != epoch {
                return;
            }
            match frame {
                WireFrame::Text(text) => match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(msg) => inner.dispatch(&msg),
                    Err(e) => warn!("Dropping malformed message: {}", e),
                },
                WireFrame::Binary(_) => {
                    warn!("Dropping unexpected binary frame from server");
                }
            }
        }

        if inner.epoch.load(Ordering::SeqCst) != epoch {
            // Caller-initiated disconnect; nothing to recover.
            return;
        }

        warn!("Connection closed unexpectedly, starting reconnect");
        inner.sink.lock().await.take();
        Inner::reconnect_loop(inner).await;
    }

    fn dispatch(&self, msg: &ServerMessage) {
        for listener in self.message_listeners() {
            listener(msg);
        }
        if let ServerMessage::Error { data } = msg {
            let err = ClientError::Upstream {
                message: data.error.clone(),
            };
            for listener in self.error_listeners() {
                listener(&err);
            }
        }
    }

    async fn reconnect_loop(inner: Arc<Inner>) {
        let epoch = inner.epoch.load(Ordering::SeqCst);
        let max = inner.policy.max_attempts();

        for attempt in 1..=max {
            let delay = inner.policy.delay_ms(attempt);
            inner.set_status(ConnectionState::Reconnecting, attempt, Some(delay));
            tokio::time::sleep(Duration::from_millis(delay)).await;

            // Dial under the same lock as caller-initiated connects so a
            // racing connect() cannot install a second live connection.
            let _guard = inner.connect_lock.lock().await;
            if inner.epoch.load(Ordering::SeqCst) != epoch {
                // Disconnected (or reconnected elsewhere) while waiting.
                return;
            }

            let url = inner.url.lock().unwrap().clone();
            match inner.connector.connect(&url).await {
                Ok((sink, stream)) => {
                    info!("Reconnected after {} attempt(s)", attempt);
                    Inner::install(Arc::clone(&inner), sink, stream).await;
                    return;
                }
                Err(e) => {
                    warn!("Reconnect attempt {}/{} failed: {}", attempt, max, e);
                }
            }
        }

        inner.set_status(ConnectionState::Failed, max, None);
        let err = ClientError::ReconnectExhausted { attempts: max };
        for listener in inner.error_listeners() {
            listener(&err);
        }
    }
}
