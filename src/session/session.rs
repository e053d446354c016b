use super::config::SessionConfig;
use crate::audio::{pcm16_bytes, AudioInput};
use crate::config::VadConfig;
use crate::error::{ClientError, Result};
use crate::transport::{ClientMessage, ConnectionState, ServerMessage, StreamTransport};
use crate::turn::{TurnBoundaryDetector, TurnEvent};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Session lifecycle states. The session-state callback is the single
/// authoritative signal for whether audio is actively being captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Recording,
    Paused,
    Error,
}

type StateListener = Arc<dyn Fn(SessionState) + Send + Sync>;
type MessageListener = Arc<dyn Fn(&ServerMessage) + Send + Sync>;
type ErrorListener = Arc<dyn Fn(&ClientError) + Send + Sync>;

#[derive(Default)]
struct SessionListeners {
    state: Vec<StateListener>,
    message: Vec<MessageListener>,
    error: Vec<ErrorListener>,
}

struct Shared {
    state: StdMutex<SessionState>,
    listeners: StdMutex<SessionListeners>,
    /// True between a successful start() and stop()/error; gates status
    /// bridging so transport chatter before recording does not move state.
    active: AtomicBool,
    /// Pause takes precedence over reconnect status bridging.
    paused: AtomicBool,
    /// Bumped to invalidate in-flight audio forwarding after pause/stop.
    capture_generation: AtomicU64,
}

impl Shared {
    fn set_state(&self, next: SessionState) {
        {
            let mut state = self.state.lock().unwrap();
            if *state == next {
                return;
            }
            *state = next;
        }
        for listener in self.state_listeners() {
            listener(next);
        }
    }

    fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    fn state_listeners(&self) -> Vec<StateListener> {
        self.listeners.lock().unwrap().state.clone()
    }

    fn message_listeners(&self) -> Vec<MessageListener> {
        self.listeners.lock().unwrap().message.clone()
    }

    fn error_listeners(&self) -> Vec<ErrorListener> {
        self.listeners.lock().unwrap().error.clone()
    }

    fn dispatch_error(&self, err: &ClientError) {
        for listener in self.error_listeners() {
            listener(err);
        }
    }
}

/// Orchestrates audio capture, turn detection, and the stream transport for
/// one recording session at a time.
pub struct TranscriptionSession {
    transport: Arc<StreamTransport>,
    input: Mutex<Box<dyn AudioInput>>,
    vad: VadConfig,
    shared: Arc<Shared>,
    audio_task: Mutex<Option<JoinHandle<()>>>,
    /// Options of the session currently (or last) started
    current: StdMutex<Option<SessionConfig>>,
}

impl TranscriptionSession {
    pub fn new(
        transport: Arc<StreamTransport>,
        input: Box<dyn AudioInput>,
        vad: VadConfig,
    ) -> Self {
        let shared = Arc::new(Shared {
            state: StdMutex::new(SessionState::Idle),
            listeners: StdMutex::new(SessionListeners::default()),
            active: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            capture_generation: AtomicU64::new(0),
        });

        // Bridge transport status into session state while a session is
        // active. Pause wins over reconnect chatter; terminal failure is a
        // session error.
        let bridge = Arc::clone(&shared);
        transport.on_connection_status(move |status| {
            if !bridge.active.load(Ordering::SeqCst) {
                return;
            }
            match status.state {
                ConnectionState::Connecting | ConnectionState::Reconnecting => {
                    if !bridge.paused.load(Ordering::SeqCst) {
                        bridge.set_state(SessionState::Connecting);
                    }
                }
                ConnectionState::Connected => {
                    if bridge.paused.load(Ordering::SeqCst) {
                        bridge.set_state(SessionState::Paused);
                    } else {
                        bridge.set_state(SessionState::Recording);
                    }
                }
                ConnectionState::Failed => {
                    // The transport raises ReconnectExhausted through the
                    // error callback right after this status.
                    bridge.active.store(false, Ordering::SeqCst);
                    bridge.set_state(SessionState::Error);
                }
                ConnectionState::Disconnected => {}
            }
        });

        // Forward transcript-bearing messages; upstream errors go through
        // the error callback instead.
        let forward = Arc::clone(&shared);
        transport.on_message(move |msg| {
            if !matches!(msg, ServerMessage::Error { .. }) {
                for listener in forward.message_listeners() {
                    listener(msg);
                }
            }
        });

        let errors = Arc::clone(&shared);
        transport.on_error(move |err| {
            errors.dispatch_error(err);
        });

        Self {
            transport,
            input: Mutex::new(input),
            vad,
            shared,
            audio_task: Mutex::new(None),
            current: StdMutex::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    pub fn transport(&self) -> &Arc<StreamTransport> {
        &self.transport
    }

    pub fn on_state(&self, handler: impl Fn(SessionState) + Send + Sync + 'static) {
        self.shared
            .listeners
            .lock()
            .unwrap()
            .state
            .push(Arc::new(handler));
    }

    pub fn on_message(&self, handler: impl Fn(&ServerMessage) + Send + Sync + 'static) {
        self.shared
            .listeners
            .lock()
            .unwrap()
            .message
            .push(Arc::new(handler));
    }

    pub fn on_error(&self, handler: impl Fn(&ClientError) + Send + Sync + 'static) {
        self.shared
            .listeners
            .lock()
            .unwrap()
            .error
            .push(Arc::new(handler));
    }

    /// Start a new session. Only accepted from `Idle` or `Error`.
    pub async fn start(&self, config: SessionConfig) -> Result<()> {
        {
            let state = self.shared.state.lock().unwrap();
            if !matches!(*state, SessionState::Idle | SessionState::Error) {
                return Err(ClientError::AlreadyActive);
            }
        }

        info!("Starting transcription session: {}", config.session_id);
        self.shared.paused.store(false, Ordering::SeqCst);
        self.shared.set_state(SessionState::Connecting);

        match self.start_inner(&config).await {
            Ok(()) => {
                *self.current.lock().unwrap() = Some(config);
                self.shared.active.store(true, Ordering::SeqCst);
                self.shared.set_state(SessionState::Recording);
                Ok(())
            }
            Err(e) => {
                self.shared.set_state(SessionState::Error);
                self.shared.dispatch_error(&e);
                Err(e)
            }
        }
    }

    async fn start_inner(&self, config: &SessionConfig) -> Result<()> {
        if !self.transport.is_connected() {
            self.transport.connect().await?;
        }

        self.transport
            .send_control(&ClientMessage::SetSession {
                session_id: config.session_id.clone(),
            })
            .await;

        if config.speaker_id.is_some() || config.speaker_name.is_some() {
            self.transport
                .send_control(&ClientMessage::SetSpeaker {
                    speaker_id: config.speaker_id.clone(),
                    speaker_name: config.speaker_name.clone(),
                })
                .await;
        }

        self.transport
            .send_control(&ClientMessage::StartTranscribe {
                language: config.language.clone(),
                model: config.model.clone(),
                asr_config: config.asr_config.clone(),
            })
            .await;

        self.begin_capture(Some(config.session_id.clone())).await
    }

    /// Start the audio input and spawn the forwarding task.
    async fn begin_capture(&self, session_id: Option<String>) -> Result<()> {
        let mut input = self.input.lock().await;
        let mut rx = input.start().await?;
        drop(input);

        let generation = self.shared.capture_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let shared = Arc::clone(&self.shared);
        let transport = Arc::clone(&self.transport);
        let mut detector = TurnBoundaryDetector::new(self.vad);

        let task = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if shared.capture_generation.load(Ordering::SeqCst) != generation {
                    break;
                }

                let bytes = pcm16_bytes(&frame.samples);
                transport.send(&bytes).await;

                // End-of-turn is a signal, not a stop: audio keeps flowing.
                if detector.process(&frame) == TurnEvent::EndOfTurn {
                    info!("Turn boundary detected, signaling end_turn");
                    transport
                        .send_control(&ClientMessage::EndTurn {
                            session_id: session_id.clone(),
                        })
                        .await;
                }
            }
        });

        *self.audio_task.lock().await = Some(task);
        Ok(())
    }

    /// Stop the audio input and wait for the forwarding task to drain.
    async fn end_capture(&self) {
        self.shared.capture_generation.fetch_add(1, Ordering::SeqCst);
        self.input.lock().await.stop().await;
        if let Some(task) = self.audio_task.lock().await.take() {
            if let Err(e) = task.await {
                warn!("Audio forwarding task panicked: {}", e);
            }
        }
    }

    /// Pause capture. No-op unless currently recording; the transport stays
    /// connected.
    pub async fn pause(&self) {
        if self.shared.state() != SessionState::Recording {
            return;
        }
        info!("Pausing transcription session");
        self.end_capture().await;
        self.shared.paused.store(true, Ordering::SeqCst);
        self.shared.set_state(SessionState::Paused);
    }

    /// Resume capture. No-op unless paused. A capture-start failure is
    /// surfaced via the error callback and leaves the session paused so the
    /// caller may retry.
    pub async fn resume(&self) {
        if self.shared.state() != SessionState::Paused {
            return;
        }
        info!("Resuming transcription session");
        let session_id = self
            .current
            .lock()
            .unwrap()
            .as_ref()
            .map(|c| c.session_id.clone());
        match self.begin_capture(session_id).await {
            Ok(()) => {
                self.shared.paused.store(false, Ordering::SeqCst);
                self.shared.set_state(SessionState::Recording);
            }
            Err(e) => {
                warn!("Resume failed, staying paused: {}", e);
                self.shared.dispatch_error(&e);
            }
        }
    }

    /// Stop the session. Idempotent; a no-op when idle.
    pub async fn stop(&self) {
        if self.shared.state() == SessionState::Idle {
            return;
        }
        info!("Stopping transcription session");
        self.shared.active.store(false, Ordering::SeqCst);
        self.end_capture().await;
        self.transport
            .send_control(&ClientMessage::StopTranscribe)
            .await;
        self.shared.paused.store(false, Ordering::SeqCst);
        self.shared.set_state(SessionState::Idle);
    }

    /// Full teardown: stop, disconnect the transport, drop all transport
    /// listeners. Idempotent.
    pub async fn dispose(&self) {
        self.stop().await;
        self.transport.disconnect().await;
        self.transport.remove_all_listeners();
    }
}
