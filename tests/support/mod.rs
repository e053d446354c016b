//! Shared in-memory fakes for integration tests: a scripted socket
//! connector, a scripted audio input, and a recording snapshot API.

#![allow(dead_code)]

use anyhow::bail;
use livescribe::audio::{AudioFrame, AudioInput};
use livescribe::reconcile::{SegmentSnapshot, SnapshotApi, TranscriptSnapshot};
use livescribe::transport::{ClientMessage, SocketConnector, SocketSink, SocketStream, WireFrame};
use livescribe::{ClientError, Result};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// One established fake connection, observable from the test.
pub struct FakeConnection {
    pub url: String,
    sent: Arc<Mutex<Vec<WireFrame>>>,
    server_tx: mpsc::UnboundedSender<WireFrame>,
    close_tx: watch::Sender<bool>,
}

impl FakeConnection {
    /// Frames the client has sent so far.
    pub fn sent_frames(&self) -> Vec<WireFrame> {
        self.sent.lock().unwrap().clone()
    }

    /// Parsed control messages, in send order.
    pub fn control_messages(&self) -> Vec<ClientMessage> {
        self.sent_frames()
            .iter()
            .filter_map(|frame| match frame {
                WireFrame::Text(text) => serde_json::from_str(text).ok(),
                WireFrame::Binary(_) => None,
            })
            .collect()
    }

    pub fn binary_frame_count(&self) -> usize {
        self.sent_frames()
            .iter()
            .filter(|f| matches!(f, WireFrame::Binary(_)))
            .count()
    }

    /// Push an inbound frame to the client.
    pub fn push_text(&self, text: &str) {
        let _ = self.server_tx.send(WireFrame::Text(text.to_string()));
    }

    pub fn push_message(&self, msg: &livescribe::ServerMessage) {
        self.push_text(&serde_json::to_string(msg).unwrap());
    }

    /// Simulate an unexpected server-side close.
    pub fn close(&self) {
        let _ = self.close_tx.send(true);
    }
}

#[derive(Default)]
struct ConnectorState {
    /// Connect attempts that fail before one succeeds (including reconnects)
    fail_next: AtomicU32,
    connect_calls: AtomicU32,
    connections: Mutex<Vec<Arc<FakeConnection>>>,
}

/// Scripted `SocketConnector` producing in-memory socket pairs.
#[derive(Clone, Default)]
pub struct FakeConnector {
    state: Arc<ConnectorState>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` connect attempts fail.
    pub fn fail_next(&self, n: u32) {
        self.state.fail_next.store(n, Ordering::SeqCst);
    }

    pub fn connect_calls(&self) -> u32 {
        self.state.connect_calls.load(Ordering::SeqCst)
    }

    pub fn connection_count(&self) -> usize {
        self.state.connections.lock().unwrap().len()
    }

    pub fn connection(&self, index: usize) -> Arc<FakeConnection> {
        Arc::clone(&self.state.connections.lock().unwrap()[index])
    }

    pub fn last_connection(&self) -> Arc<FakeConnection> {
        let connections = self.state.connections.lock().unwrap();
        Arc::clone(connections.last().expect("no connection established"))
    }
}

#[async_trait::async_trait]
impl SocketConnector for FakeConnector {
    async fn connect(
        &self,
        url: &str,
    ) -> anyhow::Result<(Box<dyn SocketSink>, Box<dyn SocketStream>)> {
        self.state.connect_calls.fetch_add(1, Ordering::SeqCst);

        let failures = self.state.fail_next.load(Ordering::SeqCst);
        if failures > 0 {
            self.state.fail_next.store(failures - 1, Ordering::SeqCst);
            bail!("scripted connect failure");
        }

        let sent = Arc::new(Mutex::new(Vec::new()));
        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = watch::channel(false);

        let connection = Arc::new(FakeConnection {
            url: url.to_string(),
            sent: Arc::clone(&sent),
            server_tx,
            close_tx,
        });
        self.state.connections.lock().unwrap().push(connection);

        Ok((
            Box::new(FakeSink { sent }),
            Box::new(FakeStream {
                rx: server_rx,
                closed: close_rx,
            }),
        ))
    }
}

struct FakeSink {
    sent: Arc<Mutex<Vec<WireFrame>>>,
}

#[async_trait::async_trait]
impl SocketSink for FakeSink {
    async fn send(&mut self, frame: WireFrame) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(frame);
        Ok(())
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

struct FakeStream {
    rx: mpsc::UnboundedReceiver<WireFrame>,
    closed: watch::Receiver<bool>,
}

#[async_trait::async_trait]
impl SocketStream for FakeStream {
    async fn next(&mut self) -> Option<WireFrame> {
        let rx = &mut self.rx;
        let closed = &mut self.closed;
        loop {
            if *closed.borrow() {
                return None;
            }
            tokio::select! {
                frame = rx.recv() => return frame,
                changed = closed.changed() => {
                    if changed.is_err() || *closed.borrow() {
                        return None;
                    }
                }
            }
        }
    }
}

/// Scripted `AudioInput` that emits a fixed list of frames on start.
pub struct ScriptedInput {
    frames: Vec<AudioFrame>,
    fail_start: bool,
    fail_restarts: bool,
    capturing: bool,
    tx: Option<mpsc::Sender<AudioFrame>>,
    starts: Arc<AtomicU32>,
    stops: Arc<AtomicU32>,
}

impl ScriptedInput {
    pub fn new(frames: Vec<AudioFrame>) -> Self {
        Self {
            frames,
            fail_start: false,
            fail_restarts: false,
            capturing: false,
            tx: None,
            starts: Arc::new(AtomicU32::new(0)),
            stops: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn failing() -> Self {
        let mut input = Self::new(Vec::new());
        input.fail_start = true;
        input
    }

    /// Succeeds on the first start, fails every start after that.
    pub fn failing_on_restart(frames: Vec<AudioFrame>) -> Self {
        let mut input = Self::new(frames);
        input.fail_restarts = true;
        input
    }

    /// Shared counters surviving the move into the session.
    pub fn counters(&self) -> (Arc<AtomicU32>, Arc<AtomicU32>) {
        (Arc::clone(&self.starts), Arc::clone(&self.stops))
    }
}

#[async_trait::async_trait]
impl AudioInput for ScriptedInput {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.fail_start
            || (self.fail_restarts && self.starts.load(Ordering::SeqCst) > 0)
        {
            return Err(ClientError::PermissionDenied {
                message: "scripted denial".to_string(),
            });
        }
        if self.capturing {
            return Err(ClientError::AlreadyActive);
        }
        self.capturing = true;
        self.starts.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(self.frames.len() + 1);
        for frame in &self.frames {
            tx.try_send(frame.clone()).expect("channel sized for script");
        }
        // Keep the sender so the channel stays open until stop()
        self.tx = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) {
        if !self.capturing {
            return;
        }
        self.capturing = false;
        self.tx = None;
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Snapshot API fake returning preloaded snapshots and counting fetches.
#[derive(Default)]
pub struct FakeSnapshotApi {
    pub transcript: Mutex<Option<TranscriptSnapshot>>,
    pub segments: Mutex<Option<SegmentSnapshot>>,
    pub transcript_fetches: AtomicU32,
    pub segment_fetches: AtomicU32,
}

#[async_trait::async_trait]
impl SnapshotApi for FakeSnapshotApi {
    async fn transcript_snapshot(&self, _session_id: &str) -> anyhow::Result<TranscriptSnapshot> {
        self.transcript_fetches.fetch_add(1, Ordering::SeqCst);
        match self.transcript.lock().unwrap().clone() {
            Some(snapshot) => Ok(snapshot),
            None => bail!("no transcript snapshot loaded"),
        }
    }

    async fn segment_snapshot(&self, _session_id: &str) -> anyhow::Result<SegmentSnapshot> {
        self.segment_fetches.fetch_add(1, Ordering::SeqCst);
        match self.segments.lock().unwrap().clone() {
            Some(snapshot) => Ok(snapshot),
            None => bail!("no segment snapshot loaded"),
        }
    }
}

/// Poll until `condition` holds or the timeout elapses. The deadline runs on
/// tokio's (possibly paused) clock and must outlast the full reconnect
/// backoff schedule.
pub async fn wait_until(condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(120);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("condition not reached in time");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
