pub mod audio;
pub mod config;
pub mod error;
pub mod reconcile;
pub mod session;
pub mod transport;
pub mod turn;

pub use audio::{pcm16_bytes, AudioFrame, AudioInput, CaptureConfig};
pub use config::Config;
pub use error::{ClientError, Result};
pub use reconcile::{
    SegmentSnapshot, SegmentationView, SnapshotApi, TranscriptSnapshot, TranscriptView,
};
pub use session::{SessionConfig, SessionState, TranscriptionSession};
pub use transport::{
    ClientMessage, ConnectionState, ConnectionStatus, ReconnectPolicy, SegmentationSegment,
    ServerMessage, StreamTransport, TranscriptEvent, WsConnector,
};
pub use turn::{TurnBoundaryDetector, TurnEvent, TurnState};
