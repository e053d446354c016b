//! Transcription session management
//!
//! This module provides the `TranscriptionSession` abstraction that manages:
//! - Audio capture lifecycle (start/pause/resume/stop)
//! - Float-to-PCM16 conversion and audio forwarding to the transport
//! - Turn boundary signaling (`end_turn` once per detected turn)
//! - Bridging transport connection status into session state

mod config;
mod session;

pub use config::SessionConfig;
pub use session::{SessionState, TranscriptionSession};
