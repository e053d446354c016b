//! Error types for livescribe.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    // Audio capture errors
    #[error("Audio input permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    // Lifecycle errors
    #[error("Already active: a recording or capture is in progress")]
    AlreadyActive,

    // Transport errors
    #[error("Failed to connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Transport unavailable: not connected")]
    TransportUnavailable,

    #[error("Reconnect attempts exhausted after {attempts} tries")]
    ReconnectExhausted { attempts: u32 },

    #[error("Malformed inbound message: {message}")]
    Malformed { message: String },

    // Server-reported error forwarded over the stream
    #[error("Upstream error: {message}")]
    Upstream { message: String },

    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ClientError>;
