pub mod pcm;

#[cfg(feature = "cpal-audio")]
pub mod microphone;

#[cfg(feature = "cpal-audio")]
pub use microphone::MicrophoneInput;
pub use pcm::pcm16_bytes;

use crate::error::Result;
use tokio::sync::mpsc;

/// One tick of captured audio (mono float PCM).
///
/// Frames are ephemeral: they are produced per processing tick and not
/// retained after conversion to the wire format.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Samples in the range [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioFrame {
    /// Duration of this frame in milliseconds.
    pub fn duration_ms(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 * 1000.0 / self.sample_rate as f32
    }
}

/// Configuration for audio capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate (ASR expects 16kHz)
    pub sample_rate: u32,
    /// Channel count (capture is mono)
    pub channels: u16,
    /// Samples per emitted frame (1024 ≈ 64ms at 16kHz)
    pub buffer_size: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            buffer_size: 1024,
        }
    }
}

/// Audio input capability
///
/// Implementations own exactly one hardware (or fake) input device.
/// Contract:
/// - `start` while already capturing fails with `ClientError::AlreadyActive`
/// - `stop` is idempotent and releases the device on every path
/// - frames are delivered without backpressure; if the consumer falls
///   behind, frames are dropped rather than queued unboundedly
#[async_trait::async_trait]
pub trait AudioInput: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames.
    /// May trigger an OS-level permission prompt at most once per call.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio
    async fn stop(&mut self);

    /// Check if the input is currently capturing
    fn is_capturing(&self) -> bool;

    /// Input name for logging
    fn name(&self) -> &str;
}
