use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub socket: SocketConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub vad: VadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SocketConfig {
    /// WebSocket URL of the speech-recognition backend
    #[serde(default = "default_socket_url")]
    pub url: String,

    /// Maximum automatic reconnect attempts after an unexpected close.
    /// Hard-capped at 5 regardless of the configured value.
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_max_attempts: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Sample rate for capture and the wire format (ASR expects 16kHz)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Number of audio channels (capture is mono)
    #[serde(default = "default_channels")]
    pub channels: u16,

    /// Samples per frame (1024 ≈ 64ms at 16kHz)
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct VadConfig {
    /// RMS level above which a frame counts as voiced
    #[serde(default = "default_start_threshold")]
    pub start_threshold: f32,

    /// RMS level below which a frame counts as silent (lower than the start
    /// threshold so brief dips do not end a turn)
    #[serde(default = "default_stop_threshold")]
    pub stop_threshold: f32,

    /// Cumulative silence before the end-of-turn signal fires
    #[serde(default = "default_silence_gap_ms")]
    pub silence_gap_ms: u32,
}

fn default_socket_url() -> String {
    "ws://localhost:8090/asr".to_string()
}

fn default_reconnect_attempts() -> u32 {
    5
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_channels() -> u16 {
    1
}

fn default_buffer_size() -> usize {
    1024
}

fn default_start_threshold() -> f32 {
    0.02
}

fn default_stop_threshold() -> f32 {
    0.01
}

fn default_silence_gap_ms() -> u32 {
    1000
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            url: default_socket_url(),
            reconnect_max_attempts: default_reconnect_attempts(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            buffer_size: default_buffer_size(),
        }
    }
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            start_threshold: default_start_threshold(),
            stop_threshold: default_stop_threshold(),
            silence_gap_ms: default_silence_gap_ms(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
