use serde::{Deserialize, Serialize};

/// Options for one transcription session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "meeting-2026-08-25-standup")
    pub session_id: String,

    /// Speaker identity bound to the stream, if known
    pub speaker_id: Option<String>,
    pub speaker_name: Option<String>,

    /// Recognition language hint (e.g., "zh-CN")
    pub language: Option<String>,

    /// ASR model name (e.g., "doubao")
    pub model: Option<String>,

    /// Opaque extra ASR parameters passed through to the backend
    pub asr_config: Option<serde_json::Value>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("meeting-{}", uuid::Uuid::new_v4()),
            speaker_id: None,
            speaker_name: None,
            language: None,
            model: None,
            asr_config: None,
        }
    }
}
