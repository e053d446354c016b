//! Wire messages exchanged with the speech-recognition backend.
//!
//! Control and event messages are JSON objects tagged by a `type` field with
//! camelCase payload fields (the backend's web-client convention). Audio is
//! not represented here: it travels as raw binary PCM16 frames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Control messages sent to the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    SetSession {
        session_id: String,
    },
    SetSpeaker {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        speaker_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        speaker_name: Option<String>,
    },
    StartTranscribe {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        asr_config: Option<serde_json::Value>,
    },
    StopTranscribe,
    EndTurn {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
}

/// Event messages received from the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Legacy whole-line transcript push, kept for older backends
    Transcript { data: LegacyTranscriptData },
    TranscriptEventUpsert { data: TranscriptEventUpsertData },
    TranscriptEventSegmentUpsert { data: SegmentationSegment },
    TranscriptEventSegmentReset { data: SegmentResetData },
    Error { data: UpstreamErrorData },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LegacyTranscriptData {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub speaker_name: Option<String>,
    #[serde(default)]
    pub is_final: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEventUpsertData {
    pub session_id: String,
    pub revision: u64,
    pub event: TranscriptEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SegmentResetData {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamErrorData {
    pub error: String,
}

/// One revisioned transcript event.
///
/// `event_index` is server-assigned and strictly increasing per session.
/// Once `is_final` is true the event at that index is immutable; non-final
/// events may be superseded by later revisions carrying the same index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEvent {
    pub session_id: String,
    pub event_index: u64,
    #[serde(default)]
    pub speaker_id: Option<String>,
    #[serde(default)]
    pub speaker_name: Option<String>,
    pub content: String,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub segment_key: Option<String>,
    #[serde(default)]
    pub asr_timestamp_ms: Option<u64>,
    #[serde(default)]
    pub audio_duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SegmentStatus {
    Completed,
    Failed,
}

/// A semantically complete span derived from a range of transcript events.
///
/// Identity is `id` when present, else `sequence`. Invariant:
/// `source_start_event_index <= source_end_event_index`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SegmentationSegment {
    #[serde(default)]
    pub id: Option<String>,
    pub session_id: String,
    pub sequence: u64,
    pub content: String,
    pub source_start_event_index: u64,
    pub source_end_event_index: u64,
    pub source_revision: u64,
    pub status: SegmentStatus,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
}
