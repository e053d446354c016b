use crate::transport::{SegmentationSegment, TranscriptEvent};
use serde::{Deserialize, Serialize};

/// Full point-in-time transcript state from the query API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSnapshot {
    pub events: Vec<TranscriptEvent>,
    pub revision: u64,
    #[serde(default)]
    pub next_event_index: Option<u64>,
}

/// Full point-in-time segmentation state from the query API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentSnapshot {
    pub segments: Vec<SegmentationSegment>,
    pub revision: u64,
}

/// External query API serving session snapshots. The backing CRUD service
/// is an opaque collaborator; implementations typically wrap an HTTP client.
#[async_trait::async_trait]
pub trait SnapshotApi: Send + Sync {
    async fn transcript_snapshot(&self, session_id: &str) -> anyhow::Result<TranscriptSnapshot>;
    async fn segment_snapshot(&self, session_id: &str) -> anyhow::Result<SegmentSnapshot>;
}
