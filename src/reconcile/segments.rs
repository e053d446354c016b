use super::snapshot::{SegmentSnapshot, SnapshotApi};
use crate::transport::SegmentationSegment;

/// Local view of a session's derived segmentation, sorted by `sequence`
/// descending for display (newest span first).
pub struct SegmentationView {
    session_id: String,
    revision: u64,
    segments: Vec<SegmentationSegment>,
}

impl SegmentationView {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            revision: 0,
            segments: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Segments sorted by sequence descending.
    pub fn segments(&self) -> &[SegmentationSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Merge one live segment upsert: replace in place on identity match
    /// (`id` when present, else `sequence`), otherwise insert and re-sort.
    /// Upserts for other sessions are silently ignored.
    pub fn upsert(&mut self, segment: SegmentationSegment) {
        if segment.session_id != self.session_id {
            return;
        }
        self.revision = self.revision.max(segment.source_revision);

        let position = self.segments.iter().position(|existing| {
            match (&segment.id, &existing.id) {
                (Some(incoming), Some(held)) => incoming == held,
                _ => existing.sequence == segment.sequence,
            }
        });

        match position {
            Some(i) => self.segments[i] = segment,
            None => {
                self.segments.push(segment);
                self.segments.sort_by(|a, b| b.sequence.cmp(&a.sequence));
            }
        }
    }

    /// Handle a `reset` control message. Clears the local view and returns
    /// true when the caller must re-fetch a snapshot: the server discarded
    /// history this view cannot reconstruct incrementally. Resets for other
    /// sessions are ignored.
    pub fn handle_reset(&mut self, session_id: &str) -> bool {
        if session_id != self.session_id {
            return false;
        }
        self.segments.clear();
        true
    }

    /// Max `source_end_event_index` across segments: how much of the raw
    /// transcript has been consumed by segmentation.
    pub fn furthest_processed_index(&self) -> Option<u64> {
        self.segments
            .iter()
            .map(|s| s.source_end_event_index)
            .max()
    }

    /// Replace local state wholesale from a snapshot.
    pub fn load_snapshot(&mut self, snapshot: SegmentSnapshot) {
        self.revision = snapshot.revision;
        self.segments = snapshot.segments;
        self.segments.retain(|s| s.session_id == self.session_id);
        self.segments.sort_by(|a, b| b.sequence.cmp(&a.sequence));
    }

    /// Re-baseline from the query API.
    pub async fn resync(&mut self, api: &dyn SnapshotApi) -> anyhow::Result<()> {
        let snapshot = api.segment_snapshot(&self.session_id).await?;
        self.load_snapshot(snapshot);
        Ok(())
    }
}
