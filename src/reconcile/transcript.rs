use super::snapshot::{SnapshotApi, TranscriptSnapshot};
use crate::transport::TranscriptEvent;
use std::collections::{BTreeMap, HashMap};

/// Ordered, monotonically-progressing view of a session's raw transcript.
///
/// Holds the full history keyed by `event_index` (last write wins per
/// index) plus a latest-wins grouping by `segment_key` for incremental
/// display of an utterance being progressively refined. The observed
/// revision never regresses.
pub struct TranscriptView {
    session_id: String,
    revision: u64,
    by_index: BTreeMap<u64, TranscriptEvent>,
    /// segment_key → event_index of the freshest event seen for that key.
    /// Guards against stale re-delivery after a reconnect.
    by_key: HashMap<String, u64>,
}

impl TranscriptView {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            revision: 0,
            by_index: BTreeMap::new(),
            by_key: HashMap::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Highest revision observed so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Merge one live upsert. Idempotent; upserts for other sessions are
    /// benign leakage and silently ignored.
    pub fn apply(&mut self, session_id: &str, revision: u64, event: TranscriptEvent) {
        if session_id != self.session_id {
            return;
        }
        self.revision = self.revision.max(revision);
        self.merge_event(event);
    }

    fn merge_event(&mut self, event: TranscriptEvent) {
        if let Some(key) = event.segment_key.clone() {
            let held = self.by_key.entry(key).or_insert(event.event_index);
            if event.event_index >= *held {
                *held = event.event_index;
            }
        }
        self.by_index.insert(event.event_index, event);
    }

    /// Events in index order.
    pub fn events(&self) -> impl Iterator<Item = &TranscriptEvent> {
        self.by_index.values()
    }

    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }

    pub fn get(&self, event_index: u64) -> Option<&TranscriptEvent> {
        self.by_index.get(&event_index)
    }

    /// Freshest event carrying the given segment key.
    pub fn latest_for_key(&self, segment_key: &str) -> Option<&TranscriptEvent> {
        self.by_key
            .get(segment_key)
            .and_then(|index| self.by_index.get(index))
    }

    /// Replace local state wholesale from a snapshot.
    pub fn load_snapshot(&mut self, snapshot: TranscriptSnapshot) {
        self.by_index.clear();
        self.by_key.clear();
        self.revision = snapshot.revision;
        for event in snapshot.events {
            self.merge_event(event);
        }
    }

    /// Re-baseline from the query API. Required after any gap in live
    /// updates, which includes every reconnect.
    pub async fn resync(&mut self, api: &dyn SnapshotApi) -> anyhow::Result<()> {
        let snapshot = api.transcript_snapshot(&self.session_id).await?;
        self.load_snapshot(snapshot);
        Ok(())
    }
}
