mod support;

use livescribe::transport::{SegmentStatus, SegmentationSegment, TranscriptEvent};
use livescribe::{SegmentSnapshot, SegmentationView, TranscriptSnapshot, TranscriptView};
use support::FakeSnapshotApi;

fn event(index: u64, content: &str, key: Option<&str>, is_final: bool) -> TranscriptEvent {
    TranscriptEvent {
        session_id: "s1".to_string(),
        event_index: index,
        speaker_id: None,
        speaker_name: Some("Ada".to_string()),
        content: content.to_string(),
        is_final,
        segment_key: key.map(str::to_string),
        asr_timestamp_ms: None,
        audio_duration_ms: None,
    }
}

fn segment(id: Option<&str>, sequence: u64, content: &str, end_index: u64) -> SegmentationSegment {
    SegmentationSegment {
        id: id.map(str::to_string),
        session_id: "s1".to_string(),
        sequence,
        content: content.to_string(),
        source_start_event_index: 0,
        source_end_event_index: end_index,
        source_revision: sequence,
        status: SegmentStatus::Completed,
        model: Some("doubao".to_string()),
        generated_at: None,
    }
}

#[test]
fn test_merge_is_idempotent() {
    let mut once = TranscriptView::new("s1");
    let mut twice = TranscriptView::new("s1");

    let upsert = event(3, "hello", Some("k1"), false);
    once.apply("s1", 5, upsert.clone());
    twice.apply("s1", 5, upsert.clone());
    twice.apply("s1", 5, upsert);

    assert_eq!(once.revision(), twice.revision());
    let a: Vec<_> = once.events().cloned().collect();
    let b: Vec<_> = twice.events().cloned().collect();
    assert_eq!(a, b);
}

#[test]
fn test_revision_monotonic_across_any_sequence() {
    let mut view = TranscriptView::new("s1");
    let revisions = [4u64, 9, 2, 9, 1, 12, 3];
    let mut running_max = 0;
    for (i, &revision) in revisions.iter().enumerate() {
        view.apply("s1", revision, event(i as u64, "x", None, false));
        running_max = running_max.max(revision);
        assert_eq!(view.revision(), running_max);
    }
}

#[test]
fn test_last_write_wins_per_index() {
    let mut view = TranscriptView::new("s1");
    view.apply("s1", 1, event(2, "draft", None, false));
    view.apply("s1", 2, event(2, "refined", None, true));
    assert_eq!(view.len(), 1);
    assert_eq!(view.get(2).unwrap().content, "refined");
    assert!(view.get(2).unwrap().is_final);
}

#[test]
fn test_segment_upsert_same_id_replaces_not_duplicates() {
    let mut view = SegmentationView::new("s1");
    view.upsert(segment(Some("seg-1"), 5, "first pass", 10));
    view.upsert(segment(Some("seg-1"), 5, "updated content", 10));

    assert_eq!(view.len(), 1);
    assert_eq!(view.segments()[0].sequence, 5);
    assert_eq!(view.segments()[0].content, "updated content");
}

#[test]
fn test_segment_identity_falls_back_to_sequence() {
    let mut view = SegmentationView::new("s1");
    view.upsert(segment(None, 3, "a", 10));
    view.upsert(segment(None, 3, "b", 12));
    assert_eq!(view.len(), 1);
    assert_eq!(view.segments()[0].content, "b");
}

#[tokio::test]
async fn test_reset_clears_and_triggers_snapshot_refetch() {
    let api = FakeSnapshotApi::default();
    *api.segments.lock().unwrap() = Some(SegmentSnapshot {
        segments: vec![segment(Some("seg-9"), 9, "authoritative", 42)],
        revision: 40,
    });

    let mut view = SegmentationView::new("s1");
    view.upsert(segment(None, 1, "stale-a", 5));
    view.upsert(segment(None, 2, "stale-b", 8));

    // Reset for another session is ignored
    assert!(!view.handle_reset("s2"));
    assert_eq!(view.len(), 2);

    // Reset for the bound session clears and forces a snapshot re-fetch
    assert!(view.handle_reset("s1"));
    assert!(view.is_empty());
    view.resync(&api).await.unwrap();

    assert_eq!(
        api.segment_fetches
            .load(std::sync::atomic::Ordering::SeqCst),
        1
    );
    assert_eq!(view.len(), 1);
    assert_eq!(view.segments()[0].content, "authoritative");
    assert_eq!(view.furthest_processed_index(), Some(42));
}

#[tokio::test]
async fn test_snapshot_replaces_state_wholesale_then_merges_incrementally() {
    let api = FakeSnapshotApi::default();
    *api.transcript.lock().unwrap() = Some(TranscriptSnapshot {
        events: vec![
            event(0, "first", Some("k0"), true),
            event(1, "second", Some("k1"), false),
        ],
        revision: 10,
        next_event_index: Some(2),
    });

    let mut view = TranscriptView::new("s1");
    // Pre-disconnect state that the snapshot must supersede
    view.apply("s1", 3, event(7, "orphan", None, false));

    view.resync(&api).await.unwrap();
    assert_eq!(view.len(), 2);
    assert_eq!(view.revision(), 10);
    assert!(view.get(7).is_none());

    // Live upserts merge on top of the snapshot baseline
    view.apply("s1", 11, event(1, "second, refined", Some("k1"), true));
    assert_eq!(view.revision(), 11);
    assert_eq!(view.latest_for_key("k1").unwrap().content, "second, refined");

    // A snapshot with a lower revision still replaces wholesale: the server
    // is authoritative at re-baseline time
    *api.transcript.lock().unwrap() = Some(TranscriptSnapshot {
        events: vec![event(0, "first", Some("k0"), true)],
        revision: 11,
        next_event_index: Some(1),
    });
    view.resync(&api).await.unwrap();
    assert_eq!(view.len(), 1);
}
