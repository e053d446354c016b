//! Transcript reconciliation
//!
//! Socket delivery is ordered within one connection but guarantees nothing
//! across a reconnect, so these views merge live upserts idempotently and
//! re-baseline from a full snapshot after every reconnect-triggered
//! resubscription (and on segmentation `reset`).

mod segments;
mod snapshot;
mod transcript;

pub use segments::SegmentationView;
pub use snapshot::{SegmentSnapshot, SnapshotApi, TranscriptSnapshot};
pub use transcript::TranscriptView;
