//! Turn boundary detection.
//!
//! Classifies each audio frame as voiced or silent from its RMS level and
//! emits exactly one end-of-turn signal after a sustained silence gap.
//! Silence is accumulated from frame durations, never wall-clock time, so
//! the detector is deterministic and unit-testable without I/O.

use crate::audio::AudioFrame;
use crate::config::VadConfig;

/// Current state of the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// No speech observed since the last end-of-turn (or start)
    Silent,
    /// Speech in progress
    Voiced,
}

/// Events emitted per processed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnEvent {
    /// Nothing to report for this frame
    None,
    /// A turn just ended: sustained silence followed voiced frames
    EndOfTurn,
}

/// Voice-activity state machine detecting utterance boundaries.
pub struct TurnBoundaryDetector {
    config: VadConfig,
    state: TurnState,
    /// Accumulated silence since the last voiced frame, in milliseconds
    silence_ms: f32,
    /// Whether the end-of-turn signal is still armed for the current turn
    armed: bool,
}

impl TurnBoundaryDetector {
    pub fn new(config: VadConfig) -> Self {
        Self {
            config,
            state: TurnState::Silent,
            silence_ms: 0.0,
            armed: false,
        }
    }

    /// Processes one frame and reports whether a turn boundary was crossed.
    pub fn process(&mut self, frame: &AudioFrame) -> TurnEvent {
        let level = rms(&frame.samples);

        if level >= self.config.start_threshold {
            // Voiced: reset the accumulator and re-arm for one more signal
            self.state = TurnState::Voiced;
            self.silence_ms = 0.0;
            self.armed = true;
            return TurnEvent::None;
        }

        if level >= self.config.stop_threshold {
            // Between thresholds: neither clearly voiced nor silent.
            // Hold state and do not count toward the gap.
            return TurnEvent::None;
        }

        if self.state != TurnState::Voiced || !self.armed {
            return TurnEvent::None;
        }

        self.silence_ms += frame.duration_ms();
        if self.silence_ms >= self.config.silence_gap_ms as f32 {
            self.state = TurnState::Silent;
            self.silence_ms = 0.0;
            self.armed = false;
            return TurnEvent::EndOfTurn;
        }

        TurnEvent::None
    }

    /// Returns the current detector state.
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Resets to the initial silent, unarmed state.
    pub fn reset(&mut self) {
        self.state = TurnState::Silent;
        self.silence_ms = 0.0;
        self.armed = false;
    }
}

/// Root-mean-square level of a frame, 0.0 for an empty frame.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
