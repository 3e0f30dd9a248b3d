//! Typing playback: a single timeline revealing typing units one at a time.
//!
//! [`Timeline`] is the deterministic core (state machine plus tick math).
//! [`PlaybackScheduler`] drives it on a tokio timer, honours the shared
//! [`MotionPreference`](core_gates::MotionPreference), and reports progress
//! through a `watch` snapshot channel, an optional event sink, and a one-shot
//! completion signal that fires only on natural completion.
//!
//! Line-break units take one regular tick like any other unit.

pub mod scheduler;
pub mod state;
pub mod timeline;

pub use scheduler::{
    DEFAULT_INTERVAL_MS, PlaybackOptions, PlaybackScheduler, play, play_with_events,
};
pub use state::{CursorPosition, PlaybackEvent, PlaybackSnapshot, PlaybackState, SkipReason};
pub use timeline::{StartOutcome, TickOutcome, Timeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    #[error("per-unit interval must be positive, got {0} ms")]
    InvalidInterval(i64),
}
