//! Render scheduler.
//!
//! Producers report invalidation intents (`RenderDelta`) via `mark`; the host
//! loop calls `consume` once per frame and paints the merged result.
//!
//! Merge semantics:
//! - Any `Full` in the queue makes the frame `Full`.
//! - Multiple `Reveal` ranges merge into one half-open range
//!   `[min(start), max(end))`. Reveals are append-only so the ranges are
//!   adjacent in practice.
//! - Precedence: `Full` > `Reveal` > `StatusLine` > `Indicator`. A lower kind
//!   is subsumed by a higher one because every paint path also refreshes the
//!   status line and indicator.
//!
//! Examples:
//! - `Reveal(3..4) + Reveal(4..5)` => `Reveal(3..5)`.
//! - `StatusLine + Indicator` => `StatusLine`.
//!
//! The effective decision may escalate a huge reveal (skip, reduced motion) to
//! `Full`, which repaints the code area in one pass instead of walking the
//! per-unit path.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderDelta {
    /// Entire frame must be repainted (startup, resize, replay).
    Full,
    /// Units in `[start, end)` became visible.
    Reveal(Range<usize>),
    /// Only the status line changed (state label, progress, motion flag).
    StatusLine,
    /// Only the indicator blink phase changed.
    Indicator,
}

/// Merged decision for one frame.
///
/// - `semantic`: the minimal damage kind derived from queued marks.
/// - `effective`: what the surface should paint now; may escalate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub semantic: RenderDelta,
    pub effective: RenderDelta,
}

#[derive(Debug, Default)]
pub struct RenderDeltaMetrics {
    full: AtomicU64,
    reveal: AtomicU64,
    status_line: AtomicU64,
    indicator: AtomicU64,
    collapsed_reveal: AtomicU64,
    escalated_reveal: AtomicU64,
    frames: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderDeltaMetricsSnapshot {
    pub full: u64,
    pub reveal: u64,
    pub status_line: u64,
    pub indicator: u64,
    pub collapsed_reveal: u64,
    pub escalated_reveal: u64,
    pub frames: u64,
}

impl RenderDeltaMetrics {
    pub fn snapshot(&self) -> RenderDeltaMetricsSnapshot {
        RenderDeltaMetricsSnapshot {
            full: self.full.load(Relaxed),
            reveal: self.reveal.load(Relaxed),
            status_line: self.status_line.load(Relaxed),
            indicator: self.indicator.load(Relaxed),
            collapsed_reveal: self.collapsed_reveal.load(Relaxed),
            escalated_reveal: self.escalated_reveal.load(Relaxed),
            frames: self.frames.load(Relaxed),
        }
    }

    fn incr_semantic(&self, delta: &RenderDelta) {
        let counter = match delta {
            RenderDelta::Full => &self.full,
            RenderDelta::Reveal(_) => &self.reveal,
            RenderDelta::StatusLine => &self.status_line,
            RenderDelta::Indicator => &self.indicator,
        };
        counter.fetch_add(1, Relaxed);
        self.frames.fetch_add(1, Relaxed);
    }
}

#[derive(Debug, Default)]
pub struct RenderScheduler {
    pending: Vec<RenderDelta>,
    metrics: RenderDeltaMetrics,
}

impl RenderScheduler {
    /// Reveal ranges longer than this repaint the whole frame.
    pub const REVEAL_ESCALATE_MAX: usize = 256;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics_snapshot(&self) -> RenderDeltaMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn mark(&mut self, delta: RenderDelta) {
        tracing::trace!(target: "render.scheduler", ?delta, "render_mark");
        self.pending.push(delta);
    }

    pub fn mark_reveal(&mut self, index: usize) {
        self.mark(RenderDelta::Reveal(index..index + 1));
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn consume(&mut self) -> Option<Decision> {
        if self.pending.is_empty() {
            return None;
        }
        let merged = self.collapse();
        tracing::trace!(target: "render.scheduler", ?merged, "render_delta_collapse");
        self.pending.clear();
        self.metrics.incr_semantic(&merged);
        let effective = match &merged {
            RenderDelta::Reveal(r) if r.len() > Self::REVEAL_ESCALATE_MAX => {
                self.metrics.escalated_reveal.fetch_add(1, Relaxed);
                RenderDelta::Full
            }
            other => other.clone(),
        };
        Some(Decision {
            semantic: merged,
            effective,
        })
    }

    fn collapse(&self) -> RenderDelta {
        let mut have_status = false;
        let mut have_indicator = false;
        let mut reveal: Option<Range<usize>> = None;
        let mut reveal_marks = 0u64;
        for d in &self.pending {
            match d {
                RenderDelta::Full => return RenderDelta::Full,
                RenderDelta::StatusLine => have_status = true,
                RenderDelta::Indicator => have_indicator = true,
                RenderDelta::Reveal(r) => {
                    reveal_marks += 1;
                    reveal = Some(match reveal.take() {
                        None => r.clone(),
                        Some(existing) => existing.start.min(r.start)..existing.end.max(r.end),
                    });
                }
            }
        }
        if let Some(r) = reveal {
            if reveal_marks > 1 {
                self.metrics
                    .collapsed_reveal
                    .fetch_add(reveal_marks - 1, Relaxed);
            }
            return RenderDelta::Reveal(r);
        }
        if have_status {
            return RenderDelta::StatusLine;
        }
        if have_indicator {
            return RenderDelta::Indicator;
        }
        RenderDelta::Full
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reveal_ranges_merge() {
        let mut s = RenderScheduler::new();
        s.mark_reveal(3);
        s.mark_reveal(4);
        s.mark(RenderDelta::Reveal(5..7));
        assert_eq!(s.collapse(), RenderDelta::Reveal(3..7));
    }

    #[test]
    fn full_overrides_all() {
        let mut s = RenderScheduler::new();
        s.mark_reveal(0);
        s.mark(RenderDelta::Full);
        s.mark(RenderDelta::Indicator);
        assert_eq!(s.collapse(), RenderDelta::Full);
    }

    #[test]
    fn status_plus_indicator_prefers_status() {
        let mut s = RenderScheduler::new();
        s.mark(RenderDelta::Indicator);
        s.mark(RenderDelta::StatusLine);
        assert_eq!(s.collapse(), RenderDelta::StatusLine);
    }

    #[test]
    fn reveal_outranks_status() {
        let mut s = RenderScheduler::new();
        s.mark(RenderDelta::StatusLine);
        s.mark_reveal(9);
        assert_eq!(s.collapse(), RenderDelta::Reveal(9..10));
    }

    #[test]
    fn consume_clears_and_counts() {
        let mut s = RenderScheduler::new();
        assert!(s.consume().is_none());
        s.mark_reveal(0);
        s.mark_reveal(1);
        let d = s.consume().unwrap();
        assert_eq!(d.semantic, RenderDelta::Reveal(0..2));
        assert_eq!(d.effective, RenderDelta::Reveal(0..2));
        assert!(!s.has_pending());
        let m = s.metrics_snapshot();
        assert_eq!(m.reveal, 1);
        assert_eq!(m.collapsed_reveal, 1);
        assert_eq!(m.frames, 1);
    }

    #[test]
    fn large_reveal_escalates_to_full() {
        let mut s = RenderScheduler::new();
        s.mark(RenderDelta::Reveal(0..RenderScheduler::REVEAL_ESCALATE_MAX + 1));
        let d = s.consume().unwrap();
        assert!(matches!(d.semantic, RenderDelta::Reveal(_)));
        assert_eq!(d.effective, RenderDelta::Full);
        assert_eq!(s.metrics_snapshot().escalated_reveal, 1);
    }
}
