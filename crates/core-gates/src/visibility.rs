//! One-shot visibility gate.
//!
//! State machine: `Watching -> Fired -> Inert`. The first observation at or
//! above the threshold fires `Enter`; every later observation is ignored, so
//! scrolling away and back never replays. Releasing a gate that has not fired
//! ends observation silently.

use tokio::sync::watch;

/// Fraction of the host surface that must be visible ("mostly visible").
pub const DEFAULT_VISIBILITY_THRESHOLD: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityPhase {
    Watching,
    Fired,
    Inert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityEvent {
    Enter,
}

#[derive(Debug, Clone)]
pub struct VisibilityGate {
    threshold: f32,
    phase: VisibilityPhase,
}

impl Default for VisibilityGate {
    fn default() -> Self {
        Self::new(DEFAULT_VISIBILITY_THRESHOLD)
    }
}

impl VisibilityGate {
    /// `threshold` is clamped to `[0, 1]`; a non-finite value falls back to
    /// the default.
    pub fn new(threshold: f32) -> Self {
        let threshold = if threshold.is_finite() {
            threshold.clamp(0.0, 1.0)
        } else {
            DEFAULT_VISIBILITY_THRESHOLD
        };
        Self {
            threshold,
            phase: VisibilityPhase::Watching,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn phase(&self) -> VisibilityPhase {
        self.phase
    }

    pub fn has_fired(&self) -> bool {
        !matches!(self.phase, VisibilityPhase::Watching)
    }

    /// Feed one visible-ratio observation. Returns `Some(Enter)` at most once
    /// per gate lifetime.
    pub fn observe(&mut self, ratio: f32) -> Option<VisibilityEvent> {
        match self.phase {
            VisibilityPhase::Watching => {}
            VisibilityPhase::Fired => {
                self.phase = VisibilityPhase::Inert;
                return None;
            }
            VisibilityPhase::Inert => return None,
        }
        if !ratio.is_finite() || ratio <= 0.0 || ratio < self.threshold {
            tracing::trace!(target: "gates.visibility", ratio, threshold = self.threshold, "below_threshold");
            return None;
        }
        self.phase = VisibilityPhase::Fired;
        tracing::debug!(target: "gates.visibility", ratio, threshold = self.threshold, "visibility_enter");
        Some(VisibilityEvent::Enter)
    }

    /// Stop observing (host surface destroyed). Never emits.
    pub fn release(&mut self) {
        if self.phase == VisibilityPhase::Watching {
            tracing::debug!(target: "gates.visibility", "released_before_enter");
        }
        self.phase = VisibilityPhase::Inert;
    }
}

/// Await the gate's `Enter` from a stream of visible-ratio observations.
///
/// Returns `None` when the gate has already fired or been released, or when
/// the observation source closes first (the gate is then released).
pub async fn wait_for_enter(
    gate: &mut VisibilityGate,
    mut ratios: watch::Receiver<f32>,
) -> Option<VisibilityEvent> {
    if gate.has_fired() {
        return None;
    }
    loop {
        let ratio = *ratios.borrow_and_update();
        if let Some(event) = gate.observe(ratio) {
            return Some(event);
        }
        if ratios.changed().await.is_err() {
            gate.release();
            return None;
        }
    }
}
