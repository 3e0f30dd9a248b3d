//! Deterministic, clock-free playback core.
//!
//! A [`Timeline`] owns the unit sequence and the lifecycle state. It knows
//! when tick `i` is due but never sleeps; the async scheduler drives it, and
//! tests can drive it by hand.

use crate::{CursorPosition, PlaybackError, PlaybackSnapshot, PlaybackState};
use core_text::TypingUnit;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Not startable from the current state.
    Ignored,
    /// Playing; ticks should now be scheduled.
    Playing,
    /// Empty sequence, complete without any tick.
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not playing; nothing changed.
    Ignored,
    Revealed { index: usize },
    /// Revealed the last unit and completed.
    Completed { index: usize },
}

#[derive(Debug, Clone)]
pub struct Timeline {
    units: Arc<[TypingUnit]>,
    interval: Duration,
    state: PlaybackState,
}

impl Timeline {
    pub fn new(units: impl Into<Arc<[TypingUnit]>>, interval_ms: i64) -> Result<Self, PlaybackError> {
        let interval = u64::try_from(interval_ms)
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .ok_or(PlaybackError::InvalidInterval(interval_ms))?;
        Ok(Self {
            units: units.into(),
            interval,
            state: PlaybackState::Idle,
        })
    }

    pub fn units(&self) -> &Arc<[TypingUnit]> {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn revealed(&self) -> usize {
        match self.state {
            PlaybackState::Idle | PlaybackState::Armed => 0,
            PlaybackState::Playing { revealed } | PlaybackState::Cancelled { revealed } => revealed,
            PlaybackState::Complete | PlaybackState::Skipped => self.units.len(),
        }
    }

    /// Offset from start at which tick `index` is due.
    pub fn due_offset(&self, index: usize) -> Duration {
        let index = u32::try_from(index).unwrap_or(u32::MAX);
        self.interval.saturating_mul(index)
    }

    /// `len * interval`.
    pub fn nominal_duration(&self) -> Duration {
        self.due_offset(self.units.len())
    }

    fn transition(&mut self, next: PlaybackState) {
        debug_assert!(
            self.state.can_transition_to(&next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        self.state = next;
    }

    pub fn arm(&mut self) -> bool {
        if self.state != PlaybackState::Idle {
            return false;
        }
        self.transition(PlaybackState::Armed);
        true
    }

    /// `Armed -> Playing`. An unarmed timeline stays put.
    pub fn start(&mut self) -> StartOutcome {
        if self.state != PlaybackState::Armed {
            return StartOutcome::Ignored;
        }
        if self.units.is_empty() {
            self.transition(PlaybackState::Complete);
            return StartOutcome::Completed;
        }
        self.transition(PlaybackState::Playing { revealed: 0 });
        StartOutcome::Playing
    }

    /// Reveal the next unit.
    pub fn tick(&mut self) -> TickOutcome {
        let PlaybackState::Playing { revealed } = self.state else {
            return TickOutcome::Ignored;
        };
        let index = revealed;
        let revealed = revealed + 1;
        if revealed >= self.units.len() {
            self.transition(PlaybackState::Complete);
            TickOutcome::Completed { index }
        } else {
            self.transition(PlaybackState::Playing { revealed });
            TickOutcome::Revealed { index }
        }
    }

    /// Freeze at the current reveal count. Returns it when the state changed.
    pub fn cancel(&mut self) -> Option<usize> {
        if self.state.is_terminal() {
            return None;
        }
        let revealed = self.revealed();
        self.transition(PlaybackState::Cancelled { revealed });
        Some(revealed)
    }

    /// Jump to the fully revealed, cursor-less end state.
    pub fn skip(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.transition(PlaybackState::Skipped);
        true
    }

    pub fn cursor(&self) -> CursorPosition {
        if self.state == PlaybackState::Skipped {
            return CursorPosition::Hidden;
        }
        match self.revealed().checked_sub(1) {
            None => CursorPosition::BeforeFirst,
            Some(index) => {
                let (line, column) = self.units[index].position_after();
                CursorPosition::After { index, line, column }
            }
        }
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            state: self.state,
            revealed: self.revealed(),
            total: self.units.len(),
            cursor: self.cursor(),
        }
    }
}
