//! Playback lifecycle states and the derived cursor.

use std::fmt;

/// Lifecycle of one scheduler instance.
///
/// `Idle -> Armed -> Playing(n) -> Complete` is the natural path. `Skipped`
/// and `Cancelled` are terminal exits reachable from any non-terminal state.
/// Nothing ever moves backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Armed,
    Playing { revealed: usize },
    Complete,
    Skipped,
    Cancelled { revealed: usize },
}

impl PlaybackState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Skipped | Self::Cancelled { .. })
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Armed => "armed",
            Self::Playing { .. } => "playing",
            Self::Complete => "complete",
            Self::Skipped => "skipped",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Armed => 1,
            Self::Playing { .. } => 2,
            Self::Complete | Self::Skipped | Self::Cancelled { .. } => 3,
        }
    }

    /// Forward-only transition check, including `revealed` monotonicity.
    pub fn can_transition_to(&self, next: &PlaybackState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (Self::Playing { revealed: a }, Self::Playing { revealed: b }) => b >= a,
            (Self::Playing { revealed: a }, Self::Cancelled { revealed: b }) => b == a,
            (Self::Idle, Self::Playing { .. } | Self::Complete) => false,
            (_, Self::Cancelled { revealed }) => *revealed == 0,
            _ => next.rank() > self.rank(),
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Playing { revealed } | Self::Cancelled { revealed } => {
                write!(f, "{}({revealed})", self.label())
            }
            other => f.write_str(other.label()),
        }
    }
}

/// Where the typing cursor sits. Always derived from the reveal count, never
/// stored on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorPosition {
    /// Nothing revealed yet.
    BeforeFirst,
    /// Immediately after unit `index`, at layout `(line, column)`.
    After {
        index: usize,
        line: usize,
        column: u16,
    },
    /// Suppressed (skipped or reduced-motion presentation).
    Hidden,
}

/// Point-in-time view published to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    pub revealed: usize,
    pub total: usize,
    pub cursor: CursorPosition,
}

impl PlaybackSnapshot {
    pub fn initial(total: usize) -> Self {
        Self {
            state: PlaybackState::Idle,
            revealed: 0,
            total,
            cursor: CursorPosition::BeforeFirst,
        }
    }

    /// Whether a live cursor indicator should be drawn.
    pub fn shows_indicator(&self) -> bool {
        self.state.is_playing()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ReducedMotion,
    User,
}

/// Lifecycle notifications for the host event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Started { total: usize },
    Revealed { index: usize },
    Completed { total: usize },
    Skipped { reason: SkipReason },
    Cancelled { revealed: usize },
}
