//! Core event types and channel helpers for typeplay.
//!
//! Everything the host loop reacts to arrives as one [`Event`] on a single
//! bounded channel: terminal input, host signals, playback lifecycle, and the
//! periodic tick that drives the cursor blink.

use core_playback::PlaybackEvent;
use std::fmt;
use std::sync::atomic::AtomicU64;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

// -------------------------------------------------------------------------------------------------
// Channel Policy
// -------------------------------------------------------------------------------------------------
// Bounded mpsc channel sized by `EVENT_CHANNEL_CAP`. Producers await on a full channel rather than
// dropping events; with one consumer (the main loop) latency stays low. Send failures only happen
// once the consumer is gone and are counted below.
// -------------------------------------------------------------------------------------------------
pub const EVENT_CHANNEL_CAP: usize = 1024;

// -------------------------------------------------------------------------------------------------
// Telemetry
// -------------------------------------------------------------------------------------------------
// Relaxed atomic counters, inspected in tests and logged at shutdown.
// -------------------------------------------------------------------------------------------------
pub static CHANNEL_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);
pub static KEYPRESS_TOTAL: AtomicU64 = AtomicU64::new(0);
/// Focus reports forwarded; each one moves the visibility ratio.
pub static FOCUS_CHANGES: AtomicU64 = AtomicU64::new(0);

/// Top-level event enum consumed by the central event loop.
#[derive(Debug, Clone)]
pub enum Event {
    Input(InputEvent),
    Command(CommandEvent),
    Host(HostEvent),
    Playback(PlaybackEvent),
    /// Periodic tick; drives the cursor indicator blink.
    Tick,
    Shutdown,
}

/// User intents decoded from key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandEvent {
    /// Jump to the fully revealed end state.
    Skip,
    /// Discard the current run and play again from the start.
    Replay,
    /// Flip the reduced-motion preference for the session.
    ToggleReducedMotion,
    Quit,
}

/// Host signals after they passed through the gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    /// The visibility gate fired: the surface is mostly visible.
    VisibilityEnter,
    /// Reduced-motion preference now holds this value.
    ReducedMotion(bool),
}

// -------------------------------------------------------------------------------------------------
// Async Event Sources
// -------------------------------------------------------------------------------------------------
// Every producer other than the input task registers through the same trait. Each source owns its
// own task and must stop promptly once `tx.send(..)` fails (consumer dropped).
// -------------------------------------------------------------------------------------------------

/// Trait implemented by any async event producer. Implementors usually hold configuration and
/// spawn one background task that pushes `Event`s into the shared channel.
pub trait AsyncEventSource: Send + 'static {
    /// Stable identifier used in logs.
    fn name(&self) -> &'static str;
    /// Consume self and spawn the background task. Implementors stop when `tx.send(..).await`
    /// returns Err and must await timers or IO rather than spin.
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()>;
}

/// Registry of event sources spawned together at startup.
pub struct EventSourceRegistry {
    sources: Vec<Box<dyn AsyncEventSource>>,
}

impl Default for EventSourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn register<S: AsyncEventSource>(&mut self, src: S) {
        self.sources.push(Box::new(src));
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Spawn all registered sources, returning their JoinHandles. Each source receives its own
    /// clone of `tx`; the registry keeps none.
    ///
    /// During shutdown the caller drops its final `Sender` before awaiting the handles so the
    /// sources observe the closed channel and exit cooperatively.
    pub fn spawn_all(&mut self, tx: &Sender<Event>) -> Vec<JoinHandle<()>> {
        // Drain so a second call spawns nothing.
        let mut out = Vec::with_capacity(self.sources.len());
        for src in self.sources.drain(..) {
            let name = src.name();
            tracing::info!(target: "runtime.events", source = name, "spawning event source");
            out.push(src.spawn(tx.clone()));
        }
        out
    }
}

/// Emits `Event::Tick` every configured interval.
pub struct TickEventSource {
    interval: std::time::Duration,
}

impl TickEventSource {
    pub fn new(interval: std::time::Duration) -> Self {
        Self { interval }
    }
}

impl AsyncEventSource for TickEventSource {
    fn name(&self) -> &'static str {
        "tick"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let dur = self.interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(dur);
            loop {
                interval.tick().await;
                if tx.send(Event::Tick).await.is_err() {
                    break;
                }
            }
        })
    }
}

/// Normalized terminal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    /// Terminal resize (columns, rows).
    Resize(u16, u16),
    /// Interrupt surfaced distinctly from ordinary keys.
    CtrlC,
    FocusGained,
    FocusLost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub mods: KeyModifiers,
}

impl KeyEvent {
    pub fn plain(code: KeyCode) -> Self {
        Self {
            code,
            mods: KeyModifiers::empty(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Char(char),
    Enter,
    Esc,
    Backspace,
    Tab,
    Up,
    Down,
    Left,
    Right,
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct KeyModifiers: u8 {
        const CTRL = 0b0000_0001;
        const ALT  = 0b0000_0010;
        const SHIFT= 0b0000_0100;
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}{:?}", self.code, self.mods)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_event_display_includes_mods() {
        let ev = KeyEvent {
            code: KeyCode::Char('c'),
            mods: KeyModifiers::CTRL,
        };
        let shown = ev.to_string();
        assert!(shown.contains("Char('c')"));
        assert!(shown.contains("CTRL"));
        assert_eq!(KeyEvent::plain(KeyCode::Esc).mods, KeyModifiers::empty());
    }
}
