//! Async terminal input: crossterm `EventStream` mapped onto core events,
//! plus the key bindings of the player.

mod async_service;
pub use async_service::AsyncInputShutdown;

use async_service::spawn_async_event_task;

use core_events::{CommandEvent, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::event::{KeyCode as CKeyCode, KeyModifiers as CMods};
use tokio::task::JoinHandle;

/// Spawn the async input service backed by `crossterm::EventStream`.
///
/// Returns the `JoinHandle` for the background task alongside a shutdown handle
/// that can be used to request immediate termination.
pub fn spawn_async_input(
    sender: tokio::sync::mpsc::Sender<Event>,
) -> (JoinHandle<()>, AsyncInputShutdown) {
    spawn_async_event_task(sender)
}

pub(crate) fn map_mods(m: CMods) -> KeyModifiers {
    let mut out = KeyModifiers::empty();
    if m.contains(CMods::CONTROL) {
        out |= KeyModifiers::CTRL;
    }
    if m.contains(CMods::ALT) {
        out |= KeyModifiers::ALT;
    }
    if m.contains(CMods::SHIFT) {
        out |= KeyModifiers::SHIFT;
    }
    out
}

/// `None` for keys the player never binds (function keys, media keys, ...).
pub(crate) fn map_key_code(code: &CKeyCode) -> Option<KeyCode> {
    let code = match code {
        CKeyCode::Char(c) => KeyCode::Char(*c),
        CKeyCode::Enter => KeyCode::Enter,
        CKeyCode::Esc => KeyCode::Esc,
        CKeyCode::Backspace => KeyCode::Backspace,
        CKeyCode::Tab | CKeyCode::BackTab => KeyCode::Tab,
        CKeyCode::Up => KeyCode::Up,
        CKeyCode::Down => KeyCode::Down,
        CKeyCode::Left => KeyCode::Left,
        CKeyCode::Right => KeyCode::Right,
        _ => return None,
    };
    Some(code)
}

/// Player key bindings.
///
/// | key        | command               |
/// |------------|-----------------------|
/// | `Esc`, `s` | skip to the end       |
/// | `r`        | replay                |
/// | `m`        | toggle reduced motion |
/// | `q`        | quit                  |
pub fn command_for_key(key: &KeyEvent) -> Option<CommandEvent> {
    if key.mods.intersects(KeyModifiers::CTRL | KeyModifiers::ALT) {
        return None;
    }
    let command = match key.code {
        KeyCode::Esc => CommandEvent::Skip,
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            's' => CommandEvent::Skip,
            'r' => CommandEvent::Replay,
            'm' => CommandEvent::ToggleReducedMotion,
            'q' => CommandEvent::Quit,
            _ => return None,
        },
        _ => return None,
    };
    Some(command)
}
