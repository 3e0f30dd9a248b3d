use crate::{map_key_code, map_mods};
use core_events::{CHANNEL_SEND_FAILURES, Event, FOCUS_CHANGES, InputEvent, KEYPRESS_TOTAL, KeyEvent};
use crossterm::event::{Event as CEvent, EventStream, KeyCode as CKeyCode, KeyEventKind as CKind};
use std::io;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::{Notify, mpsc::Sender};
use tokio::task;
use tokio_stream::{Stream, StreamExt};
use tracing::{Instrument, info, trace, warn};

/// Asks the input task to stop at its next await point.
#[derive(Clone, Debug, Default)]
pub struct AsyncInputShutdown {
    notify: Arc<Notify>,
}

impl AsyncInputShutdown {
    pub fn signal(&self) {
        self.notify.notify_one();
    }
}

/// Spawn a Tokio task reading `EventStream` until shutdown, stream end, or the
/// consumer going away.
pub(crate) fn spawn_async_event_task(
    sender: Sender<Event>,
) -> (task::JoinHandle<()>, AsyncInputShutdown) {
    let shutdown = AsyncInputShutdown::default();
    let notify = Arc::clone(&shutdown.notify);
    let span = tracing::debug_span!(target: "input.thread", "input_async_task");
    let handle = task::spawn(
        async move {
            let reason = pump(EventStream::new(), &sender, &notify).await;
            info!(target: "input.thread", reason = reason.as_str(), "async_input_task_stopped");
        }
        .instrument(span),
    );
    (handle, shutdown)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StopReason {
    Shutdown,
    ChannelClosed,
    StreamEnded,
    StreamError(io::ErrorKind),
}

impl StopReason {
    fn as_str(&self) -> &'static str {
        match self {
            StopReason::Shutdown => "shutdown_signal",
            StopReason::ChannelClosed => "channel_closed",
            StopReason::StreamEnded => "stream_ended",
            StopReason::StreamError(_) => "stream_error",
        }
    }
}

/// Map one terminal event onto the player's events. `None` for key releases,
/// unbound keys and anything else the player ignores.
fn translate(event: CEvent) -> Option<InputEvent> {
    match event {
        CEvent::Key(key) => {
            if !matches!(key.kind, CKind::Press | CKind::Repeat) {
                return None;
            }
            if key.code == CKeyCode::Char('c')
                && key.modifiers.contains(crossterm::event::KeyModifiers::CONTROL)
            {
                return Some(InputEvent::CtrlC);
            }
            let code = map_key_code(&key.code)?;
            Some(InputEvent::Key(KeyEvent {
                code,
                mods: map_mods(key.modifiers),
            }))
        }
        CEvent::Resize(w, h) => Some(InputEvent::Resize(w, h)),
        CEvent::FocusGained => Some(InputEvent::FocusGained),
        CEvent::FocusLost => Some(InputEvent::FocusLost),
        _ => None,
    }
}

fn count(event: &InputEvent) {
    match event {
        InputEvent::Key(_) | InputEvent::CtrlC => {
            KEYPRESS_TOTAL.fetch_add(1, Ordering::Relaxed);
        }
        InputEvent::FocusGained | InputEvent::FocusLost => {
            FOCUS_CHANGES.fetch_add(1, Ordering::Relaxed);
        }
        _ => {}
    }
}

/// Forward translated events until something stops the flow.
async fn pump<S>(mut stream: S, sender: &Sender<Event>, shutdown: &Notify) -> StopReason
where
    S: Stream<Item = io::Result<CEvent>> + Unpin,
{
    info!(target: "input.thread", "async_input_task_started");
    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.notified() => return StopReason::Shutdown,
            next = stream.next() => next,
        };
        let event = match next {
            None => return StopReason::StreamEnded,
            Some(Err(err)) => {
                warn!(target: "input.thread", error_kind = ?err.kind(), "async_input_task_stream_error");
                return StopReason::StreamError(err.kind());
            }
            Some(Ok(raw)) => raw,
        };
        let Some(input) = translate(event) else {
            continue;
        };
        trace!(target: "input.event", event = ?input, "forward");
        count(&input);
        if sender.send(Event::Input(input)).await.is_err() {
            CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
            return StopReason::ChannelClosed;
        }
    }
}
