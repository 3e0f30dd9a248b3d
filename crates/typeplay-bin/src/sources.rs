//! Gate-backed event sources.
//!
//! Both sources turn a `watch` channel into host events on the main channel
//! and stop once either side closes.

use core_events::{AsyncEventSource, Event, HostEvent};
use core_gates::{VisibilityGate, wait_for_enter};
use tokio::sync::mpsc::Sender;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Emits `HostEvent::VisibilityEnter` once, when the gate fires.
pub(crate) struct VisibilitySource {
    gate: VisibilityGate,
    ratios: watch::Receiver<f32>,
}

impl VisibilitySource {
    pub(crate) fn new(gate: VisibilityGate, ratios: watch::Receiver<f32>) -> Self {
        Self { gate, ratios }
    }
}

impl AsyncEventSource for VisibilitySource {
    fn name(&self) -> &'static str {
        "visibility"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let Self { mut gate, ratios } = *self;
        tokio::spawn(async move {
            let entered = tokio::select! {
                entered = wait_for_enter(&mut gate, ratios) => entered,
                _ = tx.closed() => None,
            };
            if entered.is_some() {
                let _ = tx.send(Event::Host(HostEvent::VisibilityEnter)).await;
            } else {
                gate.release();
            }
            debug!(target: "gates.visibility", phase = ?gate.phase(), "visibility_source_stopped");
        })
    }
}

/// Forwards every reduced-motion preference change.
pub(crate) struct MotionSource {
    changes: watch::Receiver<bool>,
}

impl MotionSource {
    pub(crate) fn new(changes: watch::Receiver<bool>) -> Self {
        Self { changes }
    }
}

impl AsyncEventSource for MotionSource {
    fn name(&self) -> &'static str {
        "motion"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let mut changes = self.changes;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let reduced = *changes.borrow_and_update();
                        if tx.send(Event::Host(HostEvent::ReducedMotion(reduced))).await.is_err() {
                            break;
                        }
                    }
                    _ = tx.closed() => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::EventSourceRegistry;
    use core_gates::MotionPreference;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn visibility_source_fires_once_on_enter() {
        let (ratio_tx, ratio_rx) = watch::channel(0.0f32);
        let (tx, mut rx) = mpsc::channel(8);
        let mut registry = EventSourceRegistry::new();
        registry.register(VisibilitySource::new(VisibilityGate::new(0.6), ratio_rx));
        let mut handles = registry.spawn_all(&tx);

        ratio_tx.send_replace(0.3);
        ratio_tx.send_replace(1.0);
        assert!(matches!(rx.recv().await, Some(Event::Host(HostEvent::VisibilityEnter))));
        handles.remove(0).await.unwrap();

        ratio_tx.send_replace(0.0);
        ratio_tx.send_replace(1.0);
        drop(tx);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn visibility_source_stops_when_consumer_drops() {
        let (_ratio_tx, ratio_rx) = watch::channel(0.0f32);
        let (tx, rx) = mpsc::channel(8);
        let mut registry = EventSourceRegistry::new();
        registry.register(VisibilitySource::new(VisibilityGate::new(0.6), ratio_rx));
        let handles = registry.spawn_all(&tx);
        drop(tx);
        drop(rx);
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn motion_source_forwards_changes() {
        let motion = MotionPreference::new(false);
        let (tx, mut rx) = mpsc::channel(8);
        let mut registry = EventSourceRegistry::new();
        registry.register(MotionSource::new(motion.subscribe()));
        let _handles = registry.spawn_all(&tx);

        motion.set(true);
        assert!(matches!(
            rx.recv().await,
            Some(Event::Host(HostEvent::ReducedMotion(true)))
        ));
        motion.toggle();
        assert!(matches!(
            rx.recv().await,
            Some(Event::Host(HostEvent::ReducedMotion(false)))
        ));
    }
}
