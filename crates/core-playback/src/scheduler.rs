//! Async playback driver.
//!
//! One tokio task owns the tick timer. Every state mutation happens under the
//! scheduler lock, and the lock is released before the task awaits its next
//! tick, so `cancel`/`skip` from any caller either land before a tick or
//! after it, never in the middle. Dropping the scheduler aborts its tasks
//! without publishing anything.

use crate::timeline::{StartOutcome, TickOutcome, Timeline};
use crate::{PlaybackError, PlaybackEvent, PlaybackSnapshot, SkipReason};
use core_gates::MotionPreference;
use core_text::TypingUnit;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default cadence between reveal ticks.
pub const DEFAULT_INTERVAL_MS: i64 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackOptions {
    /// Must be strictly positive.
    pub per_unit_interval_ms: i64,
    /// Force the reduced-motion presentation regardless of the shared
    /// preference.
    pub reduced_motion: bool,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            per_unit_interval_ms: DEFAULT_INTERVAL_MS,
            reduced_motion: false,
        }
    }
}

struct Inner {
    timeline: Timeline,
    completion: Option<oneshot::Sender<()>>,
    timer: Option<JoinHandle<()>>,
}

struct Shared {
    inner: Mutex<Inner>,
    snapshots: watch::Sender<PlaybackSnapshot>,
    events: Option<mpsc::UnboundedSender<PlaybackEvent>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &Inner) {
        self.snapshots.send_replace(inner.timeline.snapshot());
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(tx) = &self.events {
            // Receiver gone means the host stopped listening; playback goes on.
            let _ = tx.send(event);
        }
    }

    fn complete(&self, inner: &mut Inner) {
        if let Some(tx) = inner.completion.take() {
            let _ = tx.send(());
        }
        let total = inner.timeline.len();
        tracing::debug!(target: "playback", total, "playback_complete");
        self.emit(PlaybackEvent::Completed { total });
    }

    fn tick(&self) -> bool {
        let mut inner = self.lock();
        match inner.timeline.tick() {
            TickOutcome::Ignored => false,
            TickOutcome::Revealed { index } => {
                tracing::trace!(target: "playback", index, "reveal_tick");
                self.publish(&inner);
                self.emit(PlaybackEvent::Revealed { index });
                true
            }
            TickOutcome::Completed { index } => {
                tracing::trace!(target: "playback", index, "reveal_tick");
                // The timer is this very task; it ends on its own.
                inner.timer = None;
                self.publish(&inner);
                self.emit(PlaybackEvent::Revealed { index });
                self.complete(&mut inner);
                false
            }
        }
    }

    /// Reduced-motion short-circuit: everything visible, no cursor, and the
    /// caller still gets its completion.
    fn skip_for_motion(&self) -> bool {
        let mut inner = self.lock();
        if !inner.timeline.skip() {
            return false;
        }
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        tracing::info!(target: "playback", total = inner.timeline.len(), "playback_skipped_reduced_motion");
        self.publish(&inner);
        self.emit(PlaybackEvent::Skipped {
            reason: SkipReason::ReducedMotion,
        });
        self.complete(&mut inner);
        true
    }
}

async fn run_ticks(shared: Arc<Shared>, period: std::time::Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        // First tick resolves immediately: unit 0 is revealed at t = 0.
        ticker.tick().await;
        if !shared.tick() {
            break;
        }
    }
}

async fn watch_motion(shared: Arc<Shared>, mut preference: watch::Receiver<bool>) {
    while preference.changed().await.is_ok() {
        let reduced = *preference.borrow_and_update();
        if reduced {
            shared.skip_for_motion();
            break;
        }
    }
}

/// Single-use playback of one unit sequence.
///
/// Construct, optionally [`arm`](Self::arm) when the surface becomes visible,
/// then [`start`](Self::start). Restarting means building a new scheduler.
/// Must be created inside a tokio runtime.
pub struct PlaybackScheduler {
    shared: Arc<Shared>,
    on_complete: Option<oneshot::Receiver<()>>,
    motion_task: Option<JoinHandle<()>>,
    reduced_motion: bool,
    motion: MotionPreference,
}

impl PlaybackScheduler {
    pub fn new(
        units: impl Into<Arc<[TypingUnit]>>,
        options: PlaybackOptions,
        motion: MotionPreference,
        events: Option<mpsc::UnboundedSender<PlaybackEvent>>,
    ) -> Result<Self, PlaybackError> {
        let timeline = Timeline::new(units, options.per_unit_interval_ms)?;
        let (snapshots, _) = watch::channel(timeline.snapshot());
        let (completion_tx, completion_rx) = oneshot::channel();
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                timeline,
                completion: Some(completion_tx),
                timer: None,
            }),
            snapshots,
            events,
        });

        let mut scheduler = Self {
            shared,
            on_complete: Some(completion_rx),
            motion_task: None,
            reduced_motion: options.reduced_motion,
            motion,
        };
        // Subscribe before reading so a concurrent `set(true)` is either seen
        // here or delivered to the watcher.
        let preference = scheduler.motion.subscribe();
        if scheduler.wants_reduced_motion() {
            scheduler.shared.skip_for_motion();
        } else {
            let watcher = watch_motion(Arc::clone(&scheduler.shared), preference);
            scheduler.motion_task = Some(tokio::spawn(watcher));
        }
        Ok(scheduler)
    }

    fn wants_reduced_motion(&self) -> bool {
        self.reduced_motion || self.motion.is_reduced()
    }

    /// Visibility fired. `Idle -> Armed`; no-op otherwise.
    pub fn arm(&self) -> bool {
        let mut inner = self.shared.lock();
        let armed = inner.timeline.arm();
        if armed {
            tracing::debug!(target: "playback", "playback_armed");
            self.shared.publish(&inner);
        }
        armed
    }

    /// Begin revealing. Returns `false` when not armed, already started or
    /// finished.
    pub fn start(&self) -> bool {
        if self.wants_reduced_motion() {
            self.shared.skip_for_motion();
            return false;
        }
        let mut inner = self.shared.lock();
        match inner.timeline.start() {
            StartOutcome::Ignored => {
                tracing::trace!(target: "playback", state = %inner.timeline.state(), "start_ignored");
                false
            }
            StartOutcome::Completed => {
                self.shared.publish(&inner);
                self.shared.emit(PlaybackEvent::Started { total: 0 });
                self.shared.complete(&mut inner);
                true
            }
            StartOutcome::Playing => {
                let total = inner.timeline.len();
                tracing::debug!(
                    target: "playback",
                    total,
                    interval_ms = inner.timeline.interval().as_millis() as u64,
                    "playback_started"
                );
                self.shared.publish(&inner);
                self.shared.emit(PlaybackEvent::Started { total });
                let period = inner.timeline.interval();
                inner.timer = Some(tokio::spawn(run_ticks(Arc::clone(&self.shared), period)));
                true
            }
        }
    }

    /// Stop immediately. No further ticks, no completion, cursor stays where
    /// it is.
    pub fn cancel(&self) -> bool {
        let mut inner = self.shared.lock();
        let Some(revealed) = inner.timeline.cancel() else {
            return false;
        };
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        inner.completion = None;
        tracing::debug!(target: "playback", revealed, "playback_cancelled");
        self.shared.publish(&inner);
        self.shared.emit(PlaybackEvent::Cancelled { revealed });
        true
    }

    /// User-requested jump to the end. Shows everything, hides the cursor,
    /// and does not count as natural completion.
    pub fn skip(&self) -> bool {
        let mut inner = self.shared.lock();
        if !inner.timeline.skip() {
            return false;
        }
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        inner.completion = None;
        tracing::debug!(target: "playback", "playback_skipped_by_user");
        self.shared.publish(&inner);
        self.shared.emit(PlaybackEvent::Skipped {
            reason: SkipReason::User,
        });
        true
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        *self.shared.snapshots.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.shared.snapshots.subscribe()
    }

    /// Resolves `Ok(())` once on natural completion; resolves `Err` when the
    /// run ends any other way. Can be taken once.
    pub fn take_on_complete(&mut self) -> Option<oneshot::Receiver<()>> {
        self.on_complete.take()
    }

    pub fn units(&self) -> Arc<[TypingUnit]> {
        Arc::clone(self.shared.lock().timeline.units())
    }
}

impl std::fmt::Debug for PlaybackScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackScheduler")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl Drop for PlaybackScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.motion_task.take() {
            task.abort();
        }
        let mut inner = self.shared.lock();
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        inner.completion = None;
    }
}

/// Build and immediately start a scheduler.
pub fn play(
    units: impl Into<Arc<[TypingUnit]>>,
    options: PlaybackOptions,
    motion: MotionPreference,
) -> Result<PlaybackScheduler, PlaybackError> {
    play_with_events(units, options, motion, None)
}

pub fn play_with_events(
    units: impl Into<Arc<[TypingUnit]>>,
    options: PlaybackOptions,
    motion: MotionPreference,
    events: Option<mpsc::UnboundedSender<PlaybackEvent>>,
) -> Result<PlaybackScheduler, PlaybackError> {
    let scheduler = PlaybackScheduler::new(units, options, motion, events)?;
    scheduler.arm();
    scheduler.start();
    Ok(scheduler)
}
