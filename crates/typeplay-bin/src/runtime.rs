//! Player runtime: the central event loop.
//!
//! Owns the playback scheduler, the presentation surface and the render
//! scheduler. Everything that can change the screen arrives as one of:
//! an [`Event`] from the shared channel, a snapshot from the playback `watch`,
//! a [`PlaybackEvent`], or the completion signal. Each loop iteration handles
//! exactly one of those, then paints at most one frame.

use anyhow::Result;
use core_events::{
    CHANNEL_SEND_FAILURES, CommandEvent, Event, FOCUS_CHANGES, HostEvent, InputEvent, KEYPRESS_TOTAL,
};
use core_gates::MotionPreference;
use core_playback::{PlaybackEvent, PlaybackOptions, PlaybackScheduler, PlaybackSnapshot};
use core_render::{RenderDelta, RenderScheduler, Surface, Writer, timing};
use core_text::TypingUnit;
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

pub(crate) enum LoopControl {
    Continue,
    Break { reason: ShutdownReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShutdownReason {
    CtrlC,
    CommandQuit,
    ShutdownEvent,
    ChannelClosed,
}

impl ShutdownReason {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            ShutdownReason::CtrlC => "ctrl_c",
            ShutdownReason::CommandQuit => "command_quit",
            ShutdownReason::ShutdownEvent => "shutdown_event",
            ShutdownReason::ChannelClosed => "channel_closed",
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn log_shutdown_stage(reason: ShutdownReason, stage: &'static str) {
    info!(
        target: "runtime.shutdown",
        reason = reason.as_str(),
        stage = stage,
        "shutdown_stage"
    );
}

/// Active run plus the channels observing it.
struct Run {
    scheduler: PlaybackScheduler,
    snapshots: Option<watch::Receiver<PlaybackSnapshot>>,
    completion: Option<oneshot::Receiver<()>>,
}

impl Run {
    fn new(mut scheduler: PlaybackScheduler) -> Self {
        let snapshots = Some(scheduler.subscribe());
        let completion = scheduler.take_on_complete();
        Self {
            scheduler,
            snapshots,
            completion,
        }
    }
}

async fn next_snapshot(rx: &mut Option<watch::Receiver<PlaybackSnapshot>>) -> PlaybackSnapshot {
    let Some(inner) = rx.as_mut() else {
        return std::future::pending().await;
    };
    match inner.changed().await {
        Ok(()) => *inner.borrow_and_update(),
        Err(_) => {
            *rx = None;
            std::future::pending().await
        }
    }
}

/// `true` on natural completion, `false` when the run ended any other way.
async fn completion(rx: &mut Option<oneshot::Receiver<()>>) -> bool {
    let Some(inner) = rx.as_mut() else {
        return std::future::pending().await;
    };
    let fired = inner.await.is_ok();
    *rx = None;
    fired
}

pub(crate) struct RuntimeParts<W> {
    pub units: Arc<[TypingUnit]>,
    pub options: PlaybackOptions,
    pub motion: MotionPreference,
    /// `None` in static mode.
    pub scheduler: Option<PlaybackScheduler>,
    pub playback_tx: mpsc::UnboundedSender<PlaybackEvent>,
    pub playback_rx: mpsc::UnboundedReceiver<PlaybackEvent>,
    pub ratios: watch::Sender<f32>,
    pub surface: Surface,
    pub out: W,
}

pub(crate) struct PlayerRuntime<W: Write> {
    units: Arc<[TypingUnit]>,
    options: PlaybackOptions,
    motion: MotionPreference,
    run: Option<Run>,
    visible: bool,
    playback_tx: mpsc::UnboundedSender<PlaybackEvent>,
    playback_rx: mpsc::UnboundedReceiver<PlaybackEvent>,
    ratios: watch::Sender<f32>,
    surface: Surface,
    render: RenderScheduler,
    out: W,
    completions: u64,
    rx: mpsc::Receiver<Event>,
    tx: Option<mpsc::Sender<Event>>,
    source_handles: Vec<JoinHandle<()>>,
    input_task: Option<JoinHandle<()>>,
    input_shutdown: Option<core_input::AsyncInputShutdown>,
}

impl<W: Write> PlayerRuntime<W> {
    pub(crate) fn new(
        parts: RuntimeParts<W>,
        tx: mpsc::Sender<Event>,
        rx: mpsc::Receiver<Event>,
        source_handles: Vec<JoinHandle<()>>,
    ) -> Self {
        let RuntimeParts {
            units,
            options,
            motion,
            scheduler,
            playback_tx,
            playback_rx,
            ratios,
            mut surface,
            out,
        } = parts;
        surface.set_reduced_motion(motion.is_reduced());
        let run = scheduler.map(Run::new);
        if let Some(run) = &run {
            surface.apply_snapshot(run.scheduler.snapshot());
        }
        Self {
            units,
            options,
            motion,
            run,
            visible: false,
            playback_tx,
            playback_rx,
            ratios,
            surface,
            render: RenderScheduler::new(),
            out,
            completions: 0,
            rx,
            tx: Some(tx),
            source_handles,
            input_task: None,
            input_shutdown: None,
        }
    }

    pub(crate) fn attach_input(
        &mut self,
        task: JoinHandle<()>,
        shutdown: core_input::AsyncInputShutdown,
    ) {
        self.input_task = Some(task);
        self.input_shutdown = Some(shutdown);
    }

    pub(crate) async fn run(&mut self) -> Result<ShutdownReason> {
        self.render.mark(RenderDelta::Full);
        self.finish_cycle();

        let loop_span = tracing::debug_span!(target: "runtime", "event_loop");
        let _enter_loop = loop_span.enter();

        let mut shutdown_reason = ShutdownReason::ChannelClosed;
        // Stand-ins polled in static mode; they stay pending forever.
        let mut no_snapshots: Option<watch::Receiver<PlaybackSnapshot>> = None;
        let mut no_completion: Option<oneshot::Receiver<()>> = None;
        loop {
            let (snapshots, completion_rx) = match self.run.as_mut() {
                Some(run) => (&mut run.snapshots, &mut run.completion),
                None => (&mut no_snapshots, &mut no_completion),
            };
            let control = tokio::select! {
                event = self.rx.recv() => match event {
                    Some(event) => self.handle_event(&event),
                    None => LoopControl::Break { reason: ShutdownReason::ChannelClosed },
                },
                Some(event) = self.playback_rx.recv() => self.handle_playback_event(&event),
                snapshot = next_snapshot(snapshots) => self.handle_snapshot(snapshot),
                fired = completion(completion_rx) => self.handle_completion(fired),
            };
            match control {
                LoopControl::Break { reason } => {
                    shutdown_reason = reason;
                    break;
                }
                LoopControl::Continue => self.finish_cycle(),
            }
        }

        self.rx.close();
        self.finalize_shutdown(shutdown_reason).await;
        Ok(shutdown_reason)
    }

    fn handle_event(&mut self, event: &Event) -> LoopControl {
        match event {
            Event::Input(input) => self.handle_input_event(input),
            Event::Command(cmd) => self.handle_command_event(cmd),
            Event::Host(host) => self.handle_host_event(host),
            Event::Playback(ev) => self.handle_playback_event(ev),
            Event::Tick => self.handle_tick(),
            Event::Shutdown => LoopControl::Break {
                reason: ShutdownReason::ShutdownEvent,
            },
        }
    }

    fn handle_input_event(&mut self, input: &InputEvent) -> LoopControl {
        match input {
            InputEvent::CtrlC => {
                info!(target: "runtime", "shutdown");
                LoopControl::Break {
                    reason: ShutdownReason::CtrlC,
                }
            }
            InputEvent::Key(key) => match core_input::command_for_key(key) {
                Some(cmd) => self.handle_command_event(&cmd),
                None => {
                    trace!(target: "input.event", %key, "key_unbound");
                    LoopControl::Continue
                }
            },
            InputEvent::Resize(w, h) => {
                let delta = self.surface.resize(*w, *h);
                self.render.mark(delta);
                LoopControl::Continue
            }
            InputEvent::FocusGained => self.observe_ratio(1.0),
            InputEvent::FocusLost => self.observe_ratio(0.0),
        }
    }

    fn observe_ratio(&mut self, ratio: f32) -> LoopControl {
        self.ratios.send_replace(ratio);
        LoopControl::Continue
    }

    fn handle_command_event(&mut self, cmd: &CommandEvent) -> LoopControl {
        match cmd {
            CommandEvent::Skip => {
                if let Some(run) = &self.run {
                    run.scheduler.skip();
                }
            }
            CommandEvent::Replay => self.replay(),
            CommandEvent::ToggleReducedMotion => {
                let reduced = self.motion.toggle();
                debug!(target: "gates.motion", reduced, "motion_toggled_by_user");
            }
            CommandEvent::Quit => {
                return LoopControl::Break {
                    reason: ShutdownReason::CommandQuit,
                };
            }
        }
        LoopControl::Continue
    }

    fn handle_host_event(&mut self, host: &HostEvent) -> LoopControl {
        match host {
            HostEvent::VisibilityEnter => {
                self.visible = true;
                if let Some(run) = &self.run {
                    run.scheduler.arm();
                    run.scheduler.start();
                }
            }
            HostEvent::ReducedMotion(reduced) => {
                if let Some(delta) = self.surface.set_reduced_motion(*reduced) {
                    self.render.mark(delta);
                }
            }
        }
        LoopControl::Continue
    }

    fn handle_playback_event(&mut self, event: &PlaybackEvent) -> LoopControl {
        match event {
            PlaybackEvent::Revealed { index } => {
                trace!(target: "playback", index, "reveal_observed");
            }
            PlaybackEvent::Completed { total } => {
                info!(target: "playback", total, "playback_complete");
            }
            other => debug!(target: "playback", event = ?other, "playback_event"),
        }
        LoopControl::Continue
    }

    fn handle_snapshot(&mut self, snapshot: PlaybackSnapshot) -> LoopControl {
        if let Some(delta) = self.surface.apply_snapshot(snapshot) {
            self.render.mark(delta);
        }
        LoopControl::Continue
    }

    fn handle_completion(&mut self, fired: bool) -> LoopControl {
        if fired {
            self.completions += 1;
            info!(target: "playback", completions = self.completions, "on_complete");
        }
        LoopControl::Continue
    }

    fn handle_tick(&mut self) -> LoopControl {
        if let Some(delta) = self.surface.toggle_blink() {
            self.render.mark(delta);
        }
        LoopControl::Continue
    }

    /// Drop the current run and play the same units again.
    fn replay(&mut self) {
        let Some(previous) = self.run.take() else {
            return;
        };
        drop(previous);
        match PlaybackScheduler::new(
            Arc::clone(&self.units),
            self.options,
            self.motion.clone(),
            Some(self.playback_tx.clone()),
        ) {
            Ok(scheduler) => {
                let run = Run::new(scheduler);
                let delta = self.surface.reset(run.scheduler.snapshot());
                self.render.mark(delta);
                if self.visible {
                    run.scheduler.arm();
                    run.scheduler.start();
                }
                info!(target: "playback", visible = self.visible, "replay");
                self.run = Some(run);
            }
            Err(err) => error!(target: "playback", error = %err, "replay_failed"),
        }
    }

    fn finish_cycle(&mut self) {
        let Some(decision) = self.render.consume() else {
            return;
        };
        trace!(
            target: "render",
            semantic = ?decision.semantic,
            effective = ?decision.effective,
            "render_decision"
        );
        let started = Instant::now();
        let mut writer = Writer::new();
        self.surface.render(&decision.effective, &mut writer);
        match writer.flush_to(&mut self.out) {
            Ok(stats) => {
                timing::record_frame_ns(started.elapsed().as_nanos() as u64);
                trace!(
                    target: "render",
                    print_commands = stats.print_commands,
                    cells_printed = stats.cells_printed,
                    "frame_flushed"
                );
            }
            Err(e) => error!(target: "render", ?e, "render_error"),
        }
    }

    async fn finalize_shutdown(&mut self, reason: ShutdownReason) {
        log_shutdown_stage(reason, "begin");
        if let Some(run) = self.run.take() {
            let snapshot = run.scheduler.snapshot();
            debug!(target: "runtime.shutdown", state = %snapshot.state, revealed = snapshot.revealed, "dropping_scheduler");
        }
        if let Some(tx) = self.tx.take() {
            trace!(
                target: "runtime.shutdown",
                reason = reason.as_str(),
                "dropping_runtime_sender"
            );
            drop(tx);
        }

        while let Some(handle) = self.source_handles.pop() {
            match tokio::time::timeout(Duration::from_millis(200), handle).await {
                Ok(Ok(_)) => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_stopped"
                ),
                Ok(Err(err)) if err.is_cancelled() => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_cancelled"
                ),
                Ok(Err(err)) => error!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    ?err,
                    "event_source_task_error"
                ),
                Err(_) => warn!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_timeout"
                ),
            }
        }

        if let Some(shutdown) = self.input_shutdown.take() {
            trace!(
                target: "runtime.shutdown",
                reason = reason.as_str(),
                "input_task_shutdown_signal"
            );
            shutdown.signal();
        }

        if let Some(handle) = self.input_task.take() {
            match handle.await {
                Ok(_) => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "input_task_joined"
                ),
                Err(err) if err.is_cancelled() => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "input_task_cancelled"
                ),
                Err(err) => error!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    ?err,
                    "input_task_join_failed"
                ),
            }
        }

        info!(
            target: "runtime.shutdown",
            frames = timing::frames_painted(),
            last_frame_ns = timing::last_frame_ns(),
            completions = self.completions,
            "render_summary"
        );
        info!(
            target: "runtime.shutdown",
            keypresses = KEYPRESS_TOTAL.load(Ordering::Relaxed),
            focus_changes = FOCUS_CHANGES.load(Ordering::Relaxed),
            send_failures = CHANNEL_SEND_FAILURES.load(Ordering::Relaxed),
            "input_summary"
        );
        log_shutdown_stage(reason, "complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::VisibilitySource;
    use core_events::{EventSourceRegistry, KeyCode, KeyEvent};
    use core_gates::VisibilityGate;
    use core_playback::PlaybackState;
    use core_render::{SurfaceMode, SurfaceOptions};
    use core_terminal::ColorDepth;
    use core_text::{StyledRun, decompose};

    /// Nine units: eight glyphs and a line break.
    const SOURCE: &str = "print(1)\n";

    struct Harness {
        runtime: PlayerRuntime<Vec<u8>>,
        tx: mpsc::Sender<Event>,
        ratios: watch::Receiver<f32>,
    }

    fn harness(reduced: bool, animated: bool) -> Harness {
        let units: Arc<[TypingUnit]> = decompose(&[StyledRun::plain(SOURCE)]).unwrap().into();
        let options = PlaybackOptions::default();
        let motion = MotionPreference::new(reduced);
        let (playback_tx, playback_rx) = mpsc::unbounded_channel();
        let surface_options = SurfaceOptions {
            title: "typeplay".into(),
            label: "python".into(),
            indicator: true,
            color_depth: ColorDepth::TrueColor,
        };
        let (surface, scheduler) = if animated {
            let scheduler = PlaybackScheduler::new(
                Arc::clone(&units),
                options,
                motion.clone(),
                Some(playback_tx.clone()),
            )
            .unwrap();
            let surface = Surface::new(Arc::clone(&units), surface_options, (80, 24));
            (surface, Some(scheduler))
        } else {
            let surface = Surface::new_static(Arc::clone(&units), surface_options, (80, 24));
            (surface, None)
        };
        let (ratio_tx, ratio_rx) = watch::channel(0.0f32);
        let (tx, rx) = mpsc::channel(64);
        let parts = RuntimeParts {
            units,
            options,
            motion,
            scheduler,
            playback_tx,
            playback_rx,
            ratios: ratio_tx,
            surface,
            out: Vec::new(),
        };
        Harness {
            runtime: PlayerRuntime::new(parts, tx.clone(), rx, Vec::new()),
            tx,
            ratios: ratio_rx,
        }
    }

    fn key(c: char) -> Event {
        Event::Input(InputEvent::Key(KeyEvent::plain(KeyCode::Char(c))))
    }

    /// Send each event after its delay (milliseconds since the previous one).
    fn drive(tx: mpsc::Sender<Event>, script: Vec<(u64, Event)>) -> JoinHandle<()> {
        tokio::spawn(async move {
            for (delay_ms, event) in script {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        })
    }

    fn output(runtime: &PlayerRuntime<Vec<u8>>) -> String {
        String::from_utf8_lossy(&runtime.out).into_owned()
    }

    #[tokio::test(start_paused = true)]
    async fn visible_run_completes_once() {
        let Harness { mut runtime, tx, .. } = harness(false, true);
        let driver = drive(
            tx,
            vec![(0, Event::Host(HostEvent::VisibilityEnter)), (1_000, key('q'))],
        );
        let reason = runtime.run().await.unwrap();
        driver.await.unwrap();
        assert_eq!(reason, ShutdownReason::CommandQuit);
        assert_eq!(runtime.completions, 1);
        let snapshot = runtime.surface.snapshot();
        assert_eq!(snapshot.state, PlaybackState::Complete);
        assert_eq!(snapshot.revealed, 9);
        assert!(output(&runtime).contains("complete"));
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_surface_never_starts() {
        let Harness { mut runtime, tx, .. } = harness(false, true);
        let driver = drive(tx, vec![(500, key('q'))]);
        runtime.run().await.unwrap();
        driver.await.unwrap();
        assert_eq!(runtime.surface.snapshot().state, PlaybackState::Idle);
        assert_eq!(runtime.completions, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn focus_gain_opens_the_visibility_gate() {
        let Harness {
            mut runtime,
            tx,
            ratios,
        } = harness(false, true);
        let mut registry = EventSourceRegistry::new();
        registry.register(VisibilitySource::new(VisibilityGate::new(0.6), ratios));
        runtime.source_handles = registry.spawn_all(&tx);
        let driver = drive(
            tx,
            vec![
                (50, Event::Input(InputEvent::FocusLost)),
                (50, Event::Input(InputEvent::FocusGained)),
                (1_000, key('q')),
            ],
        );
        runtime.run().await.unwrap();
        driver.await.unwrap();
        assert_eq!(runtime.surface.snapshot().state, PlaybackState::Complete);
        assert_eq!(runtime.completions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reduced_motion_shows_everything_and_completes() {
        let Harness { mut runtime, tx, .. } = harness(true, true);
        let driver = drive(tx, vec![(10, key('q'))]);
        runtime.run().await.unwrap();
        driver.await.unwrap();
        let snapshot = runtime.surface.snapshot();
        assert_eq!(snapshot.state, PlaybackState::Skipped);
        assert_eq!(snapshot.revealed, 9);
        assert_eq!(runtime.completions, 1);
        assert!(output(&runtime).contains("reduced motion"));
    }

    #[tokio::test(start_paused = true)]
    async fn skip_key_ends_without_completion() {
        let Harness { mut runtime, tx, .. } = harness(false, true);
        let driver = drive(
            tx,
            vec![
                (0, Event::Host(HostEvent::VisibilityEnter)),
                (100, key('s')),
                (100, key('q')),
            ],
        );
        runtime.run().await.unwrap();
        driver.await.unwrap();
        let snapshot = runtime.surface.snapshot();
        assert_eq!(snapshot.state, PlaybackState::Skipped);
        assert_eq!(snapshot.revealed, 9);
        assert_eq!(runtime.completions, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn motion_toggle_mid_play_skips_with_completion() {
        let Harness { mut runtime, tx, .. } = harness(false, true);
        let driver = drive(
            tx,
            vec![
                (0, Event::Host(HostEvent::VisibilityEnter)),
                (100, key('m')),
                (100, key('q')),
            ],
        );
        runtime.run().await.unwrap();
        driver.await.unwrap();
        assert!(runtime.motion.is_reduced());
        assert_eq!(runtime.surface.snapshot().state, PlaybackState::Skipped);
        assert_eq!(runtime.completions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn replay_runs_the_same_units_again() {
        let Harness { mut runtime, tx, .. } = harness(false, true);
        let driver = drive(
            tx,
            vec![
                (0, Event::Host(HostEvent::VisibilityEnter)),
                (1_000, key('r')),
                (1_000, key('q')),
            ],
        );
        runtime.run().await.unwrap();
        driver.await.unwrap();
        assert_eq!(runtime.completions, 2);
        assert_eq!(runtime.surface.snapshot().state, PlaybackState::Complete);
    }

    #[tokio::test(start_paused = true)]
    async fn static_mode_ignores_playback_keys() {
        let Harness { mut runtime, tx, .. } = harness(false, false);
        let driver = drive(
            tx,
            vec![
                (0, Event::Host(HostEvent::VisibilityEnter)),
                (0, key('s')),
                (0, key('r')),
                (0, Event::Tick),
                (10, key('q')),
            ],
        );
        let reason = runtime.run().await.unwrap();
        driver.await.unwrap();
        assert_eq!(reason, ShutdownReason::CommandQuit);
        assert_eq!(runtime.surface.mode(), SurfaceMode::Static);
        let out = output(&runtime);
        assert!(out.contains("print(1)"));
        assert!(out.contains("static"));
        assert_eq!(runtime.completions, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn ctrl_c_and_shutdown_break_the_loop() {
        let Harness { mut runtime, tx, .. } = harness(false, true);
        let driver = drive(tx, vec![(0, Event::Input(InputEvent::CtrlC))]);
        assert_eq!(runtime.run().await.unwrap(), ShutdownReason::CtrlC);
        driver.await.unwrap();

        let Harness { mut runtime, tx, .. } = harness(false, true);
        let driver = drive(tx, vec![(0, Event::Shutdown)]);
        assert_eq!(runtime.run().await.unwrap(), ShutdownReason::ShutdownEvent);
        driver.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn resize_repaints_full_frame() {
        let Harness { mut runtime, tx, .. } = harness(false, true);
        let driver = drive(
            tx,
            vec![(0, Event::Input(InputEvent::Resize(40, 12))), (10, key('q'))],
        );
        runtime.run().await.unwrap();
        driver.await.unwrap();
        let clears = output(&runtime).matches("\x1b[2J").count();
        assert_eq!(clears, 2, "initial frame plus resize");
        assert_eq!(runtime.surface.viewport().height, 8);
    }
}
