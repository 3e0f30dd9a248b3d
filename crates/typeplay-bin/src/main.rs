//! typeplay entrypoint.
use anyhow::{Context, Result};
use clap::Parser;
use core_config::{Config, Overrides, load_from};
use core_events::{EVENT_CHANNEL_CAP, Event, EventSourceRegistry, TickEventSource};
use core_gates::{MotionPreference, VisibilityGate, host_prefers_reduced_motion};
use core_highlight::{
    CachedHighlighter, DEFAULT_THEME, Highlighter, Language, PlainHighlighter, SyntectHighlighter,
};
use core_playback::{PlaybackOptions, PlaybackScheduler};
use core_render::{Surface, SurfaceOptions};
use core_terminal::{CrosstermBackend, TerminalBackend};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

mod pipeline;
mod runtime;
mod sources;

use pipeline::{Prepared, SAMPLE_SOURCE, Source};
use runtime::{PlayerRuntime, RuntimeParts};
use sources::{MotionSource, VisibilitySource};

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "typeplay", version, about = "Syntax-highlighted typing animation")]
struct Args {
    /// Source file to play. A built-in Python sample is used when omitted.
    pub path: Option<PathBuf>,
    /// Language token (py, js, rs, sh, json, txt). Guessed from the path otherwise.
    #[arg(long = "lang")]
    pub lang: Option<String>,
    /// Configuration file path (overrides discovery of `typeplay.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Delay between revealed units in milliseconds.
    #[arg(long = "interval-ms", allow_negative_numbers = true)]
    pub interval_ms: Option<i64>,
    /// Show the final text at once.
    #[arg(long = "reduced-motion")]
    pub reduced_motion: bool,
    /// Highlight theme name.
    #[arg(long = "theme")]
    pub theme: Option<String>,
    /// Input is already highlighted SGR markup.
    #[arg(long = "ansi")]
    pub ansi: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            interval_ms: self.interval_ms,
            reduced_motion: self.reduced_motion,
            theme: self.theme.clone(),
        }
    }
}

struct AppStartup {
    backend: CrosstermBackend,
    log_guard: Option<WorkerGuard>,
}

/// Everything resolved before the terminal is touched.
struct Bootstrap {
    config: Config,
    source: Source,
    prepared: Prepared,
    motion: MotionPreference,
    options: PlaybackOptions,
}

impl AppStartup {
    fn new() -> Self {
        Self {
            backend: CrosstermBackend::new(),
            log_guard: None,
        }
    }

    fn configure_logging(&mut self) -> Result<()> {
        let log_dir = Path::new(".");
        let log_path = log_dir.join("typeplay.log");
        if log_path.exists() {
            let _ = std::fs::remove_file(&log_path);
        }

        let file_appender = tracing_appender::rolling::never(log_dir, "typeplay.log");
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        match tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .try_init()
        {
            Ok(_) => {
                self.log_guard = Some(guard);
            }
            Err(_err) => {
                // Global subscriber already installed; dropping the guard shuts the writer down.
            }
        }
        Ok(())
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }

    async fn bootstrap(args: &Args) -> Result<Bootstrap> {
        let mut config = load_from(args.config.clone())?;
        config.apply_overrides(&args.overrides());

        let source = read_source(args)?;
        let highlighter = build_highlighter(&config);
        let timeout = Duration::from_millis(config.file.highlight.timeout_ms);
        let prepared = pipeline::prepare(&source, highlighter, timeout).await;

        let reduced = config.file.motion.reduced.resolve(host_prefers_reduced_motion);
        let motion = MotionPreference::new(reduced);
        let options = PlaybackOptions {
            per_unit_interval_ms: config.file.playback.interval_ms,
            reduced_motion: false,
        };
        info!(
            target: "runtime.startup",
            language = source.language.label(),
            source_bytes = source.text.len(),
            units = prepared.units().len(),
            static_fallback = prepared.is_static(),
            reduced_motion = reduced,
            interval_ms = options.per_unit_interval_ms,
            config_override = args.config.is_some(),
            "bootstrap_complete"
        );
        Ok(Bootstrap {
            config,
            source,
            prepared,
            motion,
            options,
        })
    }
}

fn read_source(args: &Args) -> Result<Source> {
    let (text, guessed) = match &args.path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading source file {}", path.display()))?;
            tracing::debug!(target: "io", file = %path.display(), size_bytes = text.len(), "file_read_ok");
            (text, Language::from_path(path))
        }
        None => (SAMPLE_SOURCE.to_string(), Language::Python),
    };
    let language = match args.lang.as_deref() {
        Some(token) => Language::from_token(token).unwrap_or_else(|| {
            warn!(target: "runtime.startup", token, "unknown_language_token");
            guessed
        }),
        None => guessed,
    };
    Ok(Source {
        text: Arc::from(text),
        language,
        ansi: args.ansi,
    })
}

fn build_highlighter(config: &Config) -> Arc<dyn Highlighter> {
    let hl = &config.file.highlight;
    let syntect = SyntectHighlighter::new(&hl.theme).or_else(|err| {
        warn!(target: "highlight", theme = %hl.theme, error = %err, "theme_fallback_default");
        SyntectHighlighter::new(DEFAULT_THEME)
    });
    match syntect {
        Ok(inner) => Arc::new(CachedHighlighter::with_capacity(inner, hl.cache_entries)),
        Err(err) => {
            warn!(target: "highlight", error = %err, "highlighter_unavailable_plain");
            Arc::new(PlainHighlighter)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut startup = AppStartup::new();
    startup.configure_logging()?;
    AppStartup::install_panic_hook();
    info!(target: "runtime", "startup");

    let args = Args::parse();
    let Bootstrap {
        config,
        source,
        prepared,
        motion,
        options,
    } = AppStartup::bootstrap(&args).await?;

    let (playback_tx, playback_rx) = mpsc::unbounded_channel();
    let units = Arc::clone(prepared.units());
    let scheduler = match &prepared {
        Prepared::Animated(_) => Some(
            PlaybackScheduler::new(
                Arc::clone(&units),
                options,
                motion.clone(),
                Some(playback_tx.clone()),
            )
            .context("invalid playback configuration")?,
        ),
        Prepared::Static { reason, .. } => {
            warn!(target: "runtime.startup", reason = reason.as_str(), "static_presentation");
            None
        }
    };

    let surface_cfg = &config.file.surface;
    startup.backend.set_title(&surface_cfg.title)?;
    let color_depth = startup.backend.capabilities().color_depth;
    let mut guard = startup.backend.enter_guard()?;
    let size = guard.backend().size()?;

    let surface_options = SurfaceOptions {
        title: surface_cfg.title.clone(),
        label: source.language.label().to_string(),
        indicator: surface_cfg.indicator,
        color_depth,
    };
    let surface = if prepared.is_static() {
        Surface::new_static(Arc::clone(&units), surface_options, size)
    } else {
        Surface::new(Arc::clone(&units), surface_options, size)
    };

    let vis = &config.file.visibility;
    let (ratio_tx, ratio_rx) = watch::channel(vis.initial_ratio);

    let (tx, rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
    let (input_task, input_shutdown) = core_input::spawn_async_input(tx.clone());
    let mut registry = EventSourceRegistry::new();
    registry.register(TickEventSource::new(Duration::from_millis(surface_cfg.blink_ms.max(1))));
    registry.register(VisibilitySource::new(VisibilityGate::new(vis.threshold), ratio_rx));
    registry.register(MotionSource::new(motion.subscribe()));
    let source_handles = registry.spawn_all(&tx);

    let parts = RuntimeParts {
        units,
        options,
        motion,
        scheduler,
        playback_tx,
        playback_rx,
        ratios: ratio_tx,
        surface,
        out: std::io::stdout(),
    };
    let mut runtime = PlayerRuntime::new(parts, tx, rx, source_handles);
    runtime.attach_input(input_task, input_shutdown);
    let reason = runtime.run().await?;
    drop(guard);
    info!(target: "runtime", %reason, "exit");
    Ok(())
}
