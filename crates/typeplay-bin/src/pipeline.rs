//! Source text -> typing units, with the static fallbacks.

use core_highlight::{Highlighter, Language, highlight_or_plain, plain_runs};
use core_text::{StyledRun, TypingUnit, decompose, runs_from_ansi, strip_ansi};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Built-in sample played when no path is given.
pub(crate) const SAMPLE_SOURCE: &str = r#"def fibonacci(n: int) -> int:
    """Return the n-th Fibonacci number."""
    a, b = 0, 1
    for _ in range(n):
        a, b = b, a + b
    return a


if __name__ == "__main__":
    print([fibonacci(i) for i in range(10)])
"#;

#[derive(Debug, Clone)]
pub(crate) struct Source {
    pub text: Arc<str>,
    pub language: Language,
    /// Text is pre-highlighted SGR markup rather than plain source.
    pub ansi: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FallbackReason {
    HighlightUnavailable,
    MalformedRuns,
    MalformedMarkup,
}

impl FallbackReason {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            FallbackReason::HighlightUnavailable => "highlight_unavailable",
            FallbackReason::MalformedRuns => "malformed_runs",
            FallbackReason::MalformedMarkup => "malformed_markup",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Prepared {
    Animated(Arc<[TypingUnit]>),
    /// Shown all at once, uncolored.
    Static {
        units: Arc<[TypingUnit]>,
        reason: FallbackReason,
    },
}

impl Prepared {
    pub(crate) fn units(&self) -> &Arc<[TypingUnit]> {
        match self {
            Prepared::Animated(units) | Prepared::Static { units, .. } => units,
        }
    }

    pub(crate) fn is_static(&self) -> bool {
        matches!(self, Prepared::Static { .. })
    }
}

/// Drop runs that have no text, keeping their structural line breaks.
fn salvage_runs(runs: &[StyledRun]) -> Vec<StyledRun> {
    runs.iter()
        .filter_map(|run| match (run.text.is_empty(), run.line_breaks_after) {
            (false, _) => Some(run.clone()),
            (true, 0) => None,
            (true, breaks) => Some(StyledRun::new("\n".repeat(breaks), run.color)),
        })
        .collect()
}

/// Colored static units from runs the decomposer rejected.
fn static_styled_units(runs: &[StyledRun], text: &str) -> Prepared {
    match decompose(&salvage_runs(runs)) {
        Ok(units) if !units.is_empty() || text.is_empty() => Prepared::Static {
            units: units.into(),
            reason: FallbackReason::MalformedRuns,
        },
        Ok(_) => static_units(text, FallbackReason::MalformedRuns),
        Err(err) => {
            warn!(target: "decompose", error = %err, "salvage_decompose_failed");
            static_units(text, FallbackReason::MalformedRuns)
        }
    }
}

fn static_units(text: &str, reason: FallbackReason) -> Prepared {
    let units = match decompose(&plain_runs(text)) {
        Ok(units) => units,
        Err(err) => {
            warn!(target: "decompose", error = %err, "plain_decompose_failed");
            Vec::new()
        }
    };
    Prepared::Static {
        units: units.into(),
        reason,
    }
}

pub(crate) async fn prepare(
    source: &Source,
    highlighter: Arc<dyn Highlighter>,
    timeout: Duration,
) -> Prepared {
    if source.ansi {
        return match runs_from_ansi(&source.text).and_then(|runs| decompose(&runs)) {
            Ok(units) => Prepared::Animated(units.into()),
            Err(err) => {
                warn!(
                    target: "decompose",
                    markup_bytes = source.text.len(),
                    error = %err,
                    "markup_fallback_static"
                );
                static_units(&strip_ansi(&source.text), FallbackReason::MalformedMarkup)
            }
        };
    }

    let outcome = highlight_or_plain(highlighter, Arc::clone(&source.text), source.language, timeout).await;
    if !outcome.styled {
        return static_units(&source.text, FallbackReason::HighlightUnavailable);
    }
    match decompose(&outcome.runs) {
        Ok(units) => Prepared::Animated(units.into()),
        Err(err) => {
            warn!(
                target: "decompose",
                runs = outcome.runs.len(),
                error = %err,
                "runs_fallback_static"
            );
            static_styled_units(&outcome.runs, &source.text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_highlight::{HighlightError, PlainHighlighter};
    use core_text::{Color, source_text};

    struct Failing;

    impl Highlighter for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn highlight(&self, _: &str, _: Language) -> Result<Vec<StyledRun>, HighlightError> {
            Err(HighlightError::Unavailable("engine missing".into()))
        }
    }

    struct EmptyRuns;

    impl Highlighter for EmptyRuns {
        fn name(&self) -> &'static str {
            "empty_runs"
        }
        fn highlight(&self, _: &str, _: Language) -> Result<Vec<StyledRun>, HighlightError> {
            Ok(vec![StyledRun::new("", Some(Color::rgb(1, 2, 3)))])
        }
    }

    const RED: Color = Color::rgb(255, 0, 0);
    const BLUE: Color = Color::rgb(0, 0, 255);

    /// Colored runs with empty runs mixed in.
    struct GappyRuns;

    impl Highlighter for GappyRuns {
        fn name(&self) -> &'static str {
            "gappy_runs"
        }
        fn highlight(&self, _: &str, _: Language) -> Result<Vec<StyledRun>, HighlightError> {
            Ok(vec![
                StyledRun::new("def", Some(RED)),
                StyledRun::new("", None),
                StyledRun::new(" f", Some(BLUE)),
                StyledRun::new("", Some(BLUE)).with_line_breaks(1),
                StyledRun::new("x", None),
            ])
        }
    }

    fn source(text: &str, ansi: bool) -> Source {
        Source {
            text: Arc::from(text),
            language: Language::Python,
            ansi,
        }
    }

    #[tokio::test]
    async fn styled_runs_animate() {
        let prepared = prepare(&source(SAMPLE_SOURCE, false), Arc::new(PlainHighlighter), Duration::from_secs(1)).await;
        assert!(!prepared.is_static());
        assert_eq!(source_text(prepared.units()), SAMPLE_SOURCE);
    }

    #[tokio::test]
    async fn highlighter_failure_goes_static() {
        let prepared = prepare(&source("x = 1\n", false), Arc::new(Failing), Duration::from_secs(1)).await;
        match prepared {
            Prepared::Static { units, reason } => {
                assert_eq!(reason, FallbackReason::HighlightUnavailable);
                assert_eq!(source_text(&units), "x = 1\n");
            }
            other => panic!("expected static fallback, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_run_goes_static() {
        let prepared = prepare(&source("y\n", false), Arc::new(EmptyRuns), Duration::from_secs(1)).await;
        let Prepared::Static { units, reason } = prepared else {
            panic!("empty run should fall back to static");
        };
        assert_eq!(reason, FallbackReason::MalformedRuns);
        assert_eq!(source_text(&units), "y\n");
    }

    #[tokio::test]
    async fn ansi_markup_animates_with_colors() {
        let prepared = prepare(
            &source("\x1b[31mdef\x1b[0m f", true),
            Arc::new(Failing),
            Duration::from_secs(1),
        )
        .await;
        let Prepared::Animated(units) = prepared else {
            panic!("markup should decompose");
        };
        assert_eq!(units.len(), 5);
        assert!(units[0].color.is_some());
        assert_eq!(units[4].color, None);
    }

    #[tokio::test]
    async fn malformed_markup_renders_stripped_text() {
        let prepared = prepare(&source("ok \x1b[31", true), Arc::new(PlainHighlighter), Duration::from_secs(1)).await;
        match prepared {
            Prepared::Static { units, reason } => {
                assert_eq!(reason, FallbackReason::MalformedMarkup);
                assert!(source_text(&units).starts_with("ok"));
            }
            other => panic!("expected static fallback, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejected_runs_keep_their_colors() {
        let prepared = prepare(&source("def f\nx", false), Arc::new(GappyRuns), Duration::from_secs(1)).await;
        let Prepared::Static { units, reason } = prepared else {
            panic!("empty runs should fall back to static");
        };
        assert_eq!(reason, FallbackReason::MalformedRuns);
        assert_eq!(source_text(&units), "def f\nx");
        let colors: Vec<_> = units.iter().map(|u| u.color).collect();
        assert_eq!(
            colors,
            vec![Some(RED), Some(RED), Some(RED), Some(BLUE), Some(BLUE), Some(BLUE), None]
        );
        assert!(units[5].is_line_break);
    }
}
