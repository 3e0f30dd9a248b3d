//! Async highlighting with timeout, and the plain-text recovery path.

use crate::{HighlightError, Highlighter, Language, plain_runs};
use core_text::StyledRun;
use std::sync::Arc;
use std::time::Duration;

/// Highlight on the blocking pool, bounded by `timeout`.
///
/// A panic inside the highlighter or an elapsed timeout both surface as
/// errors; the blocking task itself is left to finish in the background.
pub async fn highlight_async(
    highlighter: Arc<dyn Highlighter>,
    source: Arc<str>,
    language: Language,
    timeout: Duration,
) -> Result<Vec<StyledRun>, HighlightError> {
    let name = highlighter.name();
    let task = tokio::task::spawn_blocking(move || highlighter.highlight(&source, language));
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => {
            tracing::error!(target: "highlight", backend = name, ?join_err, "highlight_task_failed");
            Err(HighlightError::Unavailable(format!("highlighter task failed: {join_err}")))
        }
        Err(_) => Err(HighlightError::TimedOut(timeout)),
    }
}

/// Runs ready for decomposition plus whether they carry highlighter colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightOutcome {
    pub runs: Vec<StyledRun>,
    pub styled: bool,
}

/// Like [`highlight_async`] but never fails: on any [`HighlightError`] the
/// source comes back as uncolored runs with `styled == false`, and the caller
/// is expected to present it without animation.
pub async fn highlight_or_plain(
    highlighter: Arc<dyn Highlighter>,
    source: Arc<str>,
    language: Language,
    timeout: Duration,
) -> HighlightOutcome {
    match highlight_async(highlighter, Arc::clone(&source), language, timeout).await {
        Ok(runs) => HighlightOutcome { runs, styled: true },
        Err(err) => {
            tracing::warn!(
                target: "highlight",
                language = language.label(),
                source_bytes = source.len(),
                error = %err,
                "highlight_unavailable_fallback_plain"
            );
            HighlightOutcome {
                runs: plain_runs(&source),
                styled: false,
            }
        }
    }
}
