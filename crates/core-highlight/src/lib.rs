//! Highlighter adapter boundary.
//!
//! The highlighting engine is an external collaborator: given source text and
//! a language it returns styled runs, or fails. This crate defines that
//! boundary ([`Highlighter`]), a syntect-backed implementation, a cache keyed
//! by `(source, language)`, and an async wrapper that runs highlighting off
//! the event loop with a timeout.
//!
//! Failure policy: every failure surfaces as a [`HighlightError`]. Callers
//! that only need *something* to show use [`highlight_or_plain`], which
//! recovers with uncolored runs and never propagates the error.

use core_text::StyledRun;
use std::time::Duration;

pub mod cache;
pub mod language;
pub mod service;
pub mod syntect_adapter;

pub use cache::{CacheMetricsSnapshot, CachedHighlighter};
pub use language::Language;
pub use service::{HighlightOutcome, highlight_async, highlight_or_plain};
pub use syntect_adapter::{DEFAULT_THEME, SyntectHighlighter};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HighlightError {
    #[error("highlighting unavailable: {0}")]
    Unavailable(String),
    #[error("highlighting timed out after {0:?}")]
    TimedOut(Duration),
    #[error("unknown highlight theme `{0}`")]
    UnknownTheme(String),
}

/// Source text + language -> styled runs.
pub trait Highlighter: Send + Sync {
    /// Stable identifier used in logs.
    fn name(&self) -> &'static str;

    fn highlight(&self, source: &str, language: Language) -> Result<Vec<StyledRun>, HighlightError>;
}

/// Highlighter that assigns no colors. Used when highlighting is disabled and
/// as the recovery path for [`HighlightError`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainHighlighter;

impl Highlighter for PlainHighlighter {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn highlight(&self, source: &str, _language: Language) -> Result<Vec<StyledRun>, HighlightError> {
        Ok(plain_runs(source))
    }
}

/// Split `source` into uncolored runs, one per line, with newlines carried as
/// `line_breaks_after`. Blank lines fold into the preceding run's count.
pub fn plain_runs(source: &str) -> Vec<StyledRun> {
    let mut runs: Vec<StyledRun> = Vec::new();
    for line in source.split_inclusive('\n') {
        push_piece(&mut runs, line, None);
    }
    runs
}

/// Append a highlighted piece (at most one trailing `\n`) to `runs`, merging
/// with the previous run when colors match and no break separates them.
pub(crate) fn push_piece(runs: &mut Vec<StyledRun>, piece: &str, color: Option<core_text::Color>) {
    if piece.is_empty() {
        return;
    }
    if let Some(body) = piece.strip_suffix('\n')
        && !body.ends_with('\r')
    {
        if !body.is_empty() {
            merge_or_push(runs, body, color);
        }
        match runs.last_mut() {
            Some(last) => last.line_breaks_after += 1,
            None => runs.push(StyledRun::new("\n", color)),
        }
        return;
    }
    merge_or_push(runs, piece, color);
}

fn merge_or_push(runs: &mut Vec<StyledRun>, text: &str, color: Option<core_text::Color>) {
    match runs.last_mut() {
        Some(last) if last.color == color && last.line_breaks_after == 0 => last.text.push_str(text),
        _ => runs.push(StyledRun::new(text, color)),
    }
}
