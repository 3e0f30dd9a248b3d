//! syntect-backed highlighter.
//!
//! Uses the bundled syntax definitions and themes; no files are read at
//! runtime. Only the foreground color of each highlighted range is kept,
//! font style and background are dropped.

use crate::{HighlightError, Highlighter, Language, push_piece};
use core_text::{Color, StyledRun};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

pub const DEFAULT_THEME: &str = "base16-ocean.dark";

pub struct SyntectHighlighter {
    syntaxes: SyntaxSet,
    theme: Theme,
    theme_name: String,
}

impl SyntectHighlighter {
    /// Load bundled syntaxes and the named bundled theme.
    pub fn new(theme_name: &str) -> Result<Self, HighlightError> {
        let mut themes = ThemeSet::load_defaults();
        let theme = themes
            .themes
            .remove(theme_name)
            .ok_or_else(|| HighlightError::UnknownTheme(theme_name.to_string()))?;
        tracing::debug!(target: "highlight", theme = theme_name, "syntect_loaded");
        Ok(Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            theme,
            theme_name: theme_name.to_string(),
        })
    }

    pub fn theme_name(&self) -> &str {
        &self.theme_name
    }

    /// Names of the bundled themes, sorted.
    pub fn available_themes() -> Vec<String> {
        let mut names: Vec<String> = ThemeSet::load_defaults().themes.into_keys().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for SyntectHighlighter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntectHighlighter")
            .field("theme", &self.theme_name)
            .finish_non_exhaustive()
    }
}

fn to_color(c: syntect::highlighting::Color) -> Color {
    Color::rgb(c.r, c.g, c.b)
}

impl Highlighter for SyntectHighlighter {
    fn name(&self) -> &'static str {
        "syntect"
    }

    fn highlight(&self, source: &str, language: Language) -> Result<Vec<StyledRun>, HighlightError> {
        let syntax = self
            .syntaxes
            .find_syntax_by_token(language.syntax_token())
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text());
        let mut lines = HighlightLines::new(syntax, &self.theme);
        let mut runs = Vec::new();
        for line in LinesWithEndings::from(source) {
            let ranges = lines
                .highlight_line(line, &self.syntaxes)
                .map_err(|e| HighlightError::Unavailable(e.to_string()))?;
            for (style, piece) in ranges {
                push_piece(&mut runs, piece, Some(to_color(style.foreground)));
            }
        }
        tracing::trace!(
            target: "highlight",
            language = language.label(),
            source_bytes = source.len(),
            runs = runs.len(),
            "syntect_highlight"
        );
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::runs_source_text;

    #[test]
    fn unknown_theme_is_reported() {
        let err = SyntectHighlighter::new("no-such-theme").unwrap_err();
        assert_eq!(err, HighlightError::UnknownTheme("no-such-theme".into()));
    }

    #[test]
    fn default_theme_is_bundled() {
        assert!(SyntectHighlighter::available_themes().contains(&DEFAULT_THEME.to_string()));
    }

    #[test]
    fn python_source_is_colored_and_lossless() {
        let hl = SyntectHighlighter::new(DEFAULT_THEME).unwrap();
        let source = "def track(user):\n    return \"ok\"\n";
        let runs = hl.highlight(source, Language::Python).unwrap();
        assert_eq!(runs_source_text(&runs), source);
        assert!(runs.iter().all(|r| r.color.is_some() && !r.text.is_empty()));
        let distinct: std::collections::HashSet<_> = runs.iter().map(|r| r.color).collect();
        assert!(distinct.len() > 1, "keyword and string should differ in color");
    }

    #[test]
    fn empty_source_has_no_runs() {
        let hl = SyntectHighlighter::new(DEFAULT_THEME).unwrap();
        assert!(hl.highlight("", Language::Rust).unwrap().is_empty());
    }
}
