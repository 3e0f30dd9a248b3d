//! Styled runs, typing units and the run decomposer.
//!
//! A highlighter emits an ordered list of [`StyledRun`]s (contiguous text
//! sharing one display color). The decomposer flattens that list into
//! [`TypingUnit`]s: one unit per grapheme cluster, plus one unit per line
//! break, each carrying the color of the run it came from and its position in
//! a line-oriented layout.
//!
//! Contract:
//! - `units[i].index == i` for every unit; no gaps, no reordering.
//! - Lossless: [`source_text`] over the units reproduces the run texts (with
//!   `line_breaks_after` expanded to `\n`) byte for byte, and [`plain_text`]
//!   reproduces them with every line break removed.
//! - Whitespace is never collapsed; every space and tab is its own unit.
//! - Line-break units carry no visible character. They occupy one regular
//!   timing slot in playback (the scheduler does not special-case them).
//! - Pure: no I/O, no logging of source content.

use std::fmt;

pub mod ansi;
pub mod decompose;
pub mod width;

pub use ansi::{runs_from_ansi, strip_ansi};
pub use decompose::{decompose, plain_text, runs_source_text, source_text};
pub use width::egc_width;

/// Non-collapsing space used when displaying space and tab units.
pub const NBSP: &str = "\u{00A0}";

/// 24-bit display color attached to a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (leading `#` optional) or one of the basic color names.
    pub fn parse(input: &str) -> Option<Self> {
        let s = input.trim();
        if let Some(named) = Self::named(s) {
            return Some(named);
        }
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        Some(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    fn named(name: &str) -> Option<Self> {
        let color = match name.to_ascii_lowercase().as_str() {
            "black" => Self::rgb(0, 0, 0),
            "red" => Self::rgb(205, 49, 49),
            "green" => Self::rgb(13, 188, 121),
            "yellow" => Self::rgb(229, 229, 16),
            "blue" => Self::rgb(36, 114, 200),
            "magenta" => Self::rgb(188, 63, 188),
            "cyan" => Self::rgb(17, 168, 205),
            "white" => Self::rgb(229, 229, 229),
            "gray" | "grey" => Self::rgb(118, 118, 118),
            _ => return None,
        };
        Some(color)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Contiguous span of source text sharing one display color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledRun {
    /// Run text; must be non-empty. May itself contain `\n`.
    pub text: String,
    pub color: Option<Color>,
    /// Structural line breaks following the run text.
    pub line_breaks_after: usize,
}

impl StyledRun {
    pub fn new(text: impl Into<String>, color: Option<Color>) -> Self {
        Self {
            text: text.into(),
            color,
            line_breaks_after: 0,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, None)
    }

    pub fn with_line_breaks(mut self, count: usize) -> Self {
        self.line_breaks_after = count;
        self
    }
}

/// Atomic, individually revealable element of a typing animation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingUnit {
    pub index: usize,
    /// Original grapheme cluster (`"\n"` or `"\r\n"` for line breaks).
    pub text: String,
    pub color: Option<Color>,
    pub is_line_break: bool,
    /// Zero-based layout line.
    pub line: usize,
    /// Display column where this unit starts.
    pub column: u16,
    /// Display width in cells (0 for line breaks).
    pub width: u16,
}

impl TypingUnit {
    /// Text to put on screen: line breaks show nothing, space and tab become
    /// a single non-collapsing space.
    pub fn display(&self) -> &str {
        if self.is_line_break {
            return "";
        }
        match self.text.as_str() {
            " " | "\t" => NBSP,
            other => other,
        }
    }

    /// Layout position immediately after this unit as `(line, column)`.
    pub fn position_after(&self) -> (usize, u16) {
        if self.is_line_break {
            (self.line + 1, 0)
        } else {
            (self.line, self.column.saturating_add(self.width))
        }
    }
}

/// Malformed highlighter output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecomposeError {
    #[error("styled run {index} has empty text")]
    EmptyRun { index: usize },
    #[error("malformed markup at byte {offset}: {reason}")]
    Markup { offset: usize, reason: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_parse_hex_and_names() {
        assert_eq!(Color::parse("#ff0000"), Some(Color::rgb(255, 0, 0)));
        assert_eq!(Color::parse("00ff7f"), Some(Color::rgb(0, 255, 127)));
        assert_eq!(Color::parse("Red"), Color::parse("red"));
        assert!(Color::parse("#fff").is_none());
        assert!(Color::parse("#gg0000").is_none());
    }

    #[test]
    fn color_display_is_lower_hex() {
        assert_eq!(Color::rgb(171, 205, 239).to_string(), "#abcdef");
    }

    #[test]
    fn display_normalizes_whitespace() {
        let unit = |text: &str, is_line_break| TypingUnit {
            index: 0,
            text: text.to_string(),
            color: None,
            is_line_break,
            line: 0,
            column: 0,
            width: 1,
        };
        assert_eq!(unit(" ", false).display(), NBSP);
        assert_eq!(unit("\t", false).display(), NBSP);
        assert_eq!(unit("x", false).display(), "x");
        assert_eq!(unit("\n", true).display(), "");
    }
}
