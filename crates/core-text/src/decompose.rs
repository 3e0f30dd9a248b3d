//! Styled runs -> typing units.

use crate::{Color, DecomposeError, StyledRun, TypingUnit, egc_width};
use unicode_segmentation::UnicodeSegmentation;

/// Running layout position while walking runs.
#[derive(Debug, Default)]
struct LayoutCursor {
    line: usize,
    column: u16,
}

struct UnitBuilder {
    units: Vec<TypingUnit>,
    layout: LayoutCursor,
}

impl UnitBuilder {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            units: Vec::with_capacity(capacity),
            layout: LayoutCursor::default(),
        }
    }

    fn push_glyph(&mut self, grapheme: &str, color: Option<Color>) {
        let width = egc_width(grapheme);
        self.units.push(TypingUnit {
            index: self.units.len(),
            text: grapheme.to_string(),
            color,
            is_line_break: false,
            line: self.layout.line,
            column: self.layout.column,
            width,
        });
        self.layout.column = self.layout.column.saturating_add(width);
    }

    fn push_line_break(&mut self, text: &str, color: Option<Color>) {
        self.units.push(TypingUnit {
            index: self.units.len(),
            text: text.to_string(),
            color,
            is_line_break: true,
            line: self.layout.line,
            column: self.layout.column,
            width: 0,
        });
        self.layout.line += 1;
        self.layout.column = 0;
    }
}

fn is_line_break(grapheme: &str) -> bool {
    grapheme == "\n" || grapheme == "\r\n"
}

/// Flatten styled runs into an ordered typing-unit sequence.
///
/// Fails with [`DecomposeError::EmptyRun`] when any run has empty text; the
/// caller is expected to fall back to static rendering in that case.
pub fn decompose(runs: &[StyledRun]) -> Result<Vec<TypingUnit>, DecomposeError> {
    if let Some(index) = runs.iter().position(|run| run.text.is_empty()) {
        tracing::debug!(target: "decompose", index, "empty_run_rejected");
        return Err(DecomposeError::EmptyRun { index });
    }

    let capacity = runs
        .iter()
        .map(|run| run.text.len() + run.line_breaks_after)
        .sum();
    let mut builder = UnitBuilder::with_capacity(capacity);
    for run in runs {
        for grapheme in run.text.graphemes(true) {
            if is_line_break(grapheme) {
                builder.push_line_break(grapheme, run.color);
            } else {
                builder.push_glyph(grapheme, run.color);
            }
        }
        for _ in 0..run.line_breaks_after {
            builder.push_line_break("\n", run.color);
        }
    }

    tracing::trace!(
        target: "decompose",
        runs = runs.len(),
        units = builder.units.len(),
        lines = builder.layout.line + 1,
        "decompose_complete"
    );
    Ok(builder.units)
}

/// Concatenate every unit, line breaks included.
pub fn source_text(units: &[TypingUnit]) -> String {
    units.iter().map(|unit| unit.text.as_str()).collect()
}

/// Concatenate the visible units only (line-break units skipped).
pub fn plain_text(units: &[TypingUnit]) -> String {
    units
        .iter()
        .filter(|unit| !unit.is_line_break)
        .map(|unit| unit.text.as_str())
        .collect()
}

/// Source text described by a run list: run texts in order, each followed by
/// `line_breaks_after` newlines.
pub fn runs_source_text(runs: &[StyledRun]) -> String {
    let mut out = String::new();
    for run in runs {
        out.push_str(&run.text);
        for _ in 0..run.line_breaks_after {
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn red() -> Option<Color> {
        Color::parse("red")
    }

    #[test]
    fn two_char_run_yields_two_colored_units() {
        let units = decompose(&[StyledRun::new("ab", red())]).unwrap();
        let view: Vec<(usize, &str, Option<Color>)> = units
            .iter()
            .map(|u| (u.index, u.text.as_str(), u.color))
            .collect();
        assert_eq!(view, vec![(0, "a", red()), (1, "b", red())]);
        assert!(units.iter().all(|u| !u.is_line_break));
    }

    #[test]
    fn empty_input_yields_no_units() {
        assert_eq!(decompose(&[]).unwrap(), Vec::new());
    }

    #[test]
    fn empty_run_is_rejected_with_its_index() {
        let runs = vec![StyledRun::plain("ok"), StyledRun::plain("")];
        assert_eq!(decompose(&runs), Err(DecomposeError::EmptyRun { index: 1 }));
    }

    #[test]
    fn line_breaks_after_become_break_units() {
        let runs = vec![
            StyledRun::new("def", red()).with_line_breaks(2),
            StyledRun::plain("x"),
        ];
        let units = decompose(&runs).unwrap();
        assert_eq!(units.len(), 6);
        assert!(units[3].is_line_break && units[4].is_line_break);
        assert_eq!(units[3].display(), "");
        assert_eq!((units[5].line, units[5].column), (2, 0));
        assert_eq!(source_text(&units), "def\n\nx");
        assert_eq!(plain_text(&units), "defx");
    }

    #[test]
    fn embedded_newlines_split_layout_lines() {
        let units = decompose(&[StyledRun::plain("a\nbc\r\nd")]).unwrap();
        let breaks: Vec<&str> = units
            .iter()
            .filter(|u| u.is_line_break)
            .map(|u| u.text.as_str())
            .collect();
        assert_eq!(breaks, vec!["\n", "\r\n"]);
        let last = units.last().unwrap();
        assert_eq!((last.line, last.column), (2, 0));
        assert_eq!(source_text(&units), "a\nbc\r\nd");
    }

    #[test]
    fn whitespace_is_preserved_per_unit() {
        let units = decompose(&[StyledRun::plain("a  \tb")]).unwrap();
        assert_eq!(units.len(), 5);
        assert_eq!(units[1].text, " ");
        assert_eq!(units[3].text, "\t");
        assert_eq!(units[4].column, 4);
    }

    #[test]
    fn wide_graphemes_advance_columns_by_width() {
        let units = decompose(&[StyledRun::plain("漢x")]).unwrap();
        assert_eq!(units[0].width, 2);
        assert_eq!(units[1].column, 2);
        assert_eq!(units[1].position_after(), (0, 3));
    }

    #[test]
    fn colors_follow_owning_run() {
        let blue = Color::parse("blue");
        let runs = vec![StyledRun::new("a", red()), StyledRun::new("b", blue)];
        let units = decompose(&runs).unwrap();
        assert_eq!(units[0].color, red());
        assert_eq!(units[1].color, blue);
    }
}
