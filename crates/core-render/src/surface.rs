//! Presentation surface: terminal chrome around the typing area.
//!
//! Layout (rows):
//! ```text
//! 0          header   "typeplay · Python"
//! 1          rule
//! 2..2+h     code area, text starts at column 2
//! 2+h        rule
//! rows-1     footer   "playing · 12/40 · [s]kip [r]eplay [m]otion [q]uit"
//! ```
//! The surface is a read-only observer of playback: it receives snapshots,
//! derives the damage (`RenderDelta`) they imply and paints that damage into
//! a [`Writer`]. It never drives the scheduler.
//!
//! In static mode (highlighting or decomposition failed) every unit is shown
//! at once, the indicator is never drawn and snapshots are ignored.

use crate::scheduler::RenderDelta;
use crate::status::{StatusContext, compose_footer, compose_header, format_segments};
use crate::style::{CHROME_COLOR, INDICATOR_COLOR, INDICATOR_GLYPH, term_color, to_terminal_color};
use crate::viewport::Viewport;
use crate::writer::Writer;
use core_playback::{CursorPosition, PlaybackSnapshot};
use core_terminal::ColorDepth;
use core_text::TypingUnit;
use std::ops::Range;
use std::sync::Arc;

pub const HEADER_ROW: u16 = 0;
pub const CODE_ROW: u16 = 2;
pub const CODE_COL: u16 = 2;
/// Header, two rules and footer.
const CHROME_ROWS: u16 = 4;
const RULE: &str = "\u{2500}";

#[derive(Debug, Clone)]
pub struct SurfaceOptions {
    pub title: String,
    pub label: String,
    /// Draw the blinking indicator while playing.
    pub indicator: bool,
    pub color_depth: ColorDepth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceMode {
    Animated,
    Static,
}

pub struct Surface {
    units: Arc<[TypingUnit]>,
    options: SurfaceOptions,
    mode: SurfaceMode,
    cols: u16,
    rows: u16,
    viewport: Viewport,
    snapshot: PlaybackSnapshot,
    reduced_motion: bool,
    blink_on: bool,
    /// Screen cell currently holding the indicator glyph.
    indicator_cell: Option<(u16, u16)>,
}

fn code_height(rows: u16) -> usize {
    usize::from(rows.saturating_sub(CHROME_ROWS))
}

fn clip(s: &str, cols: u16) -> String {
    s.chars().take(usize::from(cols)).collect()
}

impl Surface {
    pub fn new(units: Arc<[TypingUnit]>, options: SurfaceOptions, size: (u16, u16)) -> Self {
        let (cols, rows) = size;
        let total = units.len();
        Self {
            units,
            options,
            mode: SurfaceMode::Animated,
            cols,
            rows,
            viewport: Viewport::new(0, code_height(rows)),
            snapshot: PlaybackSnapshot::initial(total),
            reduced_motion: false,
            blink_on: true,
            indicator_cell: None,
        }
    }

    /// Unanimated presentation used after a highlight or markup failure.
    pub fn new_static(units: Arc<[TypingUnit]>, options: SurfaceOptions, size: (u16, u16)) -> Self {
        let mut surface = Self::new(units, options, size);
        surface.mode = SurfaceMode::Static;
        surface
    }

    pub fn mode(&self) -> SurfaceMode {
        self.mode
    }

    pub fn snapshot(&self) -> &PlaybackSnapshot {
        &self.snapshot
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn units(&self) -> &Arc<[TypingUnit]> {
        &self.units
    }

    /// Screen cell of the indicator as currently painted.
    pub fn indicator_cell(&self) -> Option<(u16, u16)> {
        self.indicator_cell
    }

    pub fn resize(&mut self, cols: u16, rows: u16) -> RenderDelta {
        self.cols = cols;
        self.rows = rows;
        self.viewport.height = code_height(rows);
        self.follow_cursor();
        RenderDelta::Full
    }

    /// Start over with a fresh snapshot (replay).
    pub fn reset(&mut self, snapshot: PlaybackSnapshot) -> RenderDelta {
        self.snapshot = snapshot;
        self.viewport.first_line = 0;
        self.blink_on = true;
        RenderDelta::Full
    }

    /// Record a newer scheduler snapshot and report the damage it implies.
    pub fn apply_snapshot(&mut self, next: PlaybackSnapshot) -> Option<RenderDelta> {
        if self.mode == SurfaceMode::Static {
            return None;
        }
        let prev = std::mem::replace(&mut self.snapshot, next);
        if prev == next {
            return None;
        }
        if next.revealed < prev.revealed || self.follow_cursor() {
            return Some(RenderDelta::Full);
        }
        if next.revealed > prev.revealed {
            self.blink_on = true;
            return Some(RenderDelta::Reveal(prev.revealed..next.revealed));
        }
        Some(RenderDelta::StatusLine)
    }

    pub fn set_reduced_motion(&mut self, reduced: bool) -> Option<RenderDelta> {
        if self.reduced_motion == reduced {
            return None;
        }
        self.reduced_motion = reduced;
        Some(RenderDelta::StatusLine)
    }

    /// Flip the indicator blink phase; `None` when no indicator is shown.
    pub fn toggle_blink(&mut self) -> Option<RenderDelta> {
        if !self.indicator_active() {
            return None;
        }
        self.blink_on = !self.blink_on;
        Some(RenderDelta::Indicator)
    }

    pub fn render(&mut self, delta: &RenderDelta, w: &mut Writer) {
        match delta {
            RenderDelta::Full => self.paint_full(w),
            RenderDelta::Reveal(range) => {
                self.erase_indicator(w);
                self.paint_units(range.clone(), w);
                self.paint_footer(w);
                self.sync_indicator(w);
            }
            RenderDelta::StatusLine => {
                self.paint_footer(w);
                self.sync_indicator(w);
            }
            RenderDelta::Indicator => self.sync_indicator(w),
        }
    }

    fn indicator_active(&self) -> bool {
        self.mode == SurfaceMode::Animated
            && self.options.indicator
            && self.snapshot.shows_indicator()
    }

    fn revealed(&self) -> usize {
        match self.mode {
            SurfaceMode::Static => self.units.len(),
            SurfaceMode::Animated => self.snapshot.revealed.min(self.units.len()),
        }
    }

    fn cursor_line(&self) -> Option<usize> {
        match self.snapshot.cursor {
            CursorPosition::BeforeFirst => Some(0),
            CursorPosition::After { line, .. } => Some(line),
            CursorPosition::Hidden => None,
        }
    }

    fn follow_cursor(&mut self) -> bool {
        match self.cursor_line() {
            Some(line) if self.mode == SurfaceMode::Animated => self.viewport.follow(line),
            _ => false,
        }
    }

    fn cell_for(&self, line: usize, column: u16, width: u16) -> Option<(u16, u16)> {
        let row = u16::try_from(self.viewport.row_of(line)?).ok()?;
        let x = CODE_COL.checked_add(column)?;
        if x.saturating_add(width) > self.cols {
            return None;
        }
        Some((x, CODE_ROW + row))
    }

    fn indicator_target(&self) -> Option<(u16, u16)> {
        if !self.indicator_active() || !self.blink_on {
            return None;
        }
        match self.snapshot.cursor {
            CursorPosition::BeforeFirst => self.cell_for(0, 0, 1),
            CursorPosition::After { line, column, .. } => self.cell_for(line, column, 1),
            CursorPosition::Hidden => None,
        }
    }

    fn footer_row(&self) -> Option<u16> {
        (self.rows >= CHROME_ROWS).then(|| self.rows - 1)
    }

    fn paint_full(&mut self, w: &mut Writer) {
        w.clear_all();
        self.indicator_cell = None;
        let chrome = Some(to_terminal_color(CHROME_COLOR, self.options.color_depth));

        if self.rows > HEADER_ROW {
            let header = format_segments(&compose_header(&self.status_context()));
            w.move_to(0, HEADER_ROW);
            w.set_color(chrome);
            w.print(clip(&header, self.cols));
        }
        if let Some(footer_row) = self.footer_row() {
            let rule = RULE.repeat(usize::from(self.cols));
            w.move_to(0, CODE_ROW - 1);
            w.set_color(chrome);
            w.print(&rule);
            w.move_to(0, footer_row - 1);
            w.print(&rule);
        }
        self.paint_units(0..self.revealed(), w);
        self.paint_footer(w);
        self.sync_indicator(w);
    }

    fn paint_units(&self, range: Range<usize>, w: &mut Writer) {
        let end = range.end.min(self.revealed());
        let start = range.start.min(end);
        let mut next_cell = None;
        for unit in &self.units[start..end] {
            if unit.is_line_break {
                continue;
            }
            let Some((x, y)) = self.cell_for(unit.line, unit.column, unit.width) else {
                continue;
            };
            if next_cell != Some((x, y)) {
                w.move_to(x, y);
            }
            w.set_color(term_color(unit.color, self.options.color_depth));
            w.print(unit.display());
            next_cell = Some((x + unit.width, y));
        }
    }

    fn paint_footer(&self, w: &mut Writer) {
        let Some(row) = self.footer_row() else {
            return;
        };
        let footer = format_segments(&compose_footer(&self.status_context()));
        w.move_to(0, row);
        w.clear_line();
        w.set_color(Some(to_terminal_color(CHROME_COLOR, self.options.color_depth)));
        w.print(clip(&footer, self.cols));
    }

    fn erase_indicator(&mut self, w: &mut Writer) {
        if let Some((x, y)) = self.indicator_cell.take() {
            w.move_to(x, y);
            w.set_color(None);
            w.print(" ");
        }
    }

    fn sync_indicator(&mut self, w: &mut Writer) {
        let target = self.indicator_target();
        if target == self.indicator_cell {
            return;
        }
        self.erase_indicator(w);
        if let Some((x, y)) = target {
            w.move_to(x, y);
            w.set_color(Some(to_terminal_color(INDICATOR_COLOR, self.options.color_depth)));
            w.print(INDICATOR_GLYPH);
            self.indicator_cell = Some((x, y));
        }
    }

    fn status_context(&self) -> StatusContext<'_> {
        StatusContext {
            title: &self.options.title,
            label: &self.options.label,
            snapshot: &self.snapshot,
            reduced_motion: self.reduced_motion,
            static_fallback: self.mode == SurfaceMode::Static,
        }
    }
}
