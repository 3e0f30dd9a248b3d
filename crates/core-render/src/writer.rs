//! Terminal writer abstraction.
//!
//! Painting code queues primitive commands; nothing reaches the terminal
//! until [`Writer::flush`]. Consecutive prints sharing one foreground color
//! are batched into a single `Print`, and redundant color changes are
//! dropped, so a reveal frame is usually one `MoveTo` + one `SetColor` + one
//! `Print` per line touched.
//!
//! Invariants:
//! * Commands preserve ordering; no flushing mid-frame.
//! * All positions are absolute (0,0) origin; caller ensures bounds.
//! * Writer owns no global state; it is a short-lived object per frame.

use anyhow::Result;
use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Color as TermColor, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use std::io::{Write, stdout};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    MoveTo(u16, u16),
    ClearLine,
    ClearAll,
    /// `None` restores the terminal default foreground.
    SetColor(Option<TermColor>),
    Print(String),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriterStats {
    /// `Print` commands after batching.
    pub print_commands: u64,
    /// Logical cells handed to `print`.
    pub cells_printed: u64,
}

#[derive(Default)]
pub struct Writer {
    cmds: Vec<Command>,
    pending: String,
    /// Color the terminal will have once queued commands run. Unknown at
    /// frame start, so the first `set_color` is always emitted.
    color: Option<Option<TermColor>>,
    stats: WriterStats,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    fn flush_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let s = std::mem::take(&mut self.pending);
        self.cmds.push(Command::Print(s));
        self.stats.print_commands += 1;
    }

    pub fn move_to(&mut self, x: u16, y: u16) {
        self.flush_pending();
        self.cmds.push(Command::MoveTo(x, y));
    }

    /// Clear the line the cursor is on; caller issues a `move_to` first.
    pub fn clear_line(&mut self) {
        self.flush_pending();
        self.cmds.push(Command::ClearLine);
    }

    pub fn clear_all(&mut self) {
        self.flush_pending();
        self.cmds.push(Command::ClearAll);
    }

    pub fn set_color(&mut self, color: Option<TermColor>) {
        if self.color == Some(color) {
            return;
        }
        self.flush_pending();
        self.cmds.push(Command::SetColor(color));
        self.color = Some(color);
    }

    pub fn print<S: AsRef<str>>(&mut self, s: S) {
        let s = s.as_ref();
        if s.is_empty() {
            return;
        }
        self.pending.push_str(s);
        self.stats.cells_printed += 1;
    }

    pub fn stats(&self) -> WriterStats {
        let mut stats = self.stats;
        if !self.pending.is_empty() {
            stats.print_commands += 1;
        }
        stats
    }

    /// Finalized command list (test and diagnostics view).
    pub fn into_commands(mut self) -> Vec<Command> {
        self.flush_pending();
        self.cmds
    }

    pub fn flush_to<W: Write>(self, out: &mut W) -> Result<WriterStats> {
        let stats = self.stats();
        for c in self.into_commands() {
            match c {
                Command::MoveTo(x, y) => queue!(out, MoveTo(x, y))?,
                Command::ClearLine => queue!(out, Clear(ClearType::CurrentLine))?,
                Command::ClearAll => queue!(out, Clear(ClearType::All))?,
                Command::SetColor(Some(color)) => queue!(out, SetForegroundColor(color))?,
                Command::SetColor(None) => queue!(out, ResetColor)?,
                Command::Print(s) => queue!(out, Print(s))?,
            }
        }
        out.flush()?;
        Ok(stats)
    }

    pub fn flush(self) -> Result<WriterStats> {
        self.flush_to(&mut stdout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batches_same_color_prints() {
        let mut w = Writer::new();
        w.move_to(0, 0);
        w.set_color(Some(TermColor::Red));
        w.print("a");
        w.print("b");
        w.set_color(Some(TermColor::Red));
        w.print("c");
        w.set_color(None);
        w.print("x");
        let stats = w.stats();
        assert_eq!(stats.print_commands, 2);
        assert_eq!(stats.cells_printed, 4);
        assert_eq!(
            w.into_commands(),
            vec![
                Command::MoveTo(0, 0),
                Command::SetColor(Some(TermColor::Red)),
                Command::Print("abc".into()),
                Command::SetColor(None),
                Command::Print("x".into()),
            ]
        );
    }

    #[test]
    fn flush_to_emits_escape_sequences() {
        let mut w = Writer::new();
        w.move_to(2, 1);
        w.set_color(Some(TermColor::Rgb { r: 1, g: 2, b: 3 }));
        w.print("hi");
        let mut out = Vec::new();
        let stats = w.flush_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\x1b[2;3H"));
        assert!(text.contains("38;2;1;2;3"));
        assert!(text.ends_with("hi"));
        assert_eq!(stats.print_commands, 1);
    }
}
