//! Terminal backend abstraction and crossterm implementation.
//!
//! Entering the backend switches to raw mode on the alternate screen, hides
//! the hardware cursor (the player draws its own indicator) and enables
//! focus-change reporting, which the host uses as its visibility signal.

use anyhow::{Context, Result};
use crossterm::{
    cursor::Hide,
    cursor::Show,
    event::{DisableFocusChange, EnableFocusChange},
    execute,
    terminal::{
        EnterAlternateScreen, LeaveAlternateScreen, SetTitle, disable_raw_mode, enable_raw_mode,
    },
};
use std::io::stdout;

pub mod capabilities;
pub use capabilities::{ColorDepth, TerminalCapabilities};

pub trait TerminalBackend {
    fn enter(&mut self) -> Result<()>;
    fn leave(&mut self) -> Result<()>;
    fn set_title(&mut self, title: &str) -> Result<()>;
    /// Current size as `(columns, rows)`.
    fn size(&self) -> Result<(u16, u16)>;
}

pub struct CrosstermBackend {
    entered: bool,
    capabilities: TerminalCapabilities,
}

/// RAII guard ensuring terminal state restoration even if caller early-returns or panics.
pub struct TerminalGuard<'a> {
    backend: &'a mut CrosstermBackend,
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosstermBackend {
    pub fn new() -> Self {
        Self {
            entered: false,
            capabilities: TerminalCapabilities::detect(),
        }
    }

    pub fn capabilities(&self) -> TerminalCapabilities {
        self.capabilities
    }

    /// Enter and return a guard that will leave on drop.
    pub fn enter_guard(&mut self) -> Result<TerminalGuard<'_>> {
        self.enter()?;
        Ok(TerminalGuard { backend: self })
    }
}

impl TerminalBackend for CrosstermBackend {
    fn enter(&mut self) -> Result<()> {
        if !self.entered {
            enable_raw_mode().context("enable raw mode")?;
            execute!(stdout(), EnterAlternateScreen, Hide).context("enter alternate screen")?;
            if self.capabilities.focus_events {
                execute!(stdout(), EnableFocusChange).context("enable focus reporting")?;
            }
            self.entered = true;
            tracing::debug!(target: "terminal", caps = ?self.capabilities, "terminal_entered");
        }
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        if self.entered {
            if self.capabilities.focus_events {
                execute!(stdout(), DisableFocusChange)?;
            }
            execute!(stdout(), LeaveAlternateScreen, Show)?;
            disable_raw_mode()?;
            self.entered = false;
            tracing::debug!(target: "terminal", "terminal_left");
        }
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<()> {
        execute!(stdout(), SetTitle(title))?;
        Ok(())
    }

    fn size(&self) -> Result<(u16, u16)> {
        crossterm::terminal::size().context("query terminal size")
    }
}

impl Drop for CrosstermBackend {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

impl TerminalGuard<'_> {
    pub fn backend(&mut self) -> &mut CrosstermBackend {
        self.backend
    }
}

impl Drop for TerminalGuard<'_> {
    fn drop(&mut self) {
        let _ = self.backend.leave();
    }
}
