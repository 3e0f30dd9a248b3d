//! Terminal capability probing.
//!
//! Detection runs once at startup from the environment only; no probe
//! sequences are written. Themes are 24-bit, so the interesting question is
//! whether the terminal can show them as-is or needs the 256-color palette.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorDepth {
    TrueColor,
    Ansi256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct TerminalCapabilities {
    pub color_depth: ColorDepth,
    /// Focus in/out reports are requested on enter.
    pub focus_events: bool,
}

impl TerminalCapabilities {
    pub fn detect() -> Self {
        let term = std::env::var("TERM").ok();
        let colorterm = std::env::var("COLORTERM").ok();
        Self::from_env(term.as_deref(), colorterm.as_deref())
    }

    /// Pure detection from `TERM` / `COLORTERM` values.
    pub fn from_env(term: Option<&str>, colorterm: Option<&str>) -> Self {
        let term = term.unwrap_or_default().to_ascii_lowercase();
        let colorterm = colorterm.unwrap_or_default().to_ascii_lowercase();
        let colorterm_true = colorterm == "truecolor" || colorterm == "24bit";

        let color_depth = if term.starts_with("screen") {
            // GNU screen drops 24-bit sequences even when the outer terminal has them.
            ColorDepth::Ansi256
        } else if colorterm_true
            || term.contains("truecolor")
            || term.contains("24bit")
            || term.contains("direct")
        {
            ColorDepth::TrueColor
        } else {
            ColorDepth::Ansi256
        };

        Self {
            color_depth,
            focus_events: term != "dumb" && term != "linux",
        }
    }

    pub fn truecolor(&self) -> bool {
        self.color_depth == ColorDepth::TrueColor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colorterm_enables_truecolor() {
        let caps = TerminalCapabilities::from_env(Some("xterm-256color"), Some("truecolor"));
        assert!(caps.truecolor());
        assert!(caps.focus_events);
    }

    #[test]
    fn screen_caps_at_256() {
        let caps = TerminalCapabilities::from_env(Some("screen-256color"), Some("truecolor"));
        assert_eq!(caps.color_depth, ColorDepth::Ansi256);
    }

    #[test]
    fn unknown_defaults_to_256() {
        let caps = TerminalCapabilities::from_env(None, None);
        assert_eq!(caps.color_depth, ColorDepth::Ansi256);
        assert!(caps.focus_events);
    }

    #[test]
    fn linux_console_has_no_focus_reports() {
        let caps = TerminalCapabilities::from_env(Some("linux"), None);
        assert!(!caps.focus_events);
    }
}
