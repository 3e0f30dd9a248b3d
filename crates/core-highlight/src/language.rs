//! Supported highlight languages.

use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    Python,
    JavaScript,
    Rust,
    Bash,
    Json,
    PlainText,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::Python,
        Language::JavaScript,
        Language::Rust,
        Language::Bash,
        Language::Json,
        Language::PlainText,
    ];

    /// Resolve a user-facing token (`py`, `javascript`, `sh`, ...).
    pub fn from_token(token: &str) -> Option<Self> {
        let lang = match token.trim().to_ascii_lowercase().as_str() {
            "python" | "py" | "python3" => Language::Python,
            "javascript" | "js" | "jsx" | "mjs" | "cjs" | "typescript" | "ts" | "tsx" => {
                Language::JavaScript
            }
            "rust" | "rs" => Language::Rust,
            "bash" | "sh" | "shell" | "zsh" | "console" => Language::Bash,
            "json" => Language::Json,
            "text" | "txt" | "plain" | "plaintext" => Language::PlainText,
            _ => return None,
        };
        Some(lang)
    }

    /// Guess from a file extension; unknown extensions map to plain text.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_token)
            .unwrap_or(Language::PlainText)
    }

    /// Token understood by syntect's `find_syntax_by_token`.
    pub fn syntax_token(self) -> &'static str {
        match self {
            Language::Python => "py",
            Language::JavaScript => "js",
            Language::Rust => "rs",
            Language::Bash => "sh",
            Language::Json => "json",
            Language::PlainText => "txt",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Rust => "rust",
            Language::Bash => "bash",
            Language::Json => "json",
            Language::PlainText => "text",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
