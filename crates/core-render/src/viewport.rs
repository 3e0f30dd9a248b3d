//! Viewport: the visible vertical window into the code area.
//!
//! * `first_line` is the topmost layout line shown.
//! * `height` is the number of rows available for code (chrome excluded).
//! * `follow` scrolls just enough to keep the typing cursor's line visible.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub first_line: usize,
    pub height: usize,
}

impl Viewport {
    pub fn new(first_line: usize, height: usize) -> Self {
        Self { first_line, height }
    }

    pub fn contains(&self, line: usize) -> bool {
        line >= self.first_line && line < self.first_line + self.height
    }

    /// Screen-relative row of `line`, if visible.
    pub fn row_of(&self, line: usize) -> Option<usize> {
        self.contains(line).then(|| line - self.first_line)
    }

    /// Scroll so `line` is visible. Returns true when `first_line` moved.
    pub fn follow(&mut self, line: usize) -> bool {
        if self.height == 0 || self.contains(line) {
            return false;
        }
        self.first_line = if line < self.first_line {
            line
        } else {
            line + 1 - self.height
        };
        true
    }
}
