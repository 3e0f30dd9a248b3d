//! Color mapping for the presentation surface.
//!
//! Run colors are 24-bit. Terminals without truecolor get the nearest entry of
//! the xterm 256-color palette (6x6x6 cube or the 24-step gray ramp).

use core_terminal::ColorDepth;
use core_text::Color;
use crossterm::style::Color as TermColor;

/// Block glyph drawn at the cursor position while playing.
pub const INDICATOR_GLYPH: &str = "\u{258C}";

/// Chrome colors (header, frame, footer).
pub const CHROME_COLOR: Color = Color::rgb(118, 118, 118);
pub const INDICATOR_COLOR: Color = Color::rgb(229, 229, 229);

const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

pub fn to_terminal_color(color: Color, depth: ColorDepth) -> TermColor {
    match depth {
        ColorDepth::TrueColor => TermColor::Rgb {
            r: color.r,
            g: color.g,
            b: color.b,
        },
        ColorDepth::Ansi256 => TermColor::AnsiValue(rgb_to_ansi256(color)),
    }
}

/// `None` keeps the terminal's default foreground.
pub fn term_color(color: Option<Color>, depth: ColorDepth) -> Option<TermColor> {
    color.map(|c| to_terminal_color(c, depth))
}

fn nearest_cube_index(v: u8) -> usize {
    CUBE_LEVELS
        .iter()
        .enumerate()
        .min_by_key(|(_, level)| level.abs_diff(v))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn distance(a: (u8, u8, u8), b: (u8, u8, u8)) -> u32 {
    let d = |x: u8, y: u8| u32::from(x.abs_diff(y)).pow(2);
    d(a.0, b.0) + d(a.1, b.1) + d(a.2, b.2)
}

pub fn rgb_to_ansi256(color: Color) -> u8 {
    let (r, g, b) = (color.r, color.g, color.b);
    let (ri, gi, bi) = (nearest_cube_index(r), nearest_cube_index(g), nearest_cube_index(b));
    let cube = (CUBE_LEVELS[ri], CUBE_LEVELS[gi], CUBE_LEVELS[bi]);
    let cube_index = 16 + 36 * ri + 6 * gi + bi;

    // Gray ramp 232..=255 covers 8, 18, ..., 238.
    let avg = ((u16::from(r) + u16::from(g) + u16::from(b)) / 3) as u8;
    let step = usize::from(avg.saturating_sub(8) / 10).min(23);
    let level = 8 + 10 * step as u8;
    let gray = (level, level, level);

    if distance((r, g, b), gray) < distance((r, g, b), cube) {
        (232 + step) as u8
    } else {
        cube_index as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_corners() {
        assert_eq!(rgb_to_ansi256(Color::rgb(0, 0, 0)), 16);
        assert_eq!(rgb_to_ansi256(Color::rgb(255, 255, 255)), 231);
        assert_eq!(rgb_to_ansi256(Color::rgb(255, 0, 0)), 196);
        assert_eq!(rgb_to_ansi256(Color::rgb(0, 0, 255)), 21);
    }

    #[test]
    fn grays_use_ramp() {
        assert_eq!(rgb_to_ansi256(Color::rgb(118, 118, 118)), 243);
        assert_eq!(rgb_to_ansi256(Color::rgb(238, 238, 238)), 255);
    }

    #[test]
    fn depth_selects_encoding() {
        let c = Color::rgb(1, 2, 3);
        assert_eq!(
            to_terminal_color(c, ColorDepth::TrueColor),
            TermColor::Rgb { r: 1, g: 2, b: 3 }
        );
        assert!(matches!(
            to_terminal_color(c, ColorDepth::Ansi256),
            TermColor::AnsiValue(_)
        ));
        assert_eq!(term_color(None, ColorDepth::TrueColor), None);
    }
}
