//! SGR-colored terminal markup -> styled runs.
//!
//! Accepts the subset of ECMA-48 that terminal highlighters emit: `ESC [`
//! control sequences terminated by `m` (Select Graphic Rendition). Foreground
//! colors (basic, bright, 256-color and 24-bit) become run colors; background
//! colors and text attributes are accepted and dropped. Anything else (a bare
//! `ESC`, a non-SGR control sequence, an unterminated sequence, a
//! non-numeric parameter) is malformed and reported as
//! [`DecomposeError::Markup`] with the byte offset of the offending sequence.

use crate::{Color, DecomposeError, StyledRun};

const ESC: char = '\x1b';

struct ControlSequence<'a> {
    len: usize,
    params: &'a str,
    final_byte: u8,
}

fn markup_error(offset: usize, reason: &'static str) -> DecomposeError {
    DecomposeError::Markup { offset, reason }
}

/// `rest` starts with ESC; `offset` is its byte position in the full markup.
fn parse_control_sequence(rest: &str, offset: usize) -> Result<ControlSequence<'_>, DecomposeError> {
    let bytes = rest.as_bytes();
    if bytes.get(1) != Some(&b'[') {
        return Err(markup_error(offset, "escape not followed by '['"));
    }
    let mut idx = 2;
    while let Some(&b) = bytes.get(idx) {
        match b {
            0x30..=0x3F | 0x20..=0x2F => idx += 1,
            0x40..=0x7E => {
                return Ok(ControlSequence {
                    len: idx + 1,
                    params: &rest[2..idx],
                    final_byte: b,
                });
            }
            _ => return Err(markup_error(offset, "invalid byte in control sequence")),
        }
    }
    Err(markup_error(offset, "unterminated control sequence"))
}

fn parse_params(params: &str, offset: usize) -> Result<Vec<u16>, DecomposeError> {
    if params.is_empty() {
        return Ok(vec![0]);
    }
    params
        .split(';')
        .map(|p| {
            if p.is_empty() {
                Ok(0)
            } else {
                p.parse::<u16>()
                    .map_err(|_| markup_error(offset, "invalid numeric parameter"))
            }
        })
        .collect()
}

fn channel(value: Option<&u16>, offset: usize) -> Result<u8, DecomposeError> {
    let value = value.ok_or_else(|| markup_error(offset, "truncated extended color"))?;
    u8::try_from(*value).map_err(|_| markup_error(offset, "color component out of range"))
}

/// Consume an extended color (`5;n` or `2;r;g;b`) starting at `params[idx]`.
/// Returns the color and the number of parameters consumed.
fn extended_color(params: &[u16], idx: usize, offset: usize) -> Result<(Color, usize), DecomposeError> {
    match params.get(idx) {
        Some(5) => Ok((ansi256_to_rgb(channel(params.get(idx + 1), offset)?), 2)),
        Some(2) => {
            let r = channel(params.get(idx + 1), offset)?;
            let g = channel(params.get(idx + 2), offset)?;
            let b = channel(params.get(idx + 3), offset)?;
            Ok((Color::rgb(r, g, b), 4))
        }
        _ => Err(markup_error(offset, "truncated extended color")),
    }
}

fn apply_sgr(
    mut color: Option<Color>,
    params: &[u16],
    offset: usize,
) -> Result<Option<Color>, DecomposeError> {
    let mut idx = 0;
    while idx < params.len() {
        match params[idx] {
            0 | 39 => color = None,
            p @ 30..=37 => color = Some(ansi256_to_rgb((p - 30) as u8)),
            p @ 90..=97 => color = Some(ansi256_to_rgb((p - 90 + 8) as u8)),
            38 => {
                let (fg, used) = extended_color(params, idx + 1, offset)?;
                color = Some(fg);
                idx += used;
            }
            48 => {
                let (_bg, used) = extended_color(params, idx + 1, offset)?;
                idx += used;
            }
            _ => {}
        }
        idx += 1;
    }
    Ok(color)
}

fn flush_run(runs: &mut Vec<StyledRun>, text: &mut String, color: Option<Color>) {
    if text.is_empty() {
        return;
    }
    let text = std::mem::take(text);
    match runs.last_mut() {
        Some(last) if last.color == color && last.line_breaks_after == 0 => last.text.push_str(&text),
        _ => runs.push(StyledRun::new(text, color)),
    }
}

/// Parse SGR-colored markup into styled runs.
pub fn runs_from_ansi(markup: &str) -> Result<Vec<StyledRun>, DecomposeError> {
    let mut runs = Vec::new();
    let mut text = String::new();
    let mut color = None;
    let mut offset = 0;
    while offset < markup.len() {
        let rest = &markup[offset..];
        match rest.find(ESC) {
            Some(0) => {
                let seq = parse_control_sequence(rest, offset)?;
                if seq.final_byte != b'm' {
                    return Err(markup_error(offset, "unsupported control sequence"));
                }
                let params = parse_params(seq.params, offset)?;
                let next = apply_sgr(color, &params, offset)?;
                if next != color {
                    flush_run(&mut runs, &mut text, color);
                    color = next;
                }
                offset += seq.len;
            }
            Some(n) => {
                text.push_str(&rest[..n]);
                offset += n;
            }
            None => {
                text.push_str(rest);
                offset = markup.len();
            }
        }
    }
    flush_run(&mut runs, &mut text, color);
    Ok(runs)
}

/// Remove control sequences, keeping only the text. Best effort: malformed
/// sequences are dropped rather than reported.
pub fn strip_ansi(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut chars = markup.chars().peekable();
    while let Some(c) = chars.next() {
        if c != ESC {
            out.push(c);
            continue;
        }
        if chars.peek() != Some(&'[') {
            continue;
        }
        chars.next();
        for next in chars.by_ref() {
            if ('\u{40}'..='\u{7E}').contains(&next) {
                break;
            }
        }
    }
    out
}

/// Map an xterm 256-color palette index to RGB.
pub fn ansi256_to_rgb(index: u8) -> Color {
    const BASE: [(u8, u8, u8); 16] = [
        (0, 0, 0),
        (205, 49, 49),
        (13, 188, 121),
        (229, 229, 16),
        (36, 114, 200),
        (188, 63, 188),
        (17, 168, 205),
        (229, 229, 229),
        (102, 102, 102),
        (241, 76, 76),
        (35, 209, 139),
        (245, 245, 67),
        (59, 142, 234),
        (214, 112, 214),
        (41, 184, 219),
        (255, 255, 255),
    ];
    match index {
        0..=15 => {
            let (r, g, b) = BASE[index as usize];
            Color::rgb(r, g, b)
        }
        16..=231 => {
            let cube = index - 16;
            let level = |v: u8| if v == 0 { 0 } else { 55 + v * 40 };
            Color::rgb(level(cube / 36), level((cube / 6) % 6), level(cube % 6))
        }
        _ => {
            let gray = 8 + (index - 232) * 10;
            Color::rgb(gray, gray, gray)
        }
    }
}
