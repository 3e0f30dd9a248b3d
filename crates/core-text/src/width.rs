//! Grapheme cluster display width.
//!
//! Single authoritative function `egc_width` returning the terminal column
//! width of one grapheme cluster (EGC). The decomposer records this width on
//! every typing unit so the presentation surface and the derived cursor agree
//! on columns without re-measuring.
//!
//! Width precedence:
//! 1. Whitespace units (space, tab) are one cell: they are displayed as a
//!    single non-collapsing space.
//! 2. Classifier (emoji / wide / combining heuristics).
//! 3. Conservative widen fallback when a pictographic signal is present.
//!
//! Invariants:
//! - Over-estimation is preferred to under-estimation (extra blank cell vs.
//!   cursor drift).
//! - Grapheme segmentation happens once, in the caller.

const ZWJ: char = '\u{200D}';
const KEYCAP_COMBINING: char = '\u{20E3}';

fn is_regional_indicator(c: char) -> bool {
    ('\u{1F1E6}'..='\u{1F1FF}').contains(&c)
}

// Rough Extended Pictographic heuristic (emoji blocks + misc symbols/dingbats)
fn is_extended_pictographic(c: char) -> bool {
    ('\u{1F300}'..='\u{1FAFF}').contains(&c) || ('\u{2600}'..='\u{27BF}').contains(&c)
}

fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&c)
        || ('\u{1AB0}'..='\u{1AFF}').contains(&c)
        || ('\u{1DC0}'..='\u{1DFF}').contains(&c)
        || ('\u{20D0}'..='\u{20FF}').contains(&c)
        || ('\u{FE20}'..='\u{FE2F}').contains(&c)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EgcKind {
    Narrow,
    Wide,
    Emoji,
    Combining { wide_base: bool },
}

fn classify(egc: &str) -> EgcKind {
    let mut chars = egc.chars();
    let Some(first) = chars.next() else {
        return EgcKind::Narrow;
    };
    let single = chars.next().is_none();

    if single {
        if first.is_ascii() {
            return EgcKind::Narrow;
        }
        if is_extended_pictographic(first) {
            return EgcKind::Emoji;
        }
        return match unicode_width::UnicodeWidthChar::width(first) {
            Some(2) => EgcKind::Wide,
            _ => EgcKind::Narrow,
        };
    }

    let mut pictographic = 0usize;
    let mut regional = 0usize;
    let mut has_zwj = false;
    let mut has_combining = false;
    let mut any_wide = false;
    for c in egc.chars() {
        if is_extended_pictographic(c) {
            pictographic += 1;
        }
        if is_regional_indicator(c) {
            regional += 1;
        }
        has_zwj |= c == ZWJ;
        has_combining |= is_combining_mark(c);
        any_wide |= unicode_width::UnicodeWidthChar::width(c) == Some(2);
    }

    if egc.ends_with(KEYCAP_COMBINING) || regional == 2 || (has_zwj && pictographic >= 2) {
        return EgcKind::Emoji;
    }
    if pictographic >= 1 {
        return EgcKind::Emoji;
    }
    if has_combining {
        let wide_base = unicode_width::UnicodeWidthChar::width(first) == Some(2);
        return EgcKind::Combining { wide_base };
    }
    if any_wide {
        return EgcKind::Wide;
    }
    EgcKind::Narrow
}

/// Return the display column width for a single grapheme cluster.
///
/// Empty input returns 0. Control clusters other than tab also return 0;
/// the decomposer never hands line breaks to this function.
#[inline]
pub fn egc_width(egc: &str) -> u16 {
    if egc.is_empty() {
        return 0;
    }
    if egc == " " || egc == "\t" {
        return 1;
    }
    if egc.chars().all(char::is_control) {
        return 0;
    }
    match classify(egc) {
        EgcKind::Narrow => 1,
        EgcKind::Wide | EgcKind::Emoji => 2,
        EgcKind::Combining { wide_base } => {
            if wide_base {
                2
            } else {
                1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_and_whitespace_are_single_cell() {
        assert_eq!(egc_width("a"), 1);
        assert_eq!(egc_width(" "), 1);
        assert_eq!(egc_width("\t"), 1);
        assert_eq!(egc_width(""), 0);
    }

    #[test]
    fn cjk_and_emoji_are_double_cell() {
        assert_eq!(egc_width("漢"), 2);
        assert_eq!(egc_width("😀"), 2);
        assert_eq!(egc_width("👨\u{200D}👩\u{200D}👧"), 2);
        assert_eq!(egc_width("🇯🇵"), 2);
    }

    #[test]
    fn combining_cluster_keeps_base_width() {
        assert_eq!(egc_width("e\u{0301}"), 1);
    }

    #[test]
    fn control_cluster_has_no_width() {
        assert_eq!(egc_width("\u{7}"), 0);
    }
}
