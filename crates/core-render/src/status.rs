//! Header and footer composition.
//!
//! Two stages, as for any chrome line: `compose_*` produces ordered segments,
//! `format_segments` joins them with a middle dot separator. Tests assert on
//! segments where the content matters and on strings where layout does.

use core_playback::{PlaybackSnapshot, PlaybackState};

pub const SEPARATOR: &str = " \u{00B7} ";
pub const KEY_HINT: &str = "[s]kip [r]eplay [m]otion [q]uit";

pub struct StatusContext<'a> {
    pub title: &'a str,
    /// Language label shown next to the title ("Python", "Rust", ...).
    pub label: &'a str,
    pub snapshot: &'a PlaybackSnapshot,
    pub reduced_motion: bool,
    /// Set when highlighting or decomposition failed and the text is shown
    /// without animation.
    pub static_fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusSegment<'a> {
    Title(&'a str),
    Label(&'a str),
    State(&'static str),
    Progress { revealed: usize, total: usize },
    ReducedMotion,
    Static,
    Hint(&'static str),
}

pub fn compose_header<'a>(ctx: &StatusContext<'a>) -> Vec<StatusSegment<'a>> {
    let mut out = vec![StatusSegment::Title(ctx.title)];
    if !ctx.label.is_empty() {
        out.push(StatusSegment::Label(ctx.label));
    }
    out
}

pub fn compose_footer<'a>(ctx: &StatusContext<'a>) -> Vec<StatusSegment<'a>> {
    let mut out = Vec::with_capacity(5);
    if ctx.static_fallback {
        out.push(StatusSegment::Static);
    } else {
        let snap = ctx.snapshot;
        out.push(StatusSegment::State(snap.state.label()));
        if matches!(
            snap.state,
            PlaybackState::Playing { .. } | PlaybackState::Cancelled { .. }
        ) {
            out.push(StatusSegment::Progress {
                revealed: snap.revealed,
                total: snap.total,
            });
        }
    }
    if ctx.reduced_motion {
        out.push(StatusSegment::ReducedMotion);
    }
    out.push(StatusSegment::Hint(KEY_HINT));
    out
}

pub fn format_segments(segments: &[StatusSegment<'_>]) -> String {
    let mut out = String::new();
    for (i, seg) in segments.iter().enumerate() {
        if i > 0 {
            out.push_str(SEPARATOR);
        }
        match seg {
            StatusSegment::Title(s) | StatusSegment::Label(s) => out.push_str(s),
            StatusSegment::State(s) => out.push_str(s),
            StatusSegment::Progress { revealed, total } => {
                out.push_str(&format!("{revealed}/{total}"));
            }
            StatusSegment::ReducedMotion => out.push_str("reduced motion"),
            StatusSegment::Static => out.push_str("static"),
            StatusSegment::Hint(s) => out.push_str(s),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_playback::CursorPosition;

    fn snapshot(state: PlaybackState, revealed: usize, total: usize) -> PlaybackSnapshot {
        PlaybackSnapshot {
            state,
            revealed,
            total,
            cursor: CursorPosition::BeforeFirst,
        }
    }

    fn ctx<'a>(snap: &'a PlaybackSnapshot) -> StatusContext<'a> {
        StatusContext {
            title: "typeplay",
            label: "Python",
            snapshot: snap,
            reduced_motion: false,
            static_fallback: false,
        }
    }

    #[test]
    fn header_title_and_label() {
        let snap = PlaybackSnapshot::initial(3);
        let c = ctx(&snap);
        assert_eq!(format_segments(&compose_header(&c)), "typeplay \u{00B7} Python");
        let bare = StatusContext { label: "", ..c };
        assert_eq!(compose_header(&bare), vec![StatusSegment::Title("typeplay")]);
    }

    #[test]
    fn footer_shows_progress_while_playing() {
        let snap = snapshot(PlaybackState::Playing { revealed: 4 }, 4, 9);
        let footer = format_segments(&compose_footer(&ctx(&snap)));
        assert!(footer.starts_with("playing \u{00B7} 4/9"));
        assert!(footer.ends_with(KEY_HINT));
    }

    #[test]
    fn footer_terminal_states() {
        let snap = snapshot(PlaybackState::Complete, 9, 9);
        assert_eq!(
            compose_footer(&ctx(&snap)),
            vec![StatusSegment::State("complete"), StatusSegment::Hint(KEY_HINT)]
        );
        let snap = snapshot(PlaybackState::Skipped, 9, 9);
        let mut c = ctx(&snap);
        c.reduced_motion = true;
        assert_eq!(
            compose_footer(&c),
            vec![
                StatusSegment::State("skipped"),
                StatusSegment::ReducedMotion,
                StatusSegment::Hint(KEY_HINT)
            ]
        );
    }

    #[test]
    fn static_fallback_replaces_state() {
        let snap = PlaybackSnapshot::initial(0);
        let mut c = ctx(&snap);
        c.static_fallback = true;
        assert_eq!(compose_footer(&c)[0], StatusSegment::Static);
    }
}
