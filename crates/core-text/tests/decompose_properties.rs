//! Property-based tests for the run decomposer.

use core_text::{Color, StyledRun, decompose, plain_text, runs_source_text, source_text};
use proptest::prelude::*;

fn run_strategy() -> impl Strategy<Value = StyledRun> {
    (
        "[a-z \t(){}:=\n\"漢é😀]{1,12}",
        proptest::option::of((any::<u8>(), any::<u8>(), any::<u8>())),
        0usize..3,
    )
        .prop_map(|(text, color, breaks)| {
            StyledRun::new(text, color.map(|(r, g, b)| Color::rgb(r, g, b))).with_line_breaks(breaks)
        })
}

proptest! {
    // Every unit's index equals its position.
    #[test]
    fn indices_are_sequential(runs in prop::collection::vec(run_strategy(), 0..16)) {
        let units = decompose(&runs).unwrap();
        for (i, unit) in units.iter().enumerate() {
            prop_assert_eq!(unit.index, i);
        }
    }

    // Concatenating all units reproduces the source exactly.
    #[test]
    fn decomposition_is_lossless(runs in prop::collection::vec(run_strategy(), 0..16)) {
        let units = decompose(&runs).unwrap();
        prop_assert_eq!(source_text(&units), runs_source_text(&runs));
        let without_breaks: String = runs_source_text(&runs)
            .replace("\r\n", "")
            .replace('\n', "");
        prop_assert_eq!(plain_text(&units), without_breaks);
    }

    // Break units carry no width and restart the column on the next line.
    #[test]
    fn line_breaks_advance_layout(runs in prop::collection::vec(run_strategy(), 1..8)) {
        let units = decompose(&runs).unwrap();
        for pair in units.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            prop_assert_eq!((next.line, next.column), prev.position_after());
            if prev.is_line_break {
                prop_assert_eq!(prev.width, 0);
            }
        }
    }
}
