use core_playback::{PlaybackState, Timeline};
use core_text::{StyledRun, decompose};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Arm,
    Start,
    Tick,
    Cancel,
    Skip,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        1 => Just(Op::Arm),
        1 => Just(Op::Start),
        6 => Just(Op::Tick),
        1 => Just(Op::Cancel),
        1 => Just(Op::Skip),
    ]
}

proptest! {
    #[test]
    fn state_and_reveal_count_only_move_forward(
        text in "[a-z \n]{0,24}",
        ops in proptest::collection::vec(op(), 0..64),
    ) {
        let units = if text.is_empty() {
            Vec::new()
        } else {
            decompose(&[StyledRun::plain(text.clone())]).unwrap()
        };
        let total = units.len();
        let mut timeline = Timeline::new(units, 40).unwrap();
        let mut prev_state = timeline.state();
        let mut prev_revealed = timeline.revealed();

        for op in ops {
            match op {
                Op::Arm => { timeline.arm(); }
                Op::Start => { timeline.start(); }
                Op::Tick => { timeline.tick(); }
                Op::Cancel => { timeline.cancel(); }
                Op::Skip => { timeline.skip(); }
            }
            let state = timeline.state();
            let revealed = timeline.revealed();
            prop_assert!(state == prev_state || prev_state.can_transition_to(&state));
            prop_assert!(revealed >= prev_revealed);
            prop_assert!(revealed <= total);
            if let PlaybackState::Cancelled { revealed: frozen } = prev_state {
                prop_assert_eq!(revealed, frozen);
            }
            prev_state = state;
            prev_revealed = revealed;
        }
    }

    #[test]
    fn ticks_to_completion_equal_unit_count(text in "[a-z\t \n]{1,40}") {
        let units = decompose(&[StyledRun::plain(text)]).unwrap();
        let total = units.len();
        let mut timeline = Timeline::new(units, 1).unwrap();
        timeline.arm();
        timeline.start();
        let mut ticks = 0;
        while timeline.state().is_playing() {
            timeline.tick();
            ticks += 1;
        }
        prop_assert_eq!(ticks, total);
        prop_assert_eq!(timeline.state(), PlaybackState::Complete);
    }
}
