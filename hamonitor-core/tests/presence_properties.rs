//! Property tests for the presence state machine

use hamonitor_core::{
    IntensitySample, PresenceConfig, PresenceEvent, PresenceMachine, PresenceState,
};
use proptest::prelude::*;

const THRESHOLD: u64 = 1_000;

/// Frame gaps and intensities, loosely 10-60 fps with occasional stalls
fn frame_runs() -> impl Strategy<Value = Vec<(u64, u64)>> {
    prop::collection::vec(
        (
            prop_oneof![9 => 10u64..100, 1 => 1_000u64..60_000],
            prop_oneof![0u64..THRESHOLD, THRESHOLD + 1..THRESHOLD * 10],
        ),
        1..600,
    )
}

fn machine() -> PresenceMachine {
    PresenceMachine::new(PresenceConfig::default().with_threshold(THRESHOLD))
}

fn allowed(from: PresenceState, to: PresenceState) -> bool {
    use PresenceState::*;
    matches!(
        (from, to),
        (Idle, Debouncing) | (Debouncing, Active) | (Debouncing, Idle) | (Active, Idle)
    ) || from == to
}

proptest! {
    #[test]
    fn states_follow_the_cycle(frames in frame_runs()) {
        let mut machine = machine();
        let mut at = 0;
        for (gap, value) in frames {
            at += gap;
            let before = machine.state();
            let event = machine.feed(IntensitySample::new(value, at)).unwrap();
            let after = machine.state();

            prop_assert!(allowed(before, after), "{} -> {}", before, after);
            match event {
                Some(PresenceEvent::MotionStarted { at: t }) => {
                    prop_assert_eq!(t, at);
                    prop_assert_eq!((before, after), (PresenceState::Debouncing, PresenceState::Active));
                }
                Some(PresenceEvent::MotionEnded { at: t }) => {
                    prop_assert_eq!(t, at);
                    prop_assert_eq!((before, after), (PresenceState::Active, PresenceState::Idle));
                }
                Some(other) => prop_assert!(false, "re-affirmation without interval: {}", other),
                None => prop_assert!(before == after || after != PresenceState::Active),
            }
        }
    }

    #[test]
    fn quiet_frame_always_cancels_debounce(gaps in prop::collection::vec(1u64..500, 1..20)) {
        let mut machine = machine();
        let mut at = 0;
        machine.feed(IntensitySample::new(THRESHOLD + 1, at)).unwrap();
        for gap in gaps {
            at += gap;
            if machine.state() != PresenceState::Debouncing {
                break;
            }
            machine.feed(IntensitySample::new(THRESHOLD + 1, at)).unwrap();
        }

        if machine.state() == PresenceState::Debouncing {
            machine.feed(IntensitySample::new(THRESHOLD, at + 1)).unwrap();
            prop_assert_eq!(machine.state(), PresenceState::Idle);
            prop_assert_eq!(machine.activity_ms(), 0);
        }
    }

    #[test]
    fn stale_samples_change_nothing(frames in frame_runs(), back in 0u64..10_000, value in any::<u64>()) {
        let mut machine = machine();
        let mut at = 0;
        for (gap, v) in frames {
            at += gap;
            machine.feed(IntensitySample::new(v, at)).unwrap();
        }

        let state = machine.state();
        let activity = machine.activity_ms();
        let inactivity = machine.inactivity_ms();
        let last_seen = machine.last_seen();
        let accepted = machine.stats().samples;

        let stale = at.saturating_sub(back);
        prop_assert!(machine.feed(IntensitySample::new(value, stale)).is_err());

        prop_assert_eq!(machine.state(), state);
        prop_assert_eq!(machine.activity_ms(), activity);
        prop_assert_eq!(machine.inactivity_ms(), inactivity);
        prop_assert_eq!(machine.last_seen(), last_seen);
        prop_assert_eq!(machine.stats().samples, accepted);
    }

    #[test]
    fn same_input_same_output(frames in frame_runs()) {
        let samples: Vec<_> = frames
            .iter()
            .scan(0u64, |at, &(gap, value)| {
                *at += gap;
                Some(IntensitySample::new(value, *at))
            })
            .collect();

        let run = |samples: &[IntensitySample]| {
            let mut machine = machine();
            samples
                .iter()
                .filter_map(|&s| machine.feed(s).unwrap())
                .collect::<Vec<_>>()
        };

        prop_assert_eq!(run(&samples), run(&samples));
    }
}
