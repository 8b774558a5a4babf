//! Property tests: arbitrary command sequences never break the engine invariants

#![allow(clippy::unwrap_used)]

use marker_counter::{
    CounterAction, CounterConfig, CounterEngine, CounterEnvironment, EngineState, MarkerId,
    Viewport,
};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use tally_core::reducer::Reducer;
use tally_testing::{RecordingSoundPlayer, SeededRandom, test_clock};

fn command() -> impl Strategy<Value = CounterAction> {
    prop_oneof![
        4 => Just(CounterAction::Increment),
        2 => Just(CounterAction::Decrement),
        2 => (0u64..40).prop_map(|id| CounterAction::RemoveMarker { id: MarkerId::new(id) }),
        1 => Just(CounterAction::Reset),
        1 => Just(CounterAction::DismissMessage),
        1 => Just(CounterAction::ConsumeSoundTrigger),
        1 => Just(CounterAction::SessionStarted),
        2 => (-50.0f64..1_000.0, -50.0f64..800.0)
            .prop_map(|(width, height)| CounterAction::ViewportChanged { width, height }),
    ]
}

fn env(seed: u64) -> CounterEnvironment {
    CounterEnvironment::new(
        Arc::new(test_clock()),
        Arc::new(SeededRandom::new(seed)),
        Arc::new(RecordingSoundPlayer::new()),
    )
}

proptest! {
    #[test]
    fn invariants_hold_after_every_command(
        seed in any::<u64>(),
        diameter in 1.0f64..120.0,
        commands in prop::collection::vec(command(), 1..200),
    ) {
        let config = CounterConfig::default().with_marker_diameter(diameter);
        let engine = CounterEngine::new(&config);
        let env = env(seed);
        let mut state = EngineState::new(Viewport::new(640.0, 480.0));
        let mut seen_ids = HashSet::new();

        for command in commands {
            let before = state.clone();
            let _ = engine.reduce(&mut state, command.clone(), &env);

            prop_assert_eq!(state.check_invariants(diameter), Ok(()));
            prop_assert_eq!(state.tally as usize, state.markers.len());

            // Version moves by exactly one on change and not at all otherwise
            let mut unversioned = state.clone();
            unversioned.version = before.version;
            if unversioned == before {
                prop_assert_eq!(state.version, before.version);
            } else {
                prop_assert_eq!(state.version, before.version + 1);
            }

            // A fresh id is never one handed out before
            if command == CounterAction::Increment && state.tally > before.tally {
                let id = state.markers.last().map(|marker| marker.id).unwrap();
                prop_assert!(seen_ids.insert(id));
            }
        }
    }

    #[test]
    fn decrement_is_lifo(increments in 1usize..30, decrements in 0usize..40) {
        let engine = CounterEngine::default();
        let env = env(0);
        let mut state = EngineState::new(Viewport::new(800.0, 600.0));

        for _ in 0..increments {
            let _ = engine.reduce(&mut state, CounterAction::Increment, &env);
        }
        for _ in 0..decrements {
            let _ = engine.reduce(&mut state, CounterAction::Decrement, &env);
        }

        let remaining = increments.saturating_sub(decrements);
        let ids: Vec<u64> = state.markers.iter().map(|marker| marker.id.get()).collect();
        let expected: Vec<u64> = (1..=remaining as u64).collect();
        prop_assert_eq!(ids, expected);
    }
}
