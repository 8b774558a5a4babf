//! Counter engine: the reducer that owns every state transition.
//!
//! Each command is validated against the current [`EngineState`] and either
//! applied in full or ignored. Invalid requests (a decrement at zero, a click
//! on a marker that is already gone) are no-ops, never errors. A command that
//! changes anything bumps [`EngineState::version`] by exactly one.

use crate::allocator::PositionAllocator;
use crate::config::CounterConfig;
use crate::environment::CounterEnvironment;
use crate::types::{CounterAction, EngineState, Marker, MarkerId, SoundTrigger, Viewport};
use std::sync::Arc;
use std::time::Duration;
use tally_core::effect::{Effect, EffectId};
use tally_core::reducer::Reducer;
use tally_core::{SmallVec, async_effect, cancellable_delay, smallvec};

/// Id of the timer that hides the onboarding message
pub const ONBOARDING_TIMER: EffectId = EffectId::new("counter.onboarding_timer");

/// Id of the subscription forwarding viewport resize notifications
pub const VIEWPORT_OBSERVER: EffectId = EffectId::new("counter.viewport_observer");

/// Reducer implementing the marker counter
#[derive(Debug, Clone)]
pub struct CounterEngine {
    allocator: PositionAllocator,
    message_timeout: Duration,
}

impl CounterEngine {
    /// Creates a new counter engine
    #[must_use]
    pub fn new(config: &CounterConfig) -> Self {
        Self {
            allocator: PositionAllocator::new(config.marker_diameter),
            message_timeout: config.message_timeout(),
        }
    }

    /// Allocator used for new markers
    #[must_use]
    pub const fn allocator(&self) -> &PositionAllocator {
        &self.allocator
    }

    /// How long the onboarding message stays up after session start
    #[must_use]
    pub const fn message_timeout(&self) -> Duration {
        self.message_timeout
    }

    fn increment(&self, state: &mut EngineState, env: &CounterEnvironment) -> bool {
        let Some(tally) = state.tally.checked_add(1) else {
            tracing::warn!("Increment ignored: tally is at its maximum");
            return false;
        };

        let id = MarkerId::new(state.next_id);
        state.next_id += 1;
        state.markers.push(Marker {
            id,
            position: self.allocator.position(state.viewport, env.random.as_ref()),
            color: self.allocator.color(env.random.as_ref()),
            sequence_number: tally,
        });
        state.tally = tally;

        tracing::debug!(marker_id = %id, tally, "Marker added");
        true
    }

    fn decrement(state: &mut EngineState) -> bool {
        let Some(marker) = state.markers.pop() else {
            tracing::debug!("Decrement ignored: no markers");
            return false;
        };
        state.tally -= 1;

        tracing::debug!(marker_id = %marker.id, tally = state.tally, "Last marker removed");
        true
    }

    fn remove_marker(state: &mut EngineState, id: MarkerId) -> bool {
        let Some(index) = state.markers.iter().position(|marker| marker.id == id) else {
            tracing::debug!(marker_id = %id, "Removal ignored: unknown marker");
            return false;
        };
        state.markers.remove(index);
        state.tally -= 1;
        state.sound_pending = true;

        tracing::debug!(marker_id = %id, tally = state.tally, "Marker removed");
        true
    }

    fn reset(state: &mut EngineState) -> bool {
        if state.markers.is_empty() {
            tracing::debug!("Reset ignored: already empty");
            return false;
        }
        let cleared = state.markers.len();
        state.markers.clear();
        state.tally = 0;

        tracing::debug!(cleared, "Counter reset");
        true
    }

    fn viewport_changed(&self, state: &mut EngineState, width: f64, height: f64) -> bool {
        let viewport = Viewport::new(width, height);
        if viewport == state.viewport {
            tracing::debug!(width, height, "Viewport unchanged");
            return false;
        }
        state.viewport = viewport;
        for marker in &mut state.markers {
            marker.position = self.allocator.clamp(marker.position, viewport);
        }

        tracing::debug!(
            width = viewport.width,
            height = viewport.height,
            markers = state.markers.len(),
            "Viewport changed, markers re-clamped"
        );
        true
    }
}

impl Default for CounterEngine {
    fn default() -> Self {
        Self::new(&CounterConfig::default())
    }
}

impl Reducer for CounterEngine {
    type State = EngineState;
    type Action = CounterAction;
    type Environment = CounterEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let (changed, effect): (bool, Effect<CounterAction>) = match action {
            CounterAction::SessionStarted => {
                let first_start = state.started_at.is_none();
                if first_start {
                    state.started_at = Some(env.clock.now());
                }

                let effect = if state.message_visible {
                    tracing::debug!(
                        timeout_ms = self.message_timeout.as_millis(),
                        "Arming onboarding timer"
                    );
                    cancellable_delay! {
                        id: ONBOARDING_TIMER,
                        duration: self.message_timeout,
                        action: CounterAction::DismissMessage
                    }
                } else {
                    Effect::None
                };
                (first_start, effect)
            },

            CounterAction::Increment => (self.increment(state, env), Effect::None),

            CounterAction::Decrement => (Self::decrement(state), Effect::None),

            CounterAction::RemoveMarker { id } => (Self::remove_marker(state, id), Effect::None),

            CounterAction::Reset => (Self::reset(state), Effect::None),

            CounterAction::DismissMessage => {
                if state.message_visible {
                    state.message_visible = false;
                    tracing::debug!("Onboarding message dismissed");
                    (true, Effect::Cancel(ONBOARDING_TIMER))
                } else {
                    (false, Effect::None)
                }
            },

            CounterAction::ConsumeSoundTrigger => match state.consume_sound_trigger() {
                SoundTrigger::Fire => {
                    tracing::debug!("Sound trigger consumed");
                    let sound = Arc::clone(&env.sound);
                    (
                        true,
                        async_effect! {
                            sound.play();
                            None
                        },
                    )
                },
                SoundTrigger::NoOp => (false, Effect::None),
            },

            CounterAction::ViewportChanged { width, height } => {
                (self.viewport_changed(state, width, height), Effect::None)
            },
        };

        if changed {
            state.version += 1;
        }

        debug_assert_eq!(state.check_invariants(self.allocator.diameter()), Ok(()));

        smallvec![effect]
    }
}
