//! # Tally Core
//!
//! Core traits and types for reducer-driven UI state engines.
//!
//! A UI component is modelled as one explicit state value that is only ever
//! changed by a pure reducer. Everything the component needs from the outside
//! world (time, randomness, audio) is injected through its environment, and
//! everything it wants the outside world to do (timers, sounds) is returned as
//! an effect description.
//!
//! ## Core Concepts
//!
//! - **State**: The authoritative value the presentation layer renders
//! - **Action**: Every command the presentation layer or a timer can issue
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits
//!
//! ## Example
//!
//! ```ignore
//! use tally_core::*;
//!
//! #[derive(Clone, Debug, Default)]
//! struct ClickState {
//!     clicks: u32,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum ClickAction {
//!     Click,
//! }
//!
//! impl Reducer for ClickReducer {
//!     type State = ClickState;
//!     type Action = ClickAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut ClickState,
//!         action: ClickAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<ClickAction>; 4]> {
//!         state.clicks += 1;
//!         smallvec![Effect::None]
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

/// Declarative macros for building effects
pub mod effect_macros;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for ClickReducer {
    ///     type State = ClickState;
    ///     type Action = ClickAction;
    ///     type Environment = ClickEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut ClickState,
    ///         action: ClickAction,
    ///         env: &ClickEnvironment,
    ///     ) -> SmallVec<[Effect<ClickAction>; 4]> {
    ///         match action {
    ///             ClickAction::Click => {
    ///                 state.clicks += 1;
    ///                 smallvec![Effect::None]
    ///             }
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// # Arguments
        ///
        /// - `state`: Mutable reference to current state
        /// - `action`: The action to process
        /// - `env`: Reference to injected dependencies
        ///
        /// # Returns
        ///
        /// Effects to be executed by the runtime. Most reducers return at
        /// most a handful, so they are kept inline.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable and cancellable.
pub mod effect {
    use std::borrow::Cow;
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Identifier for a cancellable effect
    ///
    /// A runtime keeps at most one live task per id. Issuing a new
    /// [`Effect::Cancellable`] with an id that is still running replaces the
    /// old task.
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct EffectId(Cow<'static, str>);

    impl EffectId {
        /// Create an id from a static name (usable in `const` items)
        #[must_use]
        pub const fn new(name: &'static str) -> Self {
            Self(Cow::Borrowed(name))
        }

        /// Create an id from a runtime-built name
        #[must_use]
        pub fn owned(name: impl Into<String>) -> Self {
            Self(Cow::Owned(name.into()))
        }

        /// The id as a string slice
        #[must_use]
        pub fn as_str(&self) -> &str {
            &self.0
        }
    }

    impl std::fmt::Display for EffectId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Delayed action (for timeouts, auto-hide timers)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

        /// Run `effect` as a task that can later be aborted through `id`
        Cancellable {
            /// Handle used by [`Effect::Cancel`] and by runtime shutdown
            id: EffectId,
            /// The effect to run
            effect: Box<Effect<Action>>,
        },

        /// Abort the cancellable task registered under this id, if any
        Cancel(EffectId),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
                Effect::Cancellable { id, effect } => f
                    .debug_struct("Effect::Cancellable")
                    .field("id", id)
                    .field("effect", effect)
                    .finish(),
                Effect::Cancel(id) => f.debug_tuple("Effect::Cancel").field(id).finish(),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Wrap this effect so it can be cancelled through `id`
        #[must_use]
        pub fn cancellable(self, id: EffectId) -> Effect<Action> {
            Effect::Cancellable {
                id,
                effect: Box::new(self),
            }
        }

        /// Whether this effect does nothing when executed
        #[must_use]
        pub fn is_none(&self) -> bool {
            match self {
                Effect::None => true,
                Effect::Parallel(effects) | Effect::Sequential(effects) => {
                    effects.iter().all(Effect::is_none)
                },
                _ => false,
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter, so reducers stay deterministic under test.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Uniform random source
    ///
    /// Takes `&self` because environments are shared by reference with the
    /// reducer; implementations use interior mutability.
    pub trait RandomSource: Send + Sync {
        /// Next uniformly distributed 64-bit value
        fn next_u64(&self) -> u64;

        /// Next uniformly distributed value in `[0, 1)`
        ///
        /// Uses the top 53 bits so every result is exactly representable.
        #[allow(clippy::cast_precision_loss)] // 53 bits fit an f64 mantissa
        fn next_f64(&self) -> f64 {
            (self.next_u64() >> 11) as f64 * (1.0 / (1_u64 << 53) as f64)
        }
    }

    /// Audio output for short one-shot sound effects
    pub trait SoundPlayer: Send + Sync {
        /// Play the effect once. Failures are the player's concern.
        fn play(&self);
    }

    /// Sound player that drops every request
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SilentPlayer;

    impl SoundPlayer for SilentPlayer {
        fn play(&self) {}
    }
}

#[cfg(test)]
mod tests {
    use super::effect::{Effect, EffectId};
    use super::environment::RandomSource;
    use std::time::Duration;

    struct Constant(u64);

    impl RandomSource for Constant {
        fn next_u64(&self) -> u64 {
            self.0
        }
    }

    #[test]
    fn test_next_f64_bounds() {
        assert!(Constant(0).next_f64().abs() < f64::EPSILON);
        let top = Constant(u64::MAX).next_f64();
        assert!(top < 1.0);
        assert!(top > 0.999_999);
    }

    #[test]
    fn test_effect_is_none() {
        assert!(Effect::<()>::None.is_none());
        assert!(Effect::<()>::merge(vec![Effect::None, Effect::None]).is_none());
        assert!(!Effect::Delay {
            duration: Duration::from_secs(1),
            action: Box::new(()),
        }
        .is_none());
        assert!(!Effect::<()>::Cancel(EffectId::new("timer")).is_none());
    }

    #[test]
    fn test_cancellable_wraps_effect() {
        let id = EffectId::new("timer");
        let effect = Effect::Delay {
            duration: Duration::from_secs(5),
            action: Box::new(1_u8),
        }
        .cancellable(id.clone());

        match effect {
            Effect::Cancellable { id: got, effect } => {
                assert_eq!(got, id);
                assert!(matches!(*effect, Effect::Delay { .. }));
            },
            other => unreachable!("unexpected effect: {other:?}"),
        }
    }

    #[test]
    fn test_effect_id_display() {
        assert_eq!(EffectId::new("a").to_string(), "a");
        assert_eq!(EffectId::owned(String::from("b")).as_str(), "b");
        assert_eq!(EffectId::new("c"), EffectId::owned("c"));
    }
}
