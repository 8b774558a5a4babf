//! # Tally Testing
//!
//! Testing utilities and helpers for tally reducers.
//!
//! This crate provides:
//! - Deterministic implementations of the Environment traits
//! - A Given-When-Then harness for reducers
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use tally_testing::{test_clock, SeededRandom, RecordingSoundPlayer};
//!
//! let env = CounterEnvironment::new(
//!     Arc::new(test_clock()),
//!     Arc::new(SeededRandom::new(7)),
//!     Arc::new(RecordingSoundPlayer::new()),
//! );
//! ```

use chrono::{DateTime, Utc};
use tally_core::environment::{Clock, RandomSource, SoundPlayer};


/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, RandomSource, SoundPlayer, Utc};
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use tally_testing::mocks::FixedClock;
    /// use tally_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(20_089))
    }

    /// Seeded pseudo-random source
    ///
    /// Two sources built from the same seed produce the same sequence.
    #[derive(Debug)]
    pub struct SeededRandom {
        rng: Mutex<StdRng>,
    }

    impl SeededRandom {
        /// Create a source from a seed
        #[must_use]
        pub fn new(seed: u64) -> Self {
            Self {
                rng: Mutex::new(StdRng::seed_from_u64(seed)),
            }
        }
    }

    impl RandomSource for SeededRandom {
        fn next_u64(&self) -> u64 {
            self.rng
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .next_u64()
        }
    }

    /// Random source replaying a scripted sequence of values
    ///
    /// Useful to pin an exact position or color. Once the script is
    /// exhausted it keeps returning the last value (or 0 if it was empty).
    #[derive(Debug)]
    pub struct ScriptedRandom {
        values: Mutex<(VecDeque<u64>, u64)>,
    }

    impl ScriptedRandom {
        /// Create a source that yields `values` in order
        #[must_use]
        pub fn new(values: impl IntoIterator<Item = u64>) -> Self {
            Self {
                values: Mutex::new((values.into_iter().collect(), 0)),
            }
        }

        /// Raw value that makes [`RandomSource::next_f64`] return roughly `fraction`
        #[must_use]
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        pub fn fraction(fraction: f64) -> u64 {
            let clamped = fraction.clamp(0.0, 1.0 - f64::EPSILON);
            ((clamped * (1_u64 << 53) as f64) as u64) << 11
        }
    }

    impl RandomSource for ScriptedRandom {
        fn next_u64(&self) -> u64 {
            let mut guard = self.values.lock().unwrap_or_else(PoisonError::into_inner);
            let (queue, last) = &mut *guard;
            if let Some(value) = queue.pop_front() {
                *last = value;
            }
            *last
        }
    }

    /// Sound player that counts how often it was asked to play
    #[derive(Debug, Default)]
    pub struct RecordingSoundPlayer {
        plays: AtomicUsize,
    }

    impl RecordingSoundPlayer {
        /// Create a player with no recorded plays
        #[must_use]
        pub const fn new() -> Self {
            Self {
                plays: AtomicUsize::new(0),
            }
        }

        /// Number of times [`SoundPlayer::play`] was called
        #[must_use]
        pub fn plays(&self) -> usize {
            self.plays.load(Ordering::SeqCst)
        }
    }

    impl SoundPlayer for RecordingSoundPlayer {
        fn play(&self) {
            self.plays.fetch_add(1, Ordering::SeqCst);
        }
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, RecordingSoundPlayer, ScriptedRandom, SeededRandom, test_clock};
pub use reducer_test::{ReducerTest, assertions};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
        assert_eq!(time1.to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_seeded_random_is_reproducible() {
        let a = SeededRandom::new(42);
        let b = SeededRandom::new(42);
        let first: Vec<u64> = (0..8).map(|_| a.next_u64()).collect();
        let second: Vec<u64> = (0..8).map(|_| b.next_u64()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_scripted_random_repeats_last_value() {
        let random = ScriptedRandom::new([3, 9]);
        assert_eq!(random.next_u64(), 3);
        assert_eq!(random.next_u64(), 9);
        assert_eq!(random.next_u64(), 9);
        assert_eq!(ScriptedRandom::new([]).next_u64(), 0);
    }

    #[test]
    fn test_scripted_fraction() {
        let random = ScriptedRandom::new([ScriptedRandom::fraction(0.5), ScriptedRandom::fraction(2.0)]);
        assert!((random.next_f64() - 0.5).abs() < 1e-9);
        assert!(random.next_f64() < 1.0);
    }

    #[test]
    fn test_recording_sound_player() {
        let player = RecordingSoundPlayer::new();
        player.play();
        player.play();
        assert_eq!(player.plays(), 2);
    }
}
