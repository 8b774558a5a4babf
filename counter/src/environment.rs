//! Injected dependencies of the counter engine.

use crate::config::CounterConfig;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::sync::{Arc, Mutex, PoisonError};
use tally_core::environment::{Clock, RandomSource, SoundPlayer, SystemClock};

/// Everything the counter engine needs from the outside world
#[derive(Clone)]
pub struct CounterEnvironment {
    /// Time source for session timestamps
    pub clock: Arc<dyn Clock>,
    /// Uniform randomness for marker placement and colors
    pub random: Arc<dyn RandomSource>,
    /// Output for the marker-removed sound
    pub sound: Arc<dyn SoundPlayer>,
}

impl CounterEnvironment {
    /// Creates a new counter environment
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
        sound: Arc<dyn SoundPlayer>,
    ) -> Self {
        Self {
            clock,
            random,
            sound,
        }
    }

    /// System clock plus a random source seeded as `config` asks
    #[must_use]
    pub fn production(config: &CounterConfig, sound: Arc<dyn SoundPlayer>) -> Self {
        let random = config.seed.map_or_else(StdRandom::from_entropy, StdRandom::seeded);
        Self::new(Arc::new(SystemClock), Arc::new(random), sound)
    }
}

impl std::fmt::Debug for CounterEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterEnvironment").finish_non_exhaustive()
    }
}

/// [`RandomSource`] backed by [`StdRng`]
#[derive(Debug)]
pub struct StdRandom {
    rng: Mutex<StdRng>,
}

impl StdRandom {
    /// Seed from operating system entropy
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Seed deterministically
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for StdRandom {
    fn next_u64(&self) -> u64 {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_u64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::environment::SilentPlayer;

    #[test]
    fn test_seeded_production_environment_is_reproducible() {
        let config = CounterConfig::default().with_seed(11);
        let a = CounterEnvironment::production(&config, Arc::new(SilentPlayer));
        let b = CounterEnvironment::production(&config, Arc::new(SilentPlayer));

        let first: Vec<u64> = (0..4).map(|_| a.random.next_u64()).collect();
        let second: Vec<u64> = (0..4).map(|_| b.random.next_u64()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_entropy_source_produces_fractions() {
        let random = StdRandom::from_entropy();
        for _ in 0..100 {
            let value = random.next_f64();
            assert!((0.0..1.0).contains(&value));
        }
    }
}
