//! Counter configuration
//!
//! Every setting has a default and can be overridden through an environment
//! variable:
//!
//! | Variable | Default |
//! |---|---|
//! | `COUNTER_MARKER_DIAMETER` | `40` |
//! | `COUNTER_MESSAGE_TIMEOUT_MS` | `5000` |
//! | `COUNTER_VIEWPORT_WIDTH` | `1280` |
//! | `COUNTER_VIEWPORT_HEIGHT` | `720` |
//! | `COUNTER_SEED` | unset (entropy) |
//!
//! # Example
//!
//! ```no_run
//! use marker_counter::CounterConfig;
//!
//! # fn main() -> Result<(), marker_counter::ConfigError> {
//! let config = CounterConfig::try_from_env()?;
//! println!("marker diameter: {}", config.marker_diameter);
//! # Ok(())
//! # }
//! ```

use crate::allocator::DEFAULT_MARKER_DIAMETER;
use crate::types::Viewport;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Environment variable for the marker diameter
pub const ENV_MARKER_DIAMETER: &str = "COUNTER_MARKER_DIAMETER";
/// Environment variable for the onboarding message timeout, in milliseconds
pub const ENV_MESSAGE_TIMEOUT_MS: &str = "COUNTER_MESSAGE_TIMEOUT_MS";
/// Environment variable for the initial viewport width
pub const ENV_VIEWPORT_WIDTH: &str = "COUNTER_VIEWPORT_WIDTH";
/// Environment variable for the initial viewport height
pub const ENV_VIEWPORT_HEIGHT: &str = "COUNTER_VIEWPORT_HEIGHT";
/// Environment variable for the random seed
pub const ENV_SEED: &str = "COUNTER_SEED";

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable holds a value that does not parse
    #[error("{var}={value:?} is not a valid {expected}")]
    InvalidValue {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
        /// What was expected
        expected: &'static str,
    },

    /// Configuration validation failed
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// Marker counter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterConfig {
    /// Marker diameter in device-independent pixels
    pub marker_diameter: f64,
    /// How long the onboarding message stays up, in milliseconds
    pub message_timeout_ms: u64,
    /// Viewport size at session start
    pub initial_viewport: Viewport,
    /// Seed for reproducible marker layouts (`None` draws from entropy)
    pub seed: Option<u64>,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            marker_diameter: DEFAULT_MARKER_DIAMETER,
            message_timeout_ms: 5_000,
            initial_viewport: Viewport::new(1280.0, 720.0),
            seed: None,
        }
    }
}

impl CounterConfig {
    /// Set the marker diameter
    #[must_use]
    pub const fn with_marker_diameter(mut self, diameter: f64) -> Self {
        self.marker_diameter = diameter;
        self
    }

    /// Set the onboarding message timeout
    #[must_use]
    pub fn with_message_timeout(mut self, timeout: Duration) -> Self {
        self.message_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the viewport size at session start
    #[must_use]
    pub fn with_initial_viewport(mut self, width: f64, height: f64) -> Self {
        self.initial_viewport = Viewport::new(width, height);
        self
    }

    /// Seed the random source
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Onboarding message timeout as Duration
    #[must_use]
    pub const fn message_timeout(&self) -> Duration {
        Duration::from_millis(self.message_timeout_ms)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if the diameter is not a positive finite number.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.marker_diameter.is_finite() || self.marker_diameter <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "marker_diameter must be a positive number, got {}",
                self.marker_diameter
            )));
        }
        Ok(())
    }

    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set to a malformed value or the
    /// resulting configuration is invalid.
    pub fn try_from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from the process environment, falling back to
    /// defaults (with a warning) if anything is malformed
    #[must_use]
    pub fn from_env() -> Self {
        Self::try_from_env().unwrap_or_else(|error| {
            tracing::warn!(%error, "Ignoring counter configuration from environment");
            Self::default()
        })
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Same as [`CounterConfig::try_from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(diameter) = parse_var(&lookup, ENV_MARKER_DIAMETER, "number")? {
            config.marker_diameter = diameter;
        }
        if let Some(timeout_ms) = parse_var(&lookup, ENV_MESSAGE_TIMEOUT_MS, "millisecond count")? {
            config.message_timeout_ms = timeout_ms;
        }

        let width = parse_var(&lookup, ENV_VIEWPORT_WIDTH, "number")?;
        let height = parse_var(&lookup, ENV_VIEWPORT_HEIGHT, "number")?;
        config.initial_viewport = Viewport::new(
            width.unwrap_or(config.initial_viewport.width),
            height.unwrap_or(config.initial_viewport.height),
        );

        config.seed = parse_var(&lookup, ENV_SEED, "unsigned integer")?;

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str, expected: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let Some(value) = lookup(var) else {
        return Ok(None);
    };

    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidValue {
            var,
            value,
            expected,
        })
}
