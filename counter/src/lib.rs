//! # Marker Counter
//!
//! An on-screen counter whose tally moves in lockstep with a collection of
//! colored, clickable markers scattered across the viewport.
//!
//! The crate is the state-synchronization engine behind such a widget:
//! - [`CounterEngine`] is the reducer owning every transition
//! - [`PositionAllocator`] places and colors new markers
//! - [`Session`] hosts the engine in a [`tally_runtime::Store`], arms the
//!   onboarding timer and forwards viewport changes
//! - [`terminal`] is a small line-oriented front end used by the binary
//!
//! ## Invariants
//!
//! At every published snapshot:
//! 1. `tally == markers.len()`
//! 2. Marker ids are unique and never reused, even across resets
//! 3. Every marker lies fully inside the viewport (bounds collapse to 0 when
//!    the viewport is smaller than a marker)
//! 4. The tally never goes below zero
//!
//! ## Example
//!
//! ```no_run
//! use marker_counter::{CounterConfig, CounterEnvironment, Session};
//! use std::sync::Arc;
//! use tally_core::environment::SilentPlayer;
//!
//! # async fn example() -> Result<(), tally_runtime::StoreError> {
//! let config = CounterConfig::default().with_seed(7);
//! let env = CounterEnvironment::production(&config, Arc::new(SilentPlayer));
//! let session = Session::start(&config, env).await?;
//!
//! session.increment().await?;
//! let state = session.increment().await?;
//! assert_eq!(state.tally, 2);
//!
//! session.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod allocator;
pub mod config;
pub mod environment;
pub mod reducer;
pub mod session;
pub mod terminal;
pub mod types;

pub use allocator::{DEFAULT_MARKER_DIAMETER, PositionAllocator};
pub use config::{ConfigError, CounterConfig};
pub use environment::{CounterEnvironment, StdRandom};
pub use reducer::{CounterEngine, ONBOARDING_TIMER, VIEWPORT_OBSERVER};
pub use session::{CounterStore, Session};
pub use types::{
    Color, CounterAction, EngineState, InvariantViolation, Marker, MarkerId, ParseColorError,
    Position, SoundTrigger, Viewport,
};
