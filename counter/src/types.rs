//! Domain types for the marker counter.
//!
//! The tally and the marker collection are two views of the same number: one
//! marker per unit of tally. [`EngineState`] holds both, plus the transient
//! UI signals, and is only ever changed by the
//! [`CounterEngine`](crate::CounterEngine) reducer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use thiserror::Error;

/// Unique identifier for a marker
///
/// Assigned from a monotonically increasing counter and never reused, even
/// after the marker is removed or the counter is reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(u64);

impl MarkerId {
    /// Wrap a raw id
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw id value
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for MarkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Top-left corner of a marker, in device-independent pixels
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Distance from the left edge
    pub x: f64,
    /// Distance from the top edge
    pub y: f64,
}

impl Position {
    /// Create a position
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Size of the visible drawing area
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in device-independent pixels
    pub width: f64,
    /// Height in device-independent pixels
    pub height: f64,
}

impl Viewport {
    /// Create a viewport
    ///
    /// Negative or non-finite dimensions are treated as 0, so a bogus resize
    /// notification can never produce bounds that markers cannot satisfy.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: sanitize_dimension(width),
            height: sanitize_dimension(height),
        }
    }

    /// Largest x a marker of `diameter` may take
    #[must_use]
    pub fn max_x(&self, diameter: f64) -> f64 {
        (self.width - diameter).max(0.0)
    }

    /// Largest y a marker of `diameter` may take
    #[must_use]
    pub fn max_y(&self, diameter: f64) -> f64 {
        (self.height - diameter).max(0.0)
    }

    /// Whether a marker of `diameter` at `position` is fully inside
    #[must_use]
    pub fn contains(&self, position: Position, diameter: f64) -> bool {
        (0.0..=self.max_x(diameter)).contains(&position.x)
            && (0.0..=self.max_y(diameter)).contains(&position.y)
    }
}

fn sanitize_dimension(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

/// 24-bit RGB display color
///
/// Always rendered as `#` followed by exactly six lowercase hex digits;
/// small values are zero-padded (`0x000a0b` is `#000a0b`, not `#a0b`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Color(u32);

impl Color {
    /// Largest representable color value
    pub const MAX: u32 = 0x00FF_FFFF;

    /// Create a color from a packed `0xRRGGBB` value (upper bits are dropped)
    #[must_use]
    pub const fn from_rgb(rgb: u32) -> Self {
        Self(rgb & Self::MAX)
    }

    /// Packed `0xRRGGBB` value
    #[must_use]
    pub const fn rgb(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

impl std::fmt::Debug for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Color({self})")
    }
}

/// Error returned when parsing a [`Color`] from text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color {0:?}: expected '#' followed by six hex digits")]
pub struct ParseColorError(String);

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix('#')
            .filter(|digits| digits.len() == 6)
            .ok_or_else(|| ParseColorError(s.to_string()))?;
        u32::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|_| ParseColorError(s.to_string()))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl TryFrom<String> for Color {
    type Error = ParseColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A clickable, positioned, colored unit of tally
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Unique identifier
    pub id: MarkerId,
    /// Top-left corner, always inside the current viewport
    pub position: Position,
    /// Fill color
    pub color: Color,
    /// 1-based rank at creation time, for numbered displays
    pub sequence_number: u32,
}

/// Outcome of consuming the sound trigger
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SoundTrigger {
    /// A removal happened since the last consumption: play the sound once
    Fire,
    /// Nothing to play
    NoOp,
}

impl SoundTrigger {
    /// Whether the sound should be played
    #[must_use]
    pub const fn fires(self) -> bool {
        matches!(self, Self::Fire)
    }

    /// Trigger implied by a `ConsumeSoundTrigger` command that turned `before` into `after`
    #[must_use]
    pub const fn between(before: &EngineState, after: &EngineState) -> Self {
        if before.sound_pending && !after.sound_pending {
            Self::Fire
        } else {
            Self::NoOp
        }
    }
}

/// A broken engine invariant
///
/// Never expected at runtime; seeing one means the engine has a bug.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    /// The tally and the number of markers disagree
    #[error("tally {tally} does not match {markers} markers")]
    TallyMismatch {
        /// Tally value
        tally: u32,
        /// Number of markers
        markers: usize,
    },

    /// Two markers share an id
    #[error("marker id {0} appears more than once")]
    DuplicateId(MarkerId),

    /// A marker carries an id that was never handed out
    #[error("marker id {id} was never assigned (next id is {next_id})")]
    UnassignedId {
        /// Offending id
        id: MarkerId,
        /// Id the next marker would have received
        next_id: u64,
    },

    /// A marker lies (partly) outside the viewport
    #[error("marker {id} at ({x}, {y}) lies outside the viewport")]
    OutOfBounds {
        /// Offending marker
        id: MarkerId,
        /// Its x coordinate
        x: f64,
        /// Its y coordinate
        y: f64,
    },
}

/// Authoritative state of the counter
///
/// Published to readers as immutable `Arc` snapshots; the runtime copies it
/// before every command, so a snapshot never changes after it was handed out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    /// Bumped once for every command that changed the state
    pub version: u64,
    /// Displayed counter value, always equal to `markers.len()`
    pub tally: u32,
    /// Markers in creation order
    pub markers: Vec<Marker>,
    /// Whether the onboarding message is shown
    pub message_visible: bool,
    /// Set by a marker removal until the sound trigger is consumed
    pub sound_pending: bool,
    /// Current drawing area
    pub viewport: Viewport,
    /// Id the next created marker receives (starts at 1, only ever grows)
    pub next_id: u64,
    /// When the session started, from the injected clock
    pub started_at: Option<DateTime<Utc>>,
}

impl EngineState {
    /// State at session start
    #[must_use]
    pub const fn new(viewport: Viewport) -> Self {
        Self {
            version: 0,
            tally: 0,
            markers: Vec::new(),
            message_visible: true,
            sound_pending: false,
            viewport,
            next_id: 1,
            started_at: None,
        }
    }

    /// Whether there are no markers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Whether a decrement would remove anything (drives the "-" button)
    #[must_use]
    pub const fn can_decrement(&self) -> bool {
        self.tally > 0
    }

    /// Look up a marker by id
    #[must_use]
    pub fn marker(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.iter().find(|marker| marker.id == id)
    }

    /// Most recently added marker
    #[must_use]
    pub fn last_marker(&self) -> Option<&Marker> {
        self.markers.last()
    }

    /// Clear the sound trigger, reporting whether it was set
    pub const fn consume_sound_trigger(&mut self) -> SoundTrigger {
        if self.sound_pending {
            self.sound_pending = false;
            SoundTrigger::Fire
        } else {
            SoundTrigger::NoOp
        }
    }

    /// Check every engine invariant for markers of `diameter`
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] found.
    pub fn check_invariants(&self, diameter: f64) -> Result<(), InvariantViolation> {
        if usize::try_from(self.tally).ok() != Some(self.markers.len()) {
            return Err(InvariantViolation::TallyMismatch {
                tally: self.tally,
                markers: self.markers.len(),
            });
        }

        let mut seen = HashSet::with_capacity(self.markers.len());
        for marker in &self.markers {
            if !seen.insert(marker.id) {
                return Err(InvariantViolation::DuplicateId(marker.id));
            }
            if marker.id.get() == 0 || marker.id.get() >= self.next_id {
                return Err(InvariantViolation::UnassignedId {
                    id: marker.id,
                    next_id: self.next_id,
                });
            }
            if !self.viewport.contains(marker.position, diameter) {
                return Err(InvariantViolation::OutOfBounds {
                    id: marker.id,
                    x: marker.position.x,
                    y: marker.position.y,
                });
            }
        }

        Ok(())
    }
}

/// Every command the presentation layer, a timer or an observer can issue
#[derive(Clone, Debug, PartialEq)]
pub enum CounterAction {
    /// Session bootstrap: stamps the start time and arms the onboarding timer
    SessionStarted,
    /// Add one marker and bump the tally
    Increment,
    /// Remove the most recently added marker (no-op at zero)
    Decrement,
    /// Remove a specific marker, e.g. after a click (no-op for unknown ids)
    RemoveMarker {
        /// Marker to remove
        id: MarkerId,
    },
    /// Remove every marker
    Reset,
    /// Hide the onboarding message
    DismissMessage,
    /// Clear the sound trigger, playing the sound if it was set
    ConsumeSoundTrigger,
    /// The drawing area was resized
    ViewportChanged {
        /// New width
        width: f64,
        /// New height
        height: f64,
    },
}
