//! Placement and coloring of new markers.

use crate::types::{Color, Position, Viewport};
use tally_core::environment::RandomSource;

/// Default marker diameter in device-independent pixels
pub const DEFAULT_MARKER_DIAMETER: f64 = 40.0;

/// Generates positions and colors for markers of a fixed diameter
///
/// Stateless apart from the diameter; all randomness comes from the
/// [`RandomSource`] passed in, so a seeded source gives reproducible layouts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionAllocator {
    diameter: f64,
}

impl PositionAllocator {
    /// Create an allocator for markers of `diameter`
    ///
    /// Negative or non-finite diameters are treated as 0.
    #[must_use]
    pub fn new(diameter: f64) -> Self {
        let diameter = if diameter.is_finite() { diameter.max(0.0) } else { 0.0 };
        Self { diameter }
    }

    /// Marker diameter
    #[must_use]
    pub const fn diameter(&self) -> f64 {
        self.diameter
    }

    /// Uniformly random position that keeps the whole marker inside `viewport`
    ///
    /// When the viewport is smaller than one marker along an axis, that
    /// coordinate is 0.
    #[must_use]
    pub fn position(&self, viewport: Viewport, random: &dyn RandomSource) -> Position {
        let x = random.next_f64() * viewport.max_x(self.diameter);
        let y = random.next_f64() * viewport.max_y(self.diameter);
        self.clamp(Position::new(x, y), viewport)
    }

    /// Uniformly random 24-bit color
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // masked to 24 bits first
    pub fn color(&self, random: &dyn RandomSource) -> Color {
        Color::from_rgb((random.next_u64() & u64::from(Color::MAX)) as u32)
    }

    /// Project `position` into the bounds `viewport` allows
    #[must_use]
    pub fn clamp(&self, position: Position, viewport: Viewport) -> Position {
        Position::new(
            clamp_axis(position.x, viewport.max_x(self.diameter)),
            clamp_axis(position.y, viewport.max_y(self.diameter)),
        )
    }
}

impl Default for PositionAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER_DIAMETER)
    }
}

fn clamp_axis(value: f64, max: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, max) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_testing::{ScriptedRandom, SeededRandom};

    #[test]
    fn test_position_stays_in_bounds() {
        let allocator = PositionAllocator::default();
        let viewport = Viewport::new(300.0, 200.0);
        let random = SeededRandom::new(1);

        for _ in 0..1_000 {
            let position = allocator.position(viewport, &random);
            assert!(viewport.contains(position, allocator.diameter()));
        }
    }

    #[test]
    fn test_position_extremes() {
        let allocator = PositionAllocator::default();
        let viewport = Viewport::new(240.0, 140.0);

        let low = allocator.position(viewport, &ScriptedRandom::new([0]));
        assert_eq!(low, Position::new(0.0, 0.0));

        let high = allocator.position(viewport, &ScriptedRandom::new([u64::MAX]));
        assert!(high.x <= 200.0 && high.x > 199.9);
        assert!(high.y <= 100.0 && high.y > 99.9);
    }

    #[test]
    fn test_position_in_tiny_viewport_is_origin() {
        let allocator = PositionAllocator::default();
        let viewport = Viewport::new(10.0, 10.0);
        let position = allocator.position(viewport, &ScriptedRandom::new([u64::MAX]));
        assert_eq!(position, Position::new(0.0, 0.0));
    }

    #[test]
    fn test_color_is_masked_to_24_bits() {
        let allocator = PositionAllocator::default();
        let color = allocator.color(&ScriptedRandom::new([0xdead_beef_0000_0a0b]));
        assert_eq!(color.to_string(), "#000a0b");
    }

    #[test]
    fn test_seeded_allocation_is_reproducible() {
        let allocator = PositionAllocator::default();
        let viewport = Viewport::new(800.0, 600.0);
        let a = SeededRandom::new(99);
        let b = SeededRandom::new(99);

        for _ in 0..16 {
            assert_eq!(allocator.position(viewport, &a), allocator.position(viewport, &b));
            assert_eq!(allocator.color(&a), allocator.color(&b));
        }
    }

    #[test]
    fn test_clamp() {
        let allocator = PositionAllocator::default();
        let viewport = Viewport::new(100.0, 100.0);
        assert_eq!(
            allocator.clamp(Position::new(190.0, 10.0), viewport),
            Position::new(60.0, 10.0)
        );
        assert_eq!(
            allocator.clamp(Position::new(-3.0, f64::NAN), viewport),
            Position::new(0.0, 0.0)
        );
    }

    #[test]
    fn test_invalid_diameter() {
        assert!(PositionAllocator::new(-1.0).diameter().abs() < f64::EPSILON);
        assert!(PositionAllocator::new(f64::INFINITY).diameter().abs() < f64::EPSILON);
    }
}
