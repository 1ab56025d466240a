//! Grid positions and hex coordinate helpers.
//!
//! The world is a square grid of hexes in offset layout: odd rows are
//! shifted half a cell to the right of even rows. Positions are plain integer
//! pairs; the axial form is only used for direction arithmetic.

use std::ops::{Add, Div, Mul, Sub};

use serde::{Deserialize, Serialize};

use crate::codec::{Decode, Decoder, Encode, Encoder};
use crate::error::CodecError;

/// A cell position on the offset grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Position {
    /// The grid origin.
    pub const ORIGIN: Self = Self::new(0, 0);

    /// Create a position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared euclidean distance to `other`.
    #[must_use]
    pub const fn squared_distance(self, other: Self) -> i32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Convert to axial coordinates.
    #[must_use]
    pub const fn to_axial(self) -> Axial {
        Axial {
            q: self.x - (self.y - (self.y & 1)) / 2,
            r: self.y,
        }
    }

    /// The cell on the far side of `through`, seen from `self`.
    #[must_use]
    pub const fn opposite_neighbor(self, through: Self) -> Self {
        let from = self.to_axial();
        let mid = through.to_axial();
        Axial {
            q: mid.q + (mid.q - from.q),
            r: mid.r + (mid.r - from.r),
        }
        .to_offset()
    }
}

impl Add for Position {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Position {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<i32> for Position {
    type Output = Self;

    fn mul(self, rhs: i32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<i32> for Position {
    type Output = Self;

    fn div(self, rhs: i32) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl Div for Position {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        Self::new(self.x / rhs.x, self.y / rhs.y)
    }
}

impl Encode for Position {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CodecError> {
        enc.put_i32(self.x);
        enc.put_i32(self.y);
        Ok(())
    }
}

impl Decode for Position {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self::new(dec.get_i32()?, dec.get_i32()?))
    }
}

/// Axial hex coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Axial {
    /// Column axis.
    pub q: i32,
    /// Row axis.
    pub r: i32,
}

impl Axial {
    /// Convert back to offset coordinates.
    #[must_use]
    pub const fn to_offset(self) -> Position {
        Position::new(self.q + (self.r - (self.r & 1)) / 2, self.r)
    }
}

/// `round(sin(d) * 100)` for whole degrees 0..=90.
const QUARTER_SINE: [i32; 91] = [
    0, 2, 3, 5, 7, 9, 10, 12, 14, 16, 17, 19, 21, 22, 24, 26, 28, 29, 31, 33, 34, 36, 37, 39, 41,
    42, 44, 45, 47, 48, 50, 52, 53, 54, 56, 57, 59, 60, 62, 63, 64, 66, 67, 68, 69, 71, 72, 73,
    74, 75, 77, 78, 79, 80, 81, 82, 83, 84, 85, 86, 87, 87, 88, 89, 90, 91, 91, 92, 93, 93, 94,
    95, 95, 96, 96, 97, 97, 97, 98, 98, 98, 99, 99, 99, 99, 100, 100, 100, 100, 100, 100,
];

/// Sine of `degrees` scaled to the range -100..=100.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub const fn sine_percent(degrees: i32) -> i32 {
    // Index is always within 0..=90 after folding.
    let d = degrees.rem_euclid(360);
    match d {
        0..=90 => QUARTER_SINE[d as usize],
        91..=180 => QUARTER_SINE[(180 - d) as usize],
        181..=270 => -QUARTER_SINE[(d - 180) as usize],
        _ => -QUARTER_SINE[(360 - d) as usize],
    }
}

/// Cosine of `degrees` scaled to the range -100..=100.
#[must_use]
pub const fn cosine_percent(degrees: i32) -> i32 {
    sine_percent(degrees + 90)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operators() {
        let a = Position::new(4, 6);
        let b = Position::new(1, 2);
        assert_eq!(a + b, Position::new(5, 8));
        assert_eq!(a - b, Position::new(3, 4));
        assert_eq!(a * 3, Position::new(12, 18));
        assert_eq!(a / 2, Position::new(2, 3));
        assert_eq!(a / Position::new(2, 3), Position::new(2, 2));
    }

    #[test]
    fn test_squared_distance() {
        assert_eq!(Position::new(3, 4).squared_distance(Position::ORIGIN), 25);
        assert_eq!(Position::new(-1, -1).squared_distance(Position::new(1, 1)), 8);
    }

    #[test]
    fn test_axial_round_trip() {
        for y in 0..8 {
            for x in 0..8 {
                let p = Position::new(x, y);
                assert_eq!(p.to_axial().to_offset(), p);
            }
        }
    }

    #[test]
    fn test_opposite_neighbor_same_row() {
        let from = Position::new(2, 3);
        let through = Position::new(3, 3);
        assert_eq!(from.opposite_neighbor(through), Position::new(4, 3));
    }

    #[test]
    fn test_opposite_neighbor_across_rows() {
        // Moving down-right twice from an odd row lands two rows down, one column right.
        let from = Position::new(2, 1);
        let through = Position::new(3, 2);
        assert_eq!(from.opposite_neighbor(through), Position::new(3, 3));
    }

    #[test]
    fn test_trig_quadrants() {
        assert_eq!(sine_percent(0), 0);
        assert_eq!(sine_percent(90), 100);
        assert_eq!(sine_percent(180), 0);
        assert_eq!(sine_percent(270), -100);
        assert_eq!(sine_percent(360), 0);
        assert_eq!(sine_percent(30), 50);
        assert_eq!(sine_percent(210), -50);
        assert_eq!(cosine_percent(0), 100);
        assert_eq!(cosine_percent(180), -100);
        assert_eq!(cosine_percent(60), 50);
    }
}
