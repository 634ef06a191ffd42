//! Geometry
//!
//! Planar positions and Euclidean distances.

use serde::{Deserialize, Serialize};

/// A point in the simulated square region.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Position scaled by `factor` on both axes.
    pub fn scaled(&self, factor: f64) -> Position {
        Position::new(self.x * factor, self.y * factor)
    }
}

/// Diagonal of a square with side `side`.
pub fn diagonal(side: f64) -> f64 {
    side * std::f64::consts::SQRT_2
}
