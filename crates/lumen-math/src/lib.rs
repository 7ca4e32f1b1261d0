#![warn(missing_docs)]

//! Math types for the lumen renderer.
//!
//! Thin wrappers around nalgebra providing the handful of domain types the
//! geometry and acceleration crates share: points, vectors, axes, rays,
//! axis-aligned bounding boxes, and the directed float64 → float32
//! rounding used when bounds are stored at reduced precision.

mod aabb;
pub mod precision;
mod ray;

pub use aabb::Aabb;
pub use ray::Ray;

use nalgebra::Vector3;

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// One of the three coordinate axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// The X axis.
    X,
    /// The Y axis.
    Y,
    /// The Z axis.
    Z,
}

impl Axis {
    /// All axes in index order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Pick an axis from a sample in `[0, 1)`: `floor(3 * sample)`.
    ///
    /// Samples outside the unit interval (including NaN) are clamped onto
    /// the nearest valid axis rather than rejected.
    pub fn from_unit(sample: f64) -> Self {
        let scaled = (3.0 * sample).floor();
        if scaled >= 2.0 {
            Axis::Z
        } else if scaled >= 1.0 {
            Axis::Y
        } else {
            Axis::X
        }
    }

    /// Index of this axis (0, 1 or 2).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// The component of `p` along this axis.
    #[inline]
    pub fn of(self, p: &Point3) -> f64 {
        p[self.index()]
    }
}
