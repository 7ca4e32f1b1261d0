//! Concrete primitives and primitive wrappers.
//!
//! Every type here implements [`Hitable`](crate::Hitable); the ones that can
//! act as area lights also implement [`Sampleable`](crate::Sampleable).

mod list;
mod rect;
mod sphere;
mod transform;
mod triangle;

pub use list::HitableList;
pub use rect::{AxisRect, RectPlane};
pub use sphere::Sphere;
pub use transform::{FlipNormals, Translate};
pub use triangle::Triangle;

use lumen_math::{Point3, Vec3};

/// Orthonormal basis with `w` along a given direction.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Onb {
    u: Vec3,
    v: Vec3,
    w: Vec3,
}

impl Onb {
    pub(crate) fn from_w(direction: &Vec3) -> Self {
        let w = direction.normalize();
        let a = if w.x.abs() > 0.9 { Vec3::y() } else { Vec3::x() };
        let v = w.cross(&a).normalize();
        let u = w.cross(&v);
        Self { u, v, w }
    }

    pub(crate) fn local(&self, a: f64, b: f64, c: f64) -> Vec3 {
        a * self.u + b * self.v + c * self.w
    }
}

/// Whether `p` lies within `tol` of the segment `a`-`b`.
pub(crate) fn near_segment(p: &Point3, a: &Point3, b: &Point3, tol: f64) -> bool {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    let s = if len_sq > 0.0 {
        ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (p - (a + s * ab)).norm() <= tol
}
