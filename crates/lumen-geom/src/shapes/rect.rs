//! Axis-aligned rectangles, the building block of boxes and area lights.

use lumen_math::{Aabb, Axis, Point3, Ray, Vec3};
use rand::{Rng, RngCore};

use crate::{HitRecord, Hitable, MaterialRef, Sampleable};

/// Half-thickness of a rectangle's box along its normal axis.
const PLANE_PAD: f64 = 1e-4;

/// Distance from the border still reported as an edge hit.
const EDGE_TOLERANCE: f64 = 1e-3;

/// The coordinate plane a rectangle lies in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RectPlane {
    /// Spans X and Y; constant Z.
    XY,
    /// Spans X and Z; constant Y.
    XZ,
    /// Spans Y and Z; constant X.
    YZ,
}

impl RectPlane {
    /// The two spanned axes followed by the normal axis.
    pub fn axes(self) -> (Axis, Axis, Axis) {
        match self {
            RectPlane::XY => (Axis::X, Axis::Y, Axis::Z),
            RectPlane::XZ => (Axis::X, Axis::Z, Axis::Y),
            RectPlane::YZ => (Axis::Y, Axis::Z, Axis::X),
        }
    }
}

/// A rectangle `[a0, a1] x [b0, b1]` in a coordinate plane at offset `k`.
///
/// The normal points along the positive normal axis; wrap in
/// [`FlipNormals`](super::FlipNormals) for the opposite face.
#[derive(Debug, Clone)]
pub struct AxisRect {
    plane: RectPlane,
    a0: f64,
    a1: f64,
    b0: f64,
    b1: f64,
    k: f64,
    material: MaterialRef,
}

impl AxisRect {
    /// Create a rectangle. Bounds along each spanned axis may be given in
    /// either order.
    pub fn new(
        plane: RectPlane,
        (a0, a1): (f64, f64),
        (b0, b1): (f64, f64),
        k: f64,
        material: MaterialRef,
    ) -> Self {
        Self {
            plane,
            a0: a0.min(a1),
            a1: a0.max(a1),
            b0: b0.min(b1),
            b1: b0.max(b1),
            k,
            material,
        }
    }

    /// The plane this rectangle lies in.
    pub fn plane(&self) -> RectPlane {
        self.plane
    }

    /// Area of the rectangle.
    pub fn area(&self) -> f64 {
        (self.a1 - self.a0) * (self.b1 - self.b0)
    }

    fn point(&self, a: f64, b: f64) -> Point3 {
        let (axis_a, axis_b, axis_k) = self.plane.axes();
        let mut p = Point3::origin();
        p[axis_a.index()] = a;
        p[axis_b.index()] = b;
        p[axis_k.index()] = self.k;
        p
    }

    fn normal(&self) -> Vec3 {
        let mut n = Vec3::zeros();
        n[self.plane.axes().2.index()] = 1.0;
        n
    }
}

impl Hitable for AxisRect {
    fn bounding_box(&self, _time0: f64, _time1: f64) -> Option<Aabb> {
        let (_, _, axis_k) = self.plane.axes();
        let mut min = self.point(self.a0, self.b0);
        let mut max = self.point(self.a1, self.b1);
        min[axis_k.index()] -= PLANE_PAD;
        max[axis_k.index()] += PLANE_PAD;
        Some(Aabb::new(min, max))
    }

    fn hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<(HitRecord, MaterialRef)> {
        let (axis_a, axis_b, axis_k) = self.plane.axes();
        let t = (self.k - axis_k.of(&ray.origin)) / ray.direction[axis_k.index()];
        if t.is_nan() || t < t_min || t > t_max {
            return None;
        }

        let a = axis_a.of(&ray.origin) + t * ray.direction[axis_a.index()];
        let b = axis_b.of(&ray.origin) + t * ray.direction[axis_b.index()];
        if a < self.a0 || a > self.a1 || b < self.b0 || b > self.b1 {
            return None;
        }

        let u = (a - self.a0) / (self.a1 - self.a0);
        let v = (b - self.b0) / (self.b1 - self.b0);
        let rec = HitRecord::new(t, u, v, ray.at(t), self.normal());
        Some((rec, self.material))
    }

    fn hit_edge(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<(HitRecord, bool)> {
        let (rec, _) = self.hit(ray, t_min, t_max)?;
        let (axis_a, axis_b, _) = self.plane.axes();
        let a = axis_a.of(&rec.point);
        let b = axis_b.of(&rec.point);
        let border = (a - self.a0)
            .min(self.a1 - a)
            .min(b - self.b0)
            .min(self.b1 - b);
        Some((rec, border <= EDGE_TOLERANCE))
    }
}

impl Sampleable for AxisRect {
    fn pdf_value(&self, origin: &Point3, direction: &Vec3) -> f64 {
        let probe = Ray::new(*origin, *direction);
        let Some((rec, _)) = self.hit(&probe, 0.001, f64::MAX) else {
            return 0.0;
        };
        let dist_sq = rec.t * rec.t * direction.norm_squared();
        let cosine = (direction.dot(&rec.normal) / direction.norm()).abs();
        let area = self.area();
        if cosine == 0.0 || area == 0.0 {
            return 0.0;
        }
        dist_sq / (cosine * area)
    }

    fn random_direction(&self, origin: &Point3, rng: &mut dyn RngCore) -> Vec3 {
        let a = self.a0 + rng.gen::<f64>() * (self.a1 - self.a0);
        let b = self.b0 + rng.gen::<f64>() * (self.b1 - self.b0);
        self.point(a, b) - origin
    }

    fn is_emitter(&self) -> bool {
        self.material.emissive
    }
}
