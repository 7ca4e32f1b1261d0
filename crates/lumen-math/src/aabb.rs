//! Axis-aligned bounding boxes.

use std::cmp::Ordering;

use crate::{Axis, Point3, Ray};

/// Axis-aligned bounding box in 3D.
///
/// A well-formed box has `min <= max` componentwise; [`Aabb::empty`] is the
/// one deliberate exception, an inverted box that acts as the identity for
/// [`Aabb::union`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Aabb {
    /// Create an AABB from min and max corners.
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Create the smallest AABB holding two arbitrary corner points.
    pub fn from_corners(a: Point3, b: Point3) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Create an empty (inverted) AABB suitable for expansion.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Componentwise union of two boxes.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: Point3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Point3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    /// Expand this AABB to include a point.
    pub fn include_point(&mut self, p: &Point3) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Expand the AABB by a tolerance in all directions.
    pub fn expand(&mut self, tol: f64) {
        self.min.x -= tol;
        self.min.y -= tol;
        self.min.z -= tol;
        self.max.x += tol;
        self.max.y += tol;
        self.max.z += tol;
    }

    /// True if `min <= max` on every axis.
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// True if `other` lies entirely inside this box (touching counts).
    pub fn contains(&self, other: &Aabb) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.min.z <= other.min.z
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
            && self.max.z >= other.max.z
    }

    /// Centre of the box.
    pub fn centroid(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Sort key ordering: compares minimum corners along `axis`.
    ///
    /// Uses a total order so that NaN coordinates cannot break a sort.
    pub fn cmp_on_axis(&self, other: &Aabb, axis: Axis) -> Ordering {
        axis.of(&self.min).total_cmp(&axis.of(&other.min))
    }

    /// Strict "less than" along `axis`, as used when sorting primitives.
    pub fn less_on_axis(&self, other: &Aabb, axis: Axis) -> bool {
        self.cmp_on_axis(other, axis) == Ordering::Less
    }

    /// Slab test: does `ray` pass through the box for some `t` in
    /// `[t_min, t_max]`?
    pub fn hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> bool {
        match ray.intersect_aabb(self) {
            Some((entry, exit)) => entry.max(t_min) <= exit.min(t_max),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vec3;

    fn unit_box() -> Aabb {
        Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_union() {
        let a = unit_box();
        let b = Aabb::new(Point3::new(-1.0, 0.5, 0.5), Point3::new(0.5, 2.0, 0.75));
        let u = a.union(&b);
        assert_eq!(u.min, Point3::new(-1.0, 0.0, 0.0));
        assert_eq!(u.max, Point3::new(1.0, 2.0, 1.0));
        assert!(u.contains(&a));
        assert!(u.contains(&b));
    }

    #[test]
    fn test_empty_is_union_identity() {
        let a = unit_box();
        assert_eq!(Aabb::empty().union(&a), a);
        assert!(!Aabb::empty().is_valid());
    }

    #[test]
    fn test_from_corners_orders_components() {
        let b = Aabb::from_corners(Point3::new(1.0, -1.0, 3.0), Point3::new(-1.0, 1.0, 2.0));
        assert_eq!(b.min, Point3::new(-1.0, -1.0, 2.0));
        assert_eq!(b.max, Point3::new(1.0, 1.0, 3.0));
        assert!(b.is_valid());
    }

    #[test]
    fn test_less_on_axis() {
        let a = unit_box();
        let b = Aabb::new(Point3::new(2.0, -1.0, 0.0), Point3::new(3.0, 0.0, 1.0));
        assert!(a.less_on_axis(&b, Axis::X));
        assert!(!a.less_on_axis(&b, Axis::Y));
        assert!(!a.less_on_axis(&b, Axis::Z));
        assert!(!b.less_on_axis(&a, Axis::Z));
    }

    #[test]
    fn test_hit_within_interval() {
        let ray = Ray::new(Point3::new(-5.0, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
        assert!(unit_box().hit(&ray, 0.0, 100.0));
        // Box lies at t in [5, 6]
        assert!(!unit_box().hit(&ray, 0.0, 4.9));
        assert!(!unit_box().hit(&ray, 6.1, 100.0));
        assert!(unit_box().hit(&ray, 5.5, 5.6));
    }

    #[test]
    fn test_hit_axis_parallel_on_face() {
        // Ray runs inside the plane x = 0, which is a face of the box.
        let ray = Ray::new(Point3::new(0.0, 0.5, -5.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(unit_box().hit(&ray, 0.0, 100.0));
    }

    #[test]
    fn test_hit_behind_origin() {
        let ray = Ray::new(Point3::new(-5.0, 0.5, 0.5), Vec3::new(-1.0, 0.0, 0.0));
        assert!(!unit_box().hit(&ray, 0.0, f64::INFINITY));
    }
}
