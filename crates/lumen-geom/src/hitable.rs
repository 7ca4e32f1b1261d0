//! The primitive capability contract.

use lumen_math::{Aabb, Point3, Ray, Vec3};
use rand::RngCore;

/// Handle to an entry of the renderer's material table.
///
/// Geometry only carries the handle; shading happens elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialRef {
    /// Index into the material table.
    pub id: u32,
    /// Whether the material emits light.
    pub emissive: bool,
}

impl MaterialRef {
    /// A non-emissive material handle.
    pub fn new(id: u32) -> Self {
        Self { id, emissive: false }
    }

    /// An emissive material handle.
    pub fn emissive(id: u32) -> Self {
        Self { id, emissive: true }
    }
}

/// Result of a successful ray-primitive intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRecord {
    /// Parameter along the ray where intersection occurs.
    pub t: f64,
    /// Surface parameter u.
    pub u: f64,
    /// Surface parameter v.
    pub v: f64,
    /// 3D intersection point.
    pub point: Point3,
    /// Unit surface normal at the intersection.
    pub normal: Vec3,
}

impl HitRecord {
    /// Create a new hit record.
    pub fn new(t: f64, u: f64, v: f64, point: Point3, normal: Vec3) -> Self {
        Self {
            t,
            u,
            v,
            point,
            normal,
        }
    }
}

/// Anything a ray can be intersected with.
///
/// This is the whole surface the acceleration structures depend on, so it is
/// implemented by leaf geometry and by aggregates alike.
pub trait Hitable: Send + Sync + std::fmt::Debug {
    /// Bounds of the primitive over the shutter interval `[time0, time1]`.
    ///
    /// `None` means the extent is unknown or unbounded; such a primitive
    /// cannot be placed in a hierarchy.
    fn bounding_box(&self, time0: f64, time1: f64) -> Option<Aabb>;

    /// Nearest intersection with `t` in `(t_min, t_max)`.
    fn hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<(HitRecord, MaterialRef)>;

    /// Nearest intersection, plus whether that point lies on an edge or
    /// silhouette of the primitive. Used by the wireframe sampler.
    fn hit_edge(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<(HitRecord, bool)>;
}

/// Geometry that can be importance sampled as a light source.
pub trait Sampleable: Hitable {
    /// Probability density of sampling `direction` from `origin`, with
    /// respect to solid angle.
    fn pdf_value(&self, origin: &Point3, direction: &Vec3) -> f64;

    /// A random (unnormalized) direction from `origin` toward the primitive.
    fn random_direction(&self, origin: &Point3, rng: &mut dyn RngCore) -> Vec3;

    /// Whether the primitive's material emits light.
    fn is_emitter(&self) -> bool;
}
