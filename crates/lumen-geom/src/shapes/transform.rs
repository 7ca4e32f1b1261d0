//! Wrappers that change how an inner primitive is seen without copying it.

use std::sync::Arc;

use lumen_math::{Aabb, Point3, Ray, Vec3};
use rand::RngCore;

use crate::{HitRecord, Hitable, MaterialRef, Sampleable};

/// Reverses the normal reported by the inner primitive.
#[derive(Debug, Clone)]
pub struct FlipNormals<H: ?Sized = dyn Hitable> {
    inner: Arc<H>,
}

impl<H: ?Sized> FlipNormals<H> {
    /// Wrap `inner`.
    pub fn new(inner: Arc<H>) -> Self {
        Self { inner }
    }
}

impl<H: Hitable + ?Sized> Hitable for FlipNormals<H> {
    fn bounding_box(&self, time0: f64, time1: f64) -> Option<Aabb> {
        self.inner.bounding_box(time0, time1)
    }

    fn hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<(HitRecord, MaterialRef)> {
        let (mut rec, material) = self.inner.hit(ray, t_min, t_max)?;
        rec.normal = -rec.normal;
        Some((rec, material))
    }

    fn hit_edge(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<(HitRecord, bool)> {
        let (mut rec, on_edge) = self.inner.hit_edge(ray, t_min, t_max)?;
        rec.normal = -rec.normal;
        Some((rec, on_edge))
    }
}

impl<H: Sampleable + ?Sized> Sampleable for FlipNormals<H> {
    fn pdf_value(&self, origin: &Point3, direction: &Vec3) -> f64 {
        self.inner.pdf_value(origin, direction)
    }

    fn random_direction(&self, origin: &Point3, rng: &mut dyn RngCore) -> Vec3 {
        self.inner.random_direction(origin, rng)
    }

    fn is_emitter(&self) -> bool {
        self.inner.is_emitter()
    }
}

/// Moves the inner primitive by a fixed offset.
#[derive(Debug, Clone)]
pub struct Translate<H: ?Sized = dyn Hitable> {
    inner: Arc<H>,
    offset: Vec3,
}

impl<H: ?Sized> Translate<H> {
    /// Wrap `inner`, displaced by `offset`.
    pub fn new(inner: Arc<H>, offset: Vec3) -> Self {
        Self { inner, offset }
    }

    fn to_local(&self, ray: &Ray) -> Ray {
        Ray::with_time(ray.origin - self.offset, ray.direction, ray.time)
    }
}

impl<H: Hitable + ?Sized> Hitable for Translate<H> {
    fn bounding_box(&self, time0: f64, time1: f64) -> Option<Aabb> {
        let bbox = self.inner.bounding_box(time0, time1)?;
        Some(Aabb::new(bbox.min + self.offset, bbox.max + self.offset))
    }

    fn hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<(HitRecord, MaterialRef)> {
        let (mut rec, material) = self.inner.hit(&self.to_local(ray), t_min, t_max)?;
        rec.point += self.offset;
        Some((rec, material))
    }

    fn hit_edge(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<(HitRecord, bool)> {
        let (mut rec, on_edge) = self.inner.hit_edge(&self.to_local(ray), t_min, t_max)?;
        rec.point += self.offset;
        Some((rec, on_edge))
    }
}

impl<H: Sampleable + ?Sized> Sampleable for Translate<H> {
    fn pdf_value(&self, origin: &Point3, direction: &Vec3) -> f64 {
        self.inner.pdf_value(&(origin - self.offset), direction)
    }

    fn random_direction(&self, origin: &Point3, rng: &mut dyn RngCore) -> Vec3 {
        self.inner.random_direction(&(origin - self.offset), rng)
    }

    fn is_emitter(&self) -> bool {
        self.inner.is_emitter()
    }
}
