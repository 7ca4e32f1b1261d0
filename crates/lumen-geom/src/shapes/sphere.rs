//! Spheres, optionally moving linearly over the shutter interval.

use std::f64::consts::PI;

use lumen_math::{Aabb, Point3, Ray, Vec3};
use rand::{Rng, RngCore};

use super::Onb;
use crate::{HitRecord, Hitable, MaterialRef, Sampleable};

/// Extra angle past a right angle still reported as silhouette by
/// [`Sphere::hit_edge`](Hitable::hit_edge).
const SILHOUETTE_SLACK: f64 = 0.1;

/// A sphere whose center moves linearly from `center0` at `time0` to
/// `center1` at `time1`. A stationary sphere has both centers equal.
#[derive(Debug, Clone)]
pub struct Sphere {
    center0: Point3,
    center1: Point3,
    time0: f64,
    time1: f64,
    radius: f64,
    material: MaterialRef,
}

impl Sphere {
    /// A stationary sphere.
    pub fn new(center: Point3, radius: f64, material: MaterialRef) -> Self {
        Self::moving(center, center, 0.0, 1.0, radius, material)
    }

    /// A sphere moving from `center0` at `time0` to `center1` at `time1`.
    pub fn moving(
        center0: Point3,
        center1: Point3,
        time0: f64,
        time1: f64,
        radius: f64,
        material: MaterialRef,
    ) -> Self {
        Self {
            center0,
            center1,
            time0,
            time1,
            radius,
            material,
        }
    }

    /// Radius of the sphere.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Center of the sphere at `time`.
    pub fn center(&self, time: f64) -> Point3 {
        if self.time1 == self.time0 || self.center0 == self.center1 {
            return self.center0;
        }
        let s = (time - self.time0) / (self.time1 - self.time0);
        self.center0 + s * (self.center1 - self.center0)
    }

    fn record(&self, ray: &Ray, t: f64) -> HitRecord {
        let point = ray.at(t);
        let outward = (point - self.center(ray.time)) / self.radius;
        let (u, v) = sphere_uv(&outward);
        let normal = if ray.direction.dot(&outward) >= 0.0 {
            -outward
        } else {
            outward
        };
        HitRecord::new(t, u, v, point, normal)
    }
}

/// Longitude/latitude parameters of a unit outward normal, both in `[0, 1]`.
fn sphere_uv(normal: &Vec3) -> (f64, f64) {
    let phi = normal.z.atan2(normal.x);
    let theta = normal.y.clamp(-1.0, 1.0).asin();
    let u = 1.0 - (phi + PI) / (2.0 * PI);
    let v = (theta + PI / 2.0) / PI;
    (u, v)
}

impl Hitable for Sphere {
    fn bounding_box(&self, time0: f64, time1: f64) -> Option<Aabb> {
        let r = Vec3::repeat(self.radius.abs());
        let c0 = self.center(time0);
        let c1 = self.center(time1);
        let box0 = Aabb::new(c0 - r, c0 + r);
        let box1 = Aabb::new(c1 - r, c1 + r);
        Some(box0.union(&box1))
    }

    fn hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<(HitRecord, MaterialRef)> {
        let oc = ray.origin - self.center(ray.time);
        let a = ray.direction.dot(&ray.direction);
        let half_b = oc.dot(&ray.direction);
        let c = oc.dot(&oc) - self.radius * self.radius;

        let discriminant = half_b * half_b - a * c;
        if discriminant <= 0.0 {
            return None;
        }

        let sqrt_disc = discriminant.sqrt();
        for t in [(-half_b - sqrt_disc) / a, (-half_b + sqrt_disc) / a] {
            if t > t_min && t < t_max {
                return Some((self.record(ray, t), self.material));
            }
        }
        None
    }

    fn hit_edge(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<(HitRecord, bool)> {
        let (rec, _) = self.hit(ray, t_min, t_max)?;

        // Angle between the viewing direction and the outward radius: near
        // pi for a head-on hit, near pi/2 at the silhouette.
        let view = rec.point - ray.origin;
        let radial = rec.point - self.center(ray.time);
        let denom = view.norm() * radial.norm();
        if denom == 0.0 {
            return Some((rec, false));
        }
        let cos = (view.dot(&radial) / denom).clamp(-1.0, 1.0);
        let on_edge = cos.acos() <= PI / 2.0 + SILHOUETTE_SLACK;
        Some((rec, on_edge))
    }
}

impl Sampleable for Sphere {
    fn pdf_value(&self, origin: &Point3, direction: &Vec3) -> f64 {
        let probe = Ray::new(*origin, *direction);
        if self.hit(&probe, 0.001, f64::MAX).is_none() {
            return 0.0;
        }
        let dist_sq = (self.center0 - origin).norm_squared();
        let cos_theta_max = (1.0 - self.radius * self.radius / dist_sq).max(0.0).sqrt();
        let solid_angle = 2.0 * PI * (1.0 - cos_theta_max);
        if solid_angle > 0.0 {
            1.0 / solid_angle
        } else {
            0.0
        }
    }

    fn random_direction(&self, origin: &Point3, rng: &mut dyn RngCore) -> Vec3 {
        let to_center = self.center0 - origin;
        let dist_sq = to_center.norm_squared();
        let onb = Onb::from_w(&to_center);

        // Uniform direction inside the cone subtended by the sphere.
        let r1: f64 = rng.gen();
        let r2: f64 = rng.gen();
        let cos_theta_max = (1.0 - self.radius * self.radius / dist_sq).max(0.0).sqrt();
        let z = 1.0 + r2 * (cos_theta_max - 1.0);
        let phi = 2.0 * PI * r1;
        let sin_theta = (1.0 - z * z).max(0.0).sqrt();
        onb.local(phi.cos() * sin_theta, phi.sin() * sin_theta, z)
    }

    fn is_emitter(&self) -> bool {
        self.material.emissive
    }
}
