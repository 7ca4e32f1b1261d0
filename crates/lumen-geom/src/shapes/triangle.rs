//! Single triangles with optional texture coordinates and vertex normals.

use lumen_math::{Aabb, Point3, Ray, Vec3};
use rand::{Rng, RngCore};

use super::near_segment;
use crate::{HitRecord, Hitable, MaterialRef, Sampleable};

/// Determinant threshold below which a ray is treated as parallel.
const PARALLEL_EPSILON: f64 = 1e-8;

/// Edge tolerance as a fraction of the edge length.
const EDGE_TOLERANCE: f64 = 1e-3;

/// A triangle in 3D space.
#[derive(Debug, Clone)]
pub struct Triangle {
    vertices: [Point3; 3],
    edge1: Vec3,
    edge2: Vec3,
    normal: Vec3,
    vertex_normals: Option<[Vec3; 3]>,
    uvs: [(f64, f64); 3],
    area: f64,
    bbox: Aabb,
    material: MaterialRef,
}

impl Triangle {
    /// An untextured triangle with a flat normal.
    pub fn new(v0: Point3, v1: Point3, v2: Point3, material: MaterialRef) -> Self {
        Self::with_uv(v0, v1, v2, [(0.0, 0.0); 3], material)
    }

    /// A textured triangle with a flat normal.
    pub fn with_uv(
        v0: Point3,
        v1: Point3,
        v2: Point3,
        uvs: [(f64, f64); 3],
        material: MaterialRef,
    ) -> Self {
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let cross = edge1.cross(&edge2);
        let area = cross.norm() / 2.0;
        let normal = cross.try_normalize(0.0).unwrap_or_else(Vec3::zeros);

        let mut bbox = Aabb::from_corners(v0, v1);
        bbox.include_point(&v2);
        // Flat triangles need a nonzero extent along their normal.
        let size = bbox.max - bbox.min;
        bbox.expand((size.max() * 1e-4).max(1e-6));

        Self {
            vertices: [v0, v1, v2],
            edge1,
            edge2,
            normal,
            vertex_normals: None,
            uvs,
            area,
            bbox,
            material,
        }
    }

    /// Attach per-vertex normals, interpolated barycentrically on hit.
    pub fn with_vertex_normals(mut self, normals: [Vec3; 3]) -> Self {
        self.vertex_normals = Some(normals.map(|n| n.normalize()));
        self
    }

    /// The three vertices.
    pub fn vertices(&self) -> &[Point3; 3] {
        &self.vertices
    }

    /// Surface area.
    pub fn area(&self) -> f64 {
        self.area
    }
}

impl Hitable for Triangle {
    fn bounding_box(&self, _time0: f64, _time1: f64) -> Option<Aabb> {
        Some(self.bbox)
    }

    fn hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<(HitRecord, MaterialRef)> {
        // Möller-Trumbore.
        let h = ray.direction.cross(&self.edge2);
        let a = self.edge1.dot(&h);
        if a.abs() < PARALLEL_EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.vertices[0];
        let u = f * s.dot(&h);
        if !(-PARALLEL_EPSILON..=1.0 + PARALLEL_EPSILON).contains(&u) {
            return None;
        }
        let q = s.cross(&self.edge1);
        let v = f * ray.direction.dot(&q);
        if v < -PARALLEL_EPSILON || u + v > 1.0 + PARALLEL_EPSILON {
            return None;
        }

        let t = f * self.edge2.dot(&q);
        if t < t_min || t > t_max {
            return None;
        }

        let w = 1.0 - u - v;
        let tex_u = w * self.uvs[0].0 + u * self.uvs[1].0 + v * self.uvs[2].0;
        let tex_v = w * self.uvs[0].1 + u * self.uvs[1].1 + v * self.uvs[2].1;

        let normal = match &self.vertex_normals {
            Some([n0, n1, n2]) => (w * n0 + u * n1 + v * n2)
                .try_normalize(0.0)
                .unwrap_or(self.normal),
            None => self.normal,
        };

        let rec = HitRecord::new(t, tex_u, tex_v, ray.at(t), normal);
        Some((rec, self.material))
    }

    fn hit_edge(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<(HitRecord, bool)> {
        let (rec, _) = self.hit(ray, t_min, t_max)?;
        let [v0, v1, v2] = &self.vertices;
        let on_edge = [(v0, v1), (v1, v2), (v2, v0)]
            .into_iter()
            .any(|(a, b)| near_segment(&rec.point, a, b, EDGE_TOLERANCE * (b - a).norm()));
        Some((rec, on_edge))
    }
}

impl Sampleable for Triangle {
    fn pdf_value(&self, origin: &Point3, direction: &Vec3) -> f64 {
        let probe = Ray::new(*origin, *direction);
        let Some((rec, _)) = self.hit(&probe, 0.001, f64::MAX) else {
            return 0.0;
        };
        let dist_sq = rec.t * rec.t * direction.norm_squared();
        let cosine = (direction.dot(&rec.normal) / direction.norm()).abs();
        if cosine == 0.0 || self.area == 0.0 {
            return 0.0;
        }
        dist_sq / (cosine * self.area)
    }

    fn random_direction(&self, origin: &Point3, rng: &mut dyn RngCore) -> Vec3 {
        // Uniform over the triangle's area.
        let r1: f64 = rng.gen();
        let r2: f64 = rng.gen();
        let s = r1.sqrt();
        let point = self.vertices[0] + s * (1.0 - r2) * self.edge1 + s * r2 * self.edge2;
        point - origin
    }

    fn is_emitter(&self) -> bool {
        self.material.emissive
    }
}
