//! Shared fixtures for unit tests.

use std::sync::Arc;

use lumen_geom::shapes::{HitableList, Sphere};
use lumen_geom::{HitRecord, Hitable, MaterialRef};
use lumen_math::{Aabb, Point3, Ray, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::flatten::FlatNode;

/// Spheres with centers in `[-50, 50]^3` and radii in `[0.1, 2)`.
pub fn random_spheres(count: usize, seed: u64) -> Vec<Arc<dyn Hitable>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let center = Point3::new(
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0),
            );
            let radius = rng.gen_range(0.1..2.0);
            Arc::new(Sphere::new(center, radius, MaterialRef::new(i as u32))) as Arc<dyn Hitable>
        })
        .collect()
}

/// Rays from `[-60, 60]^3` toward random points in `[-50, 50]^3`.
pub fn random_rays(count: usize, seed: u64) -> Vec<Ray> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut point = |extent: f64| {
        Point3::new(
            rng.gen_range(-extent..extent),
            rng.gen_range(-extent..extent),
            rng.gen_range(-extent..extent),
        )
    };
    (0..count)
        .map(|_| {
            let origin = point(60.0);
            let target = point(50.0);
            Ray::new(origin, target - origin)
        })
        .collect()
}

/// 10,000 spheres of radius 0.2 on a 100x100 grid with spacing 0.5 at
/// `z = -50`.
pub fn sphere_grid() -> Vec<Arc<dyn Hitable>> {
    (0..10_000)
        .map(|i| {
            let center = Point3::new(
                (i % 100) as f64 * 0.5,
                ((i / 100) % 100) as f64 * 0.5,
                -50.0,
            );
            Arc::new(Sphere::new(center, 0.2, MaterialRef::new(0))) as Arc<dyn Hitable>
        })
        .collect()
}

/// The brute-force reference over the same primitives.
pub fn brute_force(primitives: &[Arc<dyn Hitable>]) -> HitableList {
    HitableList::new(primitives.to_vec())
}

/// A primitive with no bounding box.
#[derive(Debug)]
pub struct Unbounded;

impl Hitable for Unbounded {
    fn bounding_box(&self, _time0: f64, _time1: f64) -> Option<Aabb> {
        None
    }

    fn hit(&self, _ray: &Ray, _t_min: f64, _t_max: f64) -> Option<(HitRecord, MaterialRef)> {
        None
    }

    fn hit_edge(&self, _ray: &Ray, _t_min: f64, _t_max: f64) -> Option<(HitRecord, bool)> {
        None
    }
}

/// A node whose leading slots are `(child_index, primitive_count)` pairs,
/// all bounded by the unit cube.
pub fn flat_node<const K: usize>(slots: &[(i32, i32)]) -> FlatNode<K> {
    let unit = Aabb::new(Point3::origin(), Point3::origin() + Vec3::repeat(1.0));
    let mut node = FlatNode::empty();
    for (slot, &(child, count)) in slots.iter().enumerate() {
        node.set_slot(slot, &unit, child, count);
    }
    node
}

/// A chain of `links` nodes that each push one sibling before descending,
/// so a ray through the unit cube needs `links` stack entries. Returns the
/// nodes and the primitive count they cover.
pub fn deep_chain(links: usize) -> (Vec<FlatNode<2>>, usize) {
    let mut nodes = Vec::new();
    for i in 0..links {
        let next = 2 * (i + 1);
        let side = 2 * i + 1;
        nodes.push(flat_node(&[(next as i32, 0), (side as i32, 0)]));
        nodes.push(flat_node(&[(i as i32, 1)]));
    }
    nodes.push(flat_node(&[(links as i32, 1)]));
    (nodes, links + 1)
}
