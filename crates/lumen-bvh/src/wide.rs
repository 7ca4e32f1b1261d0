//! K-wide flat hierarchies and their stack-based traversal.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info};
use lumen_geom::{HitRecord, Hitable, MaterialRef};
use lumen_math::{Aabb, Ray};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::build::build_tree;
use crate::diagnostics::{self, Stats};
use crate::error::{BuildError, IntegrityError, Result};
use crate::flatten::{flatten, FlatNode};
use crate::settings::BuildSettings;
use crate::slab::{cull_limit, slab_test, WideRay};

/// Capacity of the traversal stack.
pub const STACK_CAPACITY: usize = 64;

/// Largest supported fan-out; slot masks are `u32` and node indices `i32`.
pub const MAX_FAN_OUT: usize = 8;

/// Integrity errors logged individually before the rest are summarized.
const LOGGED_ERRORS: usize = 10;

/// 4-wide hierarchy.
pub type Bvh4 = Hierarchy<4>;

/// 8-wide hierarchy.
pub type Bvh8 = Hierarchy<8>;

/// An immutable K-wide bounding volume hierarchy.
///
/// Built once, then queried from any number of threads without locking.
#[derive(Debug, Clone)]
pub struct Hierarchy<const K: usize> {
    nodes: Vec<FlatNode<K>>,
    primitives: Vec<Arc<dyn Hitable>>,
    time0: f64,
    time1: f64,
}

impl<const K: usize> Hierarchy<K> {
    /// Build with default settings.
    pub fn build(primitives: Vec<Arc<dyn Hitable>>, time0: f64, time1: f64) -> Result<Self> {
        Self::build_with(primitives, time0, time1, &BuildSettings::default())
    }

    /// Build with the given settings, drawing split axes from a generator
    /// seeded with `settings.seed`.
    pub fn build_with(
        primitives: Vec<Arc<dyn Hitable>>,
        time0: f64,
        time1: f64,
        settings: &BuildSettings,
    ) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(settings.seed);
        Self::build_with_axis_source(primitives, time0, time1, settings, || rng.gen())
    }

    /// Build with split axes drawn from `axis_source`, one sample per
    /// binary node, mapped with [`Axis::from_unit`](lumen_math::Axis::from_unit).
    pub fn build_with_axis_source(
        primitives: Vec<Arc<dyn Hitable>>,
        time0: f64,
        time1: f64,
        settings: &BuildSettings,
        mut axis_source: impl FnMut() -> f64,
    ) -> Result<Self> {
        settings.validate()?;
        if !(2..=MAX_FAN_OUT).contains(&K) {
            return Err(BuildError::InvalidSettings(format!(
                "fan-out must be between 2 and {}, got {}",
                MAX_FAN_OUT, K
            )));
        }
        if primitives.len() > i32::MAX as usize {
            return Err(BuildError::TooManyPrimitives {
                count: primitives.len(),
                max: i32::MAX as usize,
            });
        }

        info!("Building {}-wide BVH over {} primitives", K, primitives.len());
        let start = Instant::now();

        let tree = build_tree(
            &primitives,
            time0,
            time1,
            settings.max_leaf_primitives,
            &mut axis_source,
        )?;
        let (nodes, order) = flatten::<K>(&tree, settings.inline_leaves);
        let primitives = order.iter().map(|&i| Arc::clone(&primitives[i])).collect();

        let hierarchy = Self {
            nodes,
            primitives,
            time0,
            time1,
        };
        info!("Built {}-wide BVH in {:?}", K, start.elapsed());

        let stats = hierarchy.stats();
        debug!(
            "BVH stats: nodes={}, primitives={}, leaf_nodes={}, inner_nodes={}, \
             total_leaf_prims={}, empty_slots={}, root_children={}, max_depth={}, \
             root_bounds={:?}..{:?}",
            stats.node_count,
            stats.primitive_count,
            stats.leaf_nodes,
            stats.inner_nodes,
            stats.total_leaf_primitives,
            stats.empty_slots,
            stats.root_children,
            stats.max_depth,
            stats.root_bounds.min,
            stats.root_bounds.max,
        );

        if settings.validate {
            let errors = hierarchy.validate();
            if !errors.is_empty() {
                log_integrity_errors(&errors);
                return Err(BuildError::Corrupt { errors });
            }
            debug!("BVH validation passed");
        }

        Ok(hierarchy)
    }

    /// Nearest hit with `t` in `(t_min, t_max)`.
    pub fn hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<(HitRecord, MaterialRef)> {
        let mut best = None;
        self.traverse(ray, t_max, |primitive, closest| {
            let (rec, material) = primitive.hit(ray, t_min, closest)?;
            let t = rec.t;
            best = Some((rec, material));
            Some(t)
        });
        best
    }

    /// Nearest hit, with the edge flag reported by the primitive hit.
    pub fn hit_edge(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<(HitRecord, bool)> {
        let mut best = None;
        self.traverse(ray, t_max, |primitive, closest| {
            let (rec, on_edge) = primitive.hit_edge(ray, t_min, closest)?;
            let t = rec.t;
            best = Some((rec, on_edge));
            Some(t)
        });
        best
    }

    /// Answer many rays in parallel. Results are in ray order.
    pub fn hit_batch(
        &self,
        rays: &[Ray],
        t_min: f64,
        t_max: f64,
    ) -> Vec<Option<(HitRecord, MaterialRef)>> {
        rays.par_iter()
            .map(|ray| self.hit(ray, t_min, t_max))
            .collect()
    }

    /// Whether `ray` passes the batched test against any root slot.
    pub fn test_root(&self, ray: &Ray, _t_min: f64, t_max: f64) -> bool {
        slab_test(&WideRay::new(ray), &self.nodes[0], cull_limit(t_max)) != 0
    }

    /// Union of the root slots' stored bounds.
    pub fn root_bounds(&self) -> Aabb {
        let root = &self.nodes[0];
        (0..K)
            .filter(|&slot| !root.is_unused_slot(slot))
            .map(|slot| root.slot_bounds(slot))
            .reduce(|acc, bbox| acc.union(&bbox))
            .unwrap_or_else(Aabb::empty)
    }

    /// Structural integrity check.
    pub fn validate(&self) -> Vec<IntegrityError> {
        diagnostics::validate(&self.nodes, self.primitives.len())
    }

    /// Node, slot and coverage counts.
    pub fn stats(&self) -> Stats {
        diagnostics::stats(&self.nodes, self.primitives.len())
    }

    /// The flat node array; index 0 is the root.
    pub fn nodes(&self) -> &[FlatNode<K>] {
        &self.nodes
    }

    /// Primitives in leaf order.
    pub fn primitives(&self) -> &[Arc<dyn Hitable>] {
        &self.primitives
    }

    /// The node array as raw bytes.
    pub fn node_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }

    /// The shutter interval the hierarchy was built for.
    pub fn time_interval(&self) -> (f64, f64) {
        (self.time0, self.time1)
    }

    /// Walk every node whose box the ray can reach before the current
    /// closest hit, handing leaf primitives to `test_leaf`.
    ///
    /// `test_leaf` receives the current closest distance and returns the
    /// distance of a closer hit, if it found one.
    fn traverse<F>(&self, ray: &Ray, t_max: f64, mut test_leaf: F)
    where
        F: FnMut(&Arc<dyn Hitable>, f64) -> Option<f64>,
    {
        let wide = WideRay::new(ray);
        let mut closest = t_max;
        let mut stack = TraversalStack::new();
        let mut current = Some(0usize);

        while let Some(index) = current {
            let node = &self.nodes[index];
            let mask = slab_test(&wide, node, cull_limit(closest));

            let mut next = None;
            for slot in 0..K {
                if mask & (1 << slot) == 0 || node.is_unused_slot(slot) {
                    continue;
                }

                let child = node.child_index[slot] as usize;
                if node.is_leaf_slot(slot) {
                    let count = node.primitive_count[slot] as usize;
                    for primitive in &self.primitives[child..child + count] {
                        if let Some(t) = test_leaf(primitive, closest) {
                            closest = t;
                        }
                    }
                } else if next.is_none() {
                    next = Some(child);
                } else {
                    stack.push(child);
                }
            }

            current = next.or_else(|| stack.pop());
        }
    }
}

impl<const K: usize> Hitable for Hierarchy<K> {
    fn bounding_box(&self, _time0: f64, _time1: f64) -> Option<Aabb> {
        Some(self.root_bounds())
    }

    fn hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<(HitRecord, MaterialRef)> {
        Hierarchy::hit(self, ray, t_min, t_max)
    }

    fn hit_edge(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<(HitRecord, bool)> {
        Hierarchy::hit_edge(self, ray, t_min, t_max)
    }
}

/// Fixed-capacity stack of node indices; overflowing it is a corrupt tree.
struct TraversalStack {
    entries: [usize; STACK_CAPACITY],
    len: usize,
}

impl TraversalStack {
    fn new() -> Self {
        Self {
            entries: [0; STACK_CAPACITY],
            len: 0,
        }
    }

    #[inline]
    fn push(&mut self, index: usize) {
        assert!(
            self.len < STACK_CAPACITY,
            "BVH traversal stack overflow: more than {STACK_CAPACITY} pending nodes"
        );
        self.entries[self.len] = index;
        self.len += 1;
    }

    #[inline]
    fn pop(&mut self) -> Option<usize> {
        self.len = self.len.checked_sub(1)?;
        Some(self.entries[self.len])
    }
}

fn log_integrity_errors(errors: &[IntegrityError]) {
    error!("BVH validation failed with {} errors:", errors.len());
    for (i, err) in errors.iter().take(LOGGED_ERRORS).enumerate() {
        error!("  Error {}: {}", i + 1, err);
    }
    if errors.len() > LOGGED_ERRORS {
        error!("  ... and {} more errors", errors.len() - LOGGED_ERRORS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        brute_force, deep_chain, random_rays, random_spheres, sphere_grid, Unbounded,
    };
    use crate::BinaryBvh;
    use approx::assert_abs_diff_eq;
    use lumen_geom::shapes::Sphere;
    use lumen_math::{Point3, Vec3};

    fn assert_matches_brute_force<const K: usize>(
        bvh: &Hierarchy<K>,
        primitives: &[Arc<dyn Hitable>],
        rays: &[Ray],
    ) {
        let list = brute_force(primitives);
        for ray in rays {
            let expected = list.hit(ray, 0.001, f64::INFINITY);
            let actual = bvh.hit(ray, 0.001, f64::INFINITY);
            assert_eq!(expected.is_some(), actual.is_some(), "hit/miss differs for {ray:?}");
            if let (Some((e, _)), Some((a, _))) = (expected, actual) {
                assert_abs_diff_eq!(e.t, a.t, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_empty_list_rejected() {
        assert_eq!(
            Bvh4::build(Vec::new(), 0.0, 1.0).unwrap_err(),
            BuildError::EmptyPrimitiveList
        );
    }

    #[test]
    fn test_unbounded_primitive_rejected() {
        let mut primitives = random_spheres(10, 1);
        primitives.push(Arc::new(Unbounded));
        assert_eq!(
            Bvh8::build(primitives, 0.0, 1.0).unwrap_err(),
            BuildError::UnboundedPrimitive { index: 10 }
        );
    }

    #[test]
    fn test_unsupported_fan_out_rejected() {
        let primitives = random_spheres(10, 2);
        assert!(matches!(
            Hierarchy::<1>::build(primitives.clone(), 0.0, 1.0),
            Err(BuildError::InvalidSettings(_))
        ));
        assert!(matches!(
            Hierarchy::<16>::build(primitives, 0.0, 1.0),
            Err(BuildError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = BuildSettings {
            max_leaf_primitives: 0,
            ..Default::default()
        };
        let result = Bvh4::build_with(random_spheres(3, 3), 0.0, 1.0, &settings);
        assert!(matches!(result, Err(BuildError::InvalidSettings(_))));
    }

    #[test]
    fn test_structural_integrity_across_sizes() {
        for n in [1, 2, 5, 10, 10_000] {
            let bvh4 = Bvh4::build(random_spheres(n, n as u64), 0.0, 1.0).unwrap();
            assert!(bvh4.validate().is_empty());
            assert_eq!(bvh4.stats().total_leaf_primitives, n);
            assert_eq!(bvh4.primitives().len(), n);

            let bvh8 = Bvh8::build(random_spheres(n, n as u64), 0.0, 1.0).unwrap();
            assert!(bvh8.validate().is_empty());
            assert_eq!(bvh8.stats().total_leaf_primitives, n);
        }
    }

    #[test]
    fn test_single_primitive_root_leaf() {
        let bvh = Bvh8::build(random_spheres(1, 4), 0.0, 1.0).unwrap();
        assert_eq!(bvh.nodes().len(), 1);
        let stats = bvh.stats();
        assert_eq!(stats.root_children, 1);
        assert_eq!(stats.empty_slots, 7);
        assert_eq!(stats.total_leaf_primitives, 1);
    }

    #[test]
    fn test_matches_brute_force() {
        let primitives = random_spheres(500, 5);
        let rays = random_rays(1000, 6);

        let bvh4 = Bvh4::build(primitives.clone(), 0.0, 1.0).unwrap();
        assert_matches_brute_force(&bvh4, &primitives, &rays);

        let bvh8 = Bvh8::build(primitives.clone(), 0.0, 1.0).unwrap();
        assert_matches_brute_force(&bvh8, &primitives, &rays);
    }

    #[test]
    fn test_leaf_layouts() {
        let primitives = random_spheres(4, 29);

        let own_nodes = Bvh4::build(primitives.clone(), 0.0, 1.0).unwrap();
        let stats = own_nodes.stats();
        assert_eq!(stats.node_count, 5);
        assert_eq!(stats.leaf_nodes, 4);
        assert_eq!(stats.inner_nodes, 1);
        assert_eq!(stats.empty_slots, 12);
        assert_eq!(stats.root_children, 4);
        assert_eq!(stats.max_depth, 2);

        let settings = BuildSettings {
            inline_leaves: true,
            ..Default::default()
        };
        let inline = Bvh4::build_with(primitives.clone(), 0.0, 1.0, &settings).unwrap();
        let stats = inline.stats();
        assert_eq!(stats.node_count, 1);
        assert_eq!(stats.leaf_nodes, 1);
        assert_eq!(stats.inner_nodes, 0);
        assert_eq!(stats.empty_slots, 0);

        let rays = random_rays(300, 30);
        assert_matches_brute_force(&own_nodes, &primitives, &rays);
        assert_matches_brute_force(&inline, &primitives, &rays);
    }

    #[test]
    fn test_inline_leaves_match_brute_force() {
        let primitives = random_spheres(500, 31);
        let settings = BuildSettings {
            inline_leaves: true,
            ..Default::default()
        };
        let bvh4 = Bvh4::build_with(primitives.clone(), 0.0, 1.0, &settings).unwrap();
        let bvh8 = Bvh8::build_with(primitives.clone(), 0.0, 1.0, &settings).unwrap();
        assert!(bvh4.validate().is_empty());
        assert!(bvh8.validate().is_empty());
        let own_nodes = Bvh8::build(primitives.clone(), 0.0, 1.0).unwrap();
        assert!(bvh8.nodes().len() < own_nodes.nodes().len());

        let rays = random_rays(500, 32);
        assert_matches_brute_force(&bvh4, &primitives, &rays);
        assert_matches_brute_force(&bvh8, &primitives, &rays);
    }

    #[test]
    fn test_matches_brute_force_with_larger_leaves() {
        let primitives = random_spheres(300, 7);
        let settings = BuildSettings {
            max_leaf_primitives: 4,
            ..Default::default()
        };
        let bvh = Bvh8::build_with(primitives.clone(), 0.0, 1.0, &settings).unwrap();
        assert!(bvh.validate().is_empty());
        assert_matches_brute_force(&bvh, &primitives, &random_rays(500, 8));
    }

    #[test]
    fn test_interval_is_respected() {
        let primitives = random_spheres(200, 9);
        let bvh = Bvh4::build(primitives.clone(), 0.0, 1.0).unwrap();
        let list = brute_force(&primitives);
        for ray in random_rays(300, 10) {
            let expected = list.hit(&ray, 0.2, 0.6);
            let actual = bvh.hit(&ray, 0.2, 0.6);
            assert_eq!(expected.map(|(r, _)| r.t), actual.map(|(r, _)| r.t));
        }
    }

    #[test]
    fn test_hit_edge_matches_brute_force() {
        let primitives = random_spheres(200, 11);
        let bvh = Bvh8::build(primitives.clone(), 0.0, 1.0).unwrap();
        let list = brute_force(&primitives);
        for ray in random_rays(400, 12) {
            let expected = list.hit_edge(&ray, 0.001, f64::INFINITY);
            let actual = bvh.hit_edge(&ray, 0.001, f64::INFINITY);
            assert_eq!(expected.is_some(), actual.is_some());
            if let (Some((e, e_edge)), Some((a, a_edge))) = (expected, actual) {
                assert_abs_diff_eq!(e.t, a.t, epsilon = 1e-6);
                assert_eq!(e_edge, a_edge);
            }
        }
    }

    #[test]
    fn test_moving_primitives() {
        let mut rng = StdRng::seed_from_u64(13);
        let primitives: Vec<Arc<dyn Hitable>> = (0..100)
            .map(|_| {
                let c0 = Point3::new(
                    rng.gen_range(-20.0..20.0),
                    rng.gen_range(-20.0..20.0),
                    rng.gen_range(-20.0..20.0),
                );
                let c1 = c0 + Vec3::new(rng.gen_range(-3.0..3.0), 0.0, 0.0);
                Arc::new(Sphere::moving(c0, c1, 0.0, 1.0, 0.5, MaterialRef::new(0)))
                    as Arc<dyn Hitable>
            })
            .collect();
        let bvh = Bvh4::build(primitives.clone(), 0.0, 1.0).unwrap();
        let list = brute_force(&primitives);

        for (i, ray) in random_rays(400, 14).into_iter().enumerate() {
            let ray = Ray::with_time(ray.origin, ray.direction, (i % 5) as f64 / 4.0);
            let expected = list.hit(&ray, 0.001, f64::INFINITY).map(|(r, _)| r.t);
            let actual = bvh.hit(&ray, 0.001, f64::INFINITY).map(|(r, _)| r.t);
            assert_eq!(expected, actual);
        }
        assert_eq!(bvh.time_interval(), (0.0, 1.0));
    }

    #[test]
    fn test_no_missed_hits_at_extreme_coordinates() {
        let spheres = [
            (Point3::new(1_234_567.890_123, 0.0, -10.0), 1.0),
            (Point3::new(0.0, 0.000_001_234_567, -10.0), 0.5),
            (Point3::new(-9_876_543.210_987, 100.0, -10.0), 2.0),
            (
                Point3::new(std::f64::consts::PI * 1e6, std::f64::consts::E * 1e6, -10.0),
                1.5,
            ),
            (Point3::new(1.234_567_89e9, 0.0, -10.0), 1.0),
        ];
        let primitives: Vec<Arc<dyn Hitable>> = spheres
            .iter()
            .map(|&(center, radius)| {
                Arc::new(Sphere::new(center, radius, MaterialRef::new(0))) as Arc<dyn Hitable>
            })
            .collect();

        let settings = BuildSettings::default();
        let binary =
            BinaryBvh::build_with_axis_source(&primitives, 0.0, 1.0, &settings, || 0.0).unwrap();
        let bvh4 =
            Bvh4::build_with_axis_source(primitives.clone(), 0.0, 1.0, &settings, || 0.0).unwrap();
        let bvh8 = Bvh8::build_with_axis_source(primitives, 0.0, 1.0, &settings, || 0.0).unwrap();

        for &(center, _) in &spheres {
            let ray = Ray::new(Point3::new(center.x, center.y, 0.0), Vec3::new(0.0, 0.0, -1.0));
            assert!(binary.hit(&ray, 0.001, 1000.0).is_some());
            assert!(bvh4.hit(&ray, 0.001, 1000.0).is_some());
            assert!(bvh8.hit(&ray, 0.001, 1000.0).is_some());
        }
    }

    #[test]
    fn test_oblique_rays_at_large_coordinates() {
        let big = f64::from(1u32 << 30);
        let centers: Vec<Point3> = (0..20)
            .map(|i| {
                let i = i as f64;
                Point3::new(65.5 + 10.0 * i, big + 1024.5 + 7.0 * i, 3.0 * i)
            })
            .collect();
        let primitives: Vec<Arc<dyn Hitable>> = centers
            .iter()
            .map(|&c| Arc::new(Sphere::new(c, 0.5, MaterialRef::new(0))) as Arc<dyn Hitable>)
            .collect();

        let bvh4 = Bvh4::build(primitives.clone(), 0.0, 1.0).unwrap();
        let bvh8 = Bvh8::build(primitives.clone(), 0.0, 1.0).unwrap();
        let list = brute_force(&primitives);

        let directions = [
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.5),
            Vec3::new(-1.0, 2.0, 1.0),
        ];
        for &center in &centers {
            for dir in directions {
                let ray = Ray::new(center - 65.5 * dir, dir);
                let expected = list.hit(&ray, 0.001, f64::INFINITY).map(|(r, _)| r.t);
                assert!(expected.is_some());
                assert_eq!(bvh4.hit(&ray, 0.001, f64::INFINITY).map(|(r, _)| r.t), expected);
                assert_eq!(bvh8.hit(&ray, 0.001, f64::INFINITY).map(|(r, _)| r.t), expected);
            }
        }
    }

    #[test]
    fn test_root_bounds_contain_every_primitive() {
        let primitives = random_spheres(1000, 15);
        let bvh = Bvh8::build(primitives.clone(), 0.0, 1.0).unwrap();
        let root = bvh.bounding_box(0.0, 1.0).unwrap();
        for primitive in &primitives {
            assert!(root.contains(&primitive.bounding_box(0.0, 1.0).unwrap()));
        }
    }

    #[test]
    fn test_deterministic_given_seed() {
        let primitives = random_spheres(500, 16);
        let a = Bvh4::build(primitives.clone(), 0.0, 1.0).unwrap();
        let b = Bvh4::build(primitives.clone(), 0.0, 1.0).unwrap();
        assert_eq!(a.nodes(), b.nodes());
        assert!(a
            .primitives()
            .iter()
            .zip(b.primitives())
            .all(|(x, y)| Arc::ptr_eq(x, y)));

        let settings = BuildSettings::default();
        let sequence = || {
            let mut i = 0u32;
            move || {
                i = i.wrapping_add(1);
                (i % 3) as f64 / 3.0
            }
        };
        let c = Bvh8::build_with_axis_source(primitives.clone(), 0.0, 1.0, &settings, sequence())
            .unwrap();
        let d = Bvh8::build_with_axis_source(primitives, 0.0, 1.0, &settings, sequence()).unwrap();
        assert_eq!(c.nodes(), d.nodes());
        assert_eq!(c.node_bytes(), d.node_bytes());
    }

    #[test]
    fn test_sphere_grid_scenario() {
        let primitives = sphere_grid();
        let bvh = Bvh8::build(primitives.clone(), 0.0, 1.0).unwrap();
        assert_eq!(bvh.stats().total_leaf_primitives, 10_000);
        assert!(bvh.validate().is_empty());

        let list = brute_force(&primitives);
        let probes = [
            (Point3::new(5.0, 5.0, 0.0), true),
            (Point3::new(10.0, 10.0, 0.0), true),
            (Point3::new(25.0, 25.0, 0.0), true),
            (Point3::new(5.25, 5.25, 0.0), false),
            (Point3::new(60.0, 60.0, 0.0), false),
        ];
        for (origin, should_hit) in probes {
            let ray = Ray::new(origin, Vec3::new(0.0, 0.0, -1.0));
            let expected = list.hit(&ray, 0.001, 1000.0);
            let actual = bvh.hit(&ray, 0.001, 1000.0);
            assert_eq!(expected.is_some(), should_hit);
            assert_eq!(actual.is_some(), should_hit);
            if let (Some((e, _)), Some((a, _))) = (expected, actual) {
                assert_abs_diff_eq!(e.t, 49.8, epsilon = 1e-9);
                assert_abs_diff_eq!(a.t, e.t, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_root_probe() {
        let bvh = Bvh4::build(sphere_grid(), 0.0, 1.0).unwrap();
        let down = Ray::new(Point3::new(10.0, 10.0, 0.0), Vec3::new(0.0, 0.0, -1.0));
        let up = Ray::new(Point3::new(10.0, 10.0, 0.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(bvh.test_root(&down, 0.001, 1000.0));
        assert!(!bvh.test_root(&up, 0.001, 1000.0));
        assert!(!bvh.test_root(&down, 0.001, 10.0));
    }

    #[test]
    fn test_unused_slots_never_selected() {
        let bvh = Bvh8::build(random_spheres(1, 17), 0.0, 1.0).unwrap();
        let root = &bvh.nodes()[0];
        for ray in random_rays(200, 18) {
            let mask = slab_test(&WideRay::new(&ray), root, cull_limit(f64::INFINITY));
            assert_eq!(mask & !1, 0);
        }
    }

    #[test]
    fn test_hit_batch_matches_sequential() {
        let primitives = random_spheres(400, 19);
        let bvh = Bvh8::build(primitives, 0.0, 1.0).unwrap();
        let rays = random_rays(2000, 20);
        let batch = bvh.hit_batch(&rays, 0.001, f64::INFINITY);
        assert_eq!(batch.len(), rays.len());
        for (ray, result) in rays.iter().zip(&batch) {
            let single = bvh.hit(ray, 0.001, f64::INFINITY);
            assert_eq!(single.map(|(r, _)| r.t), result.map(|(r, _)| r.t));
        }
    }

    #[test]
    fn test_shared_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Bvh4>();
        assert_send_sync::<Bvh8>();

        let bvh = Arc::new(Bvh4::build(random_spheres(300, 21), 0.0, 1.0).unwrap());
        let rays = random_rays(200, 22);
        let expected: Vec<_> = rays
            .iter()
            .map(|r| bvh.hit(r, 0.001, f64::INFINITY).map(|(h, _)| h.t))
            .collect();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for (ray, want) in rays.iter().zip(&expected) {
                        let got = bvh.hit(ray, 0.001, f64::INFINITY).map(|(h, _)| h.t);
                        assert_eq!(got, *want);
                    }
                });
            }
        });
    }

    #[test]
    fn test_nested_aggregates() {
        let inner_a = random_spheres(100, 23);
        let inner_b = random_spheres(100, 24);
        let loose = random_spheres(20, 25);

        let nested: Vec<Arc<dyn Hitable>> = vec![
            Arc::new(Bvh4::build(inner_a.clone(), 0.0, 1.0).unwrap()) as Arc<dyn Hitable>,
            Arc::new(BinaryBvh::build(&inner_b, 0.0, 1.0).unwrap()) as Arc<dyn Hitable>,
        ]
        .into_iter()
        .chain(loose.iter().cloned())
        .collect();
        let outer = Bvh8::build(nested, 0.0, 1.0).unwrap();

        let all: Vec<Arc<dyn Hitable>> = inner_a.into_iter().chain(inner_b).chain(loose).collect();
        assert_matches_brute_force(&outer, &all, &random_rays(500, 26));
    }

    #[test]
    fn test_node_bytes() {
        let bvh = Bvh8::build(random_spheres(100, 27), 0.0, 1.0).unwrap();
        assert_eq!(
            bvh.node_bytes().len(),
            bvh.nodes().len() * std::mem::size_of::<FlatNode<8>>()
        );
    }

    fn unit_cube_primitives(count: usize) -> Vec<Arc<dyn Hitable>> {
        (0..count)
            .map(|_| {
                Arc::new(Sphere::new(Point3::new(0.5, 0.5, 0.5), 0.4, MaterialRef::new(0)))
                    as Arc<dyn Hitable>
            })
            .collect()
    }

    #[test]
    fn test_deepest_supported_stack() {
        let (nodes, count) = deep_chain(STACK_CAPACITY);
        let bvh = Hierarchy {
            nodes,
            primitives: unit_cube_primitives(count),
            time0: 0.0,
            time1: 1.0,
        };
        let ray = Ray::new(Point3::new(0.5, 0.5, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let (rec, _) = bvh.hit(&ray, 0.001, f64::INFINITY).unwrap();
        assert_abs_diff_eq!(rec.t, 4.1, epsilon = 1e-9);
    }

    #[test]
    #[should_panic(expected = "stack overflow")]
    fn test_stack_overflow_panics() {
        let (nodes, count) = deep_chain(STACK_CAPACITY + 1);
        let bvh = Hierarchy {
            nodes,
            primitives: unit_cube_primitives(count),
            time0: 0.0,
            time1: 1.0,
        };
        let ray = Ray::new(Point3::new(0.5, 0.5, 5.0), Vec3::new(0.0, 0.0, -1.0));
        bvh.hit(&ray, 0.001, f64::INFINITY);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_node_panics() {
        let mut bvh = Bvh4::build(random_spheres(50, 28), 0.0, 1.0).unwrap();
        let root = &mut bvh.nodes[0];
        for slot in 0..4 {
            if root.is_inner_slot(slot) {
                root.child_index[slot] = 10_000;
            }
        }
        // Primitive 0 sits beneath root slot 0, so this ray must descend it.
        let target = bvh.primitives()[0].bounding_box(0.0, 1.0).unwrap().centroid();
        let ray = Ray::new(Point3::new(target.x, target.y, 100.0), Vec3::new(0.0, 0.0, -1.0));
        bvh.hit(&ray, 0.001, f64::INFINITY);
    }
}
