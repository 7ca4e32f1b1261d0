//! The binary hierarchy: the build tree kept as-is and traversed
//! recursively. Simpler than the wide form and used as its reference.

use std::sync::Arc;

use lumen_geom::{HitRecord, Hitable, MaterialRef};
use lumen_math::{Aabb, Ray};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::build::{build_tree, BuildNode};
use crate::error::Result;
use crate::settings::BuildSettings;

#[derive(Debug, Clone)]
enum BinaryNode {
    Leaf {
        bbox: Aabb,
        primitives: Vec<Arc<dyn Hitable>>,
    },
    Inner {
        bbox: Aabb,
        children: Box<[BinaryNode; 2]>,
    },
}

impl BinaryNode {
    fn from_build(node: BuildNode, primitives: &[Arc<dyn Hitable>]) -> Self {
        match node {
            BuildNode::Leaf { bbox, primitives: indices } => BinaryNode::Leaf {
                bbox,
                primitives: indices.iter().map(|&i| Arc::clone(&primitives[i])).collect(),
            },
            BuildNode::Inner { bbox, children } => {
                let [left, right] = *children;
                BinaryNode::Inner {
                    bbox,
                    children: Box::new([
                        Self::from_build(left, primitives),
                        Self::from_build(right, primitives),
                    ]),
                }
            }
        }
    }

    fn bbox(&self) -> &Aabb {
        match self {
            BinaryNode::Leaf { bbox, .. } | BinaryNode::Inner { bbox, .. } => bbox,
        }
    }

    /// Closest result of `test` beneath this node. The left subtree's hit
    /// tightens the interval for the right one.
    fn closest<T>(
        &self,
        ray: &Ray,
        t_min: f64,
        t_max: f64,
        test: &impl Fn(&dyn Hitable, f64) -> Option<(HitRecord, T)>,
    ) -> Option<(HitRecord, T)> {
        if !self.bbox().hit(ray, t_min, t_max) {
            return None;
        }

        match self {
            BinaryNode::Leaf { primitives, .. } => {
                let mut best = None;
                let mut closest = t_max;
                for primitive in primitives {
                    if let Some(hit) = test(primitive.as_ref(), closest) {
                        closest = hit.0.t;
                        best = Some(hit);
                    }
                }
                best
            }
            BinaryNode::Inner { children, .. } => {
                let left = children[0].closest(ray, t_min, t_max, test);
                let limit = left.as_ref().map_or(t_max, |(rec, _)| rec.t);
                let right = children[1].closest(ray, t_min, limit, test);
                right.or(left)
            }
        }
    }
}

/// A binary bounding volume hierarchy.
#[derive(Debug, Clone)]
pub struct BinaryBvh {
    root: BinaryNode,
    depth: usize,
    len: usize,
}

impl BinaryBvh {
    /// Build with default settings.
    pub fn build(primitives: &[Arc<dyn Hitable>], time0: f64, time1: f64) -> Result<Self> {
        Self::build_with(primitives, time0, time1, &BuildSettings::default())
    }

    /// Build with the given settings.
    pub fn build_with(
        primitives: &[Arc<dyn Hitable>],
        time0: f64,
        time1: f64,
        settings: &BuildSettings,
    ) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(settings.seed);
        Self::build_with_axis_source(primitives, time0, time1, settings, || rng.gen())
    }

    /// Build with split axes drawn from `axis_source`.
    pub fn build_with_axis_source(
        primitives: &[Arc<dyn Hitable>],
        time0: f64,
        time1: f64,
        settings: &BuildSettings,
        mut axis_source: impl FnMut() -> f64,
    ) -> Result<Self> {
        settings.validate()?;
        let tree = build_tree(
            primitives,
            time0,
            time1,
            settings.max_leaf_primitives,
            &mut axis_source,
        )?;
        Ok(Self {
            depth: tree.depth(),
            len: primitives.len(),
            root: BinaryNode::from_build(tree, primitives),
        })
    }

    /// Nearest hit with `t` in `(t_min, t_max)`.
    pub fn hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<(HitRecord, MaterialRef)> {
        self.root.closest(ray, t_min, t_max, &|primitive, closest| {
            primitive.hit(ray, t_min, closest)
        })
    }

    /// Nearest hit, with the edge flag reported by the primitive hit.
    pub fn hit_edge(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<(HitRecord, bool)> {
        self.root.closest(ray, t_min, t_max, &|primitive, closest| {
            primitive.hit_edge(ray, t_min, closest)
        })
    }

    /// Bounds of the whole tree.
    pub fn root_bounds(&self) -> Aabb {
        *self.root.bbox()
    }

    /// Number of levels; a single leaf has depth 1.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of primitives.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false: construction rejects empty lists.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Hitable for BinaryBvh {
    fn bounding_box(&self, _time0: f64, _time1: f64) -> Option<Aabb> {
        Some(self.root_bounds())
    }

    fn hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<(HitRecord, MaterialRef)> {
        BinaryBvh::hit(self, ray, t_min, t_max)
    }

    fn hit_edge(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<(HitRecord, bool)> {
        BinaryBvh::hit_edge(self, ray, t_min, t_max)
    }
}
