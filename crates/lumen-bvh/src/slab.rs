//! K-wide batched ray/box slab test.
//!
//! Boxes are stored at float32, rounded outward. The lane arithmetic runs
//! at float64 against those bounds: float32 to float64 widening is exact
//! and each step is monotone, so a slot is never rejected when the float64
//! test against the original box would accept it.

use lumen_math::Ray;

use crate::flatten::FlatNode;

/// A ray with its reciprocal direction precomputed for the batched test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WideRay {
    /// Ray origin.
    pub origin: [f64; 3],
    /// Componentwise reciprocal of the direction.
    pub inv_direction: [f64; 3],
}

impl WideRay {
    /// Prepare `ray` for batched testing.
    pub fn new(ray: &Ray) -> Self {
        let inv = ray.inv_direction();
        Self {
            origin: [ray.origin.x, ray.origin.y, ray.origin.z],
            inv_direction: [inv.x, inv.y, inv.z],
        }
    }
}

/// Clamp a search limit so unused slots (at `+inf`) never pass.
#[inline]
pub fn cull_limit(t_max: f64) -> f64 {
    t_max.min(f64::MAX)
}

/// Test `ray` against all K slots of `node` at once.
///
/// Bit `i` of the result is set iff slot `i`'s box satisfies
/// `t_near <= t_far && t_far >= 0 && t_near <= t_max`. Each axis is
/// processed across every slot before the next, so the inner loops run
/// over contiguous lanes.
#[inline]
pub fn slab_test<const K: usize>(ray: &WideRay, node: &FlatNode<K>, t_max: f64) -> u32 {
    let mut t_near = [f64::NEG_INFINITY; K];
    let mut t_far = [f64::INFINITY; K];

    let axes = [
        (&node.min_x, &node.max_x),
        (&node.min_y, &node.max_y),
        (&node.min_z, &node.max_z),
    ];
    for (axis, (mins, maxs)) in axes.into_iter().enumerate() {
        let origin = ray.origin[axis];
        let inv = ray.inv_direction[axis];
        for lane in 0..K {
            let mut t0 = (f64::from(mins[lane]) - origin) * inv;
            let mut t1 = (f64::from(maxs[lane]) - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            // f64::max/min drop a NaN operand (0 * inf on a box face).
            t_near[lane] = t_near[lane].max(t0);
            t_far[lane] = t_far[lane].min(t1);
        }
    }

    let mut mask = 0;
    for lane in 0..K {
        if t_near[lane] <= t_far[lane] && t_far[lane] >= 0.0 && t_near[lane] <= t_max {
            mask |= 1 << lane;
        }
    }
    mask
}
