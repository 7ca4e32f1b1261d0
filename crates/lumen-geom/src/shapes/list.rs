//! Brute-force aggregate: tests every member in order.

use std::sync::Arc;

use lumen_math::{Aabb, Ray};

use crate::{HitRecord, Hitable, MaterialRef};

/// Widening of the interval when re-asking the nearest primitive for its
/// edge flag, so the re-query still finds the same hit.
const EDGE_REQUERY_EPSILON: f64 = 1e-8;

/// A flat list of primitives, intersected by linear scan.
///
/// This is the reference every hierarchy must agree with.
#[derive(Debug, Clone, Default)]
pub struct HitableList {
    items: Vec<Arc<dyn Hitable>>,
}

impl HitableList {
    /// Create a list from its members.
    pub fn new(items: Vec<Arc<dyn Hitable>>) -> Self {
        Self { items }
    }

    /// Append a member.
    pub fn push(&mut self, item: Arc<dyn Hitable>) {
        self.items.push(item);
    }

    /// The members, in insertion order.
    pub fn items(&self) -> &[Arc<dyn Hitable>] {
        &self.items
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list has no members.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The nearest member hit, with its record.
    fn closest(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<(usize, HitRecord, MaterialRef)> {
        let mut closest = None;
        let mut closest_t = t_max;
        for (index, item) in self.items.iter().enumerate() {
            if let Some((rec, material)) = item.hit(ray, t_min, closest_t) {
                closest_t = rec.t;
                closest = Some((index, rec, material));
            }
        }
        closest
    }
}

impl From<Vec<Arc<dyn Hitable>>> for HitableList {
    fn from(items: Vec<Arc<dyn Hitable>>) -> Self {
        Self::new(items)
    }
}

impl Hitable for HitableList {
    fn bounding_box(&self, time0: f64, time1: f64) -> Option<Aabb> {
        let (first, rest) = self.items.split_first()?;
        let mut bbox = first.bounding_box(time0, time1)?;
        for item in rest {
            bbox = bbox.union(&item.bounding_box(time0, time1)?);
        }
        Some(bbox)
    }

    fn hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<(HitRecord, MaterialRef)> {
        self.closest(ray, t_min, t_max)
            .map(|(_, rec, material)| (rec, material))
    }

    fn hit_edge(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<(HitRecord, bool)> {
        let (index, rec, _) = self.closest(ray, t_min, t_max)?;
        self.items[index].hit_edge(ray, t_min, rec.t + EDGE_REQUERY_EPSILON)
    }
}
