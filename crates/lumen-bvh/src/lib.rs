#![warn(missing_docs)]

//! Bounding volume hierarchies for the lumen renderer.
//!
//! Organizes a list of [`Hitable`](lumen_geom::Hitable) primitives so that
//! nearest-hit queries touch only the primitives near the ray.
//!
//! # Architecture
//!
//! Construction runs in two passes:
//!
//! 1. [`build_tree`] sorts primitives along a randomly chosen axis and splits
//!    at the midpoint, recursively, into a binary tree.
//! 2. [`flatten`] collapses binary levels into K-wide [`FlatNode`]s, gives
//!    every binary leaf a node of its own (or, optionally, stores it in its
//!    parent's slot) and rounds every box outward to float32.
//!
//! Queries walk the flat array with a fixed 64-entry stack, testing all K
//! slots of a node at once with [`slab_test`]. [`BinaryBvh`] keeps the
//! binary tree instead and serves as the simple reference.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use lumen_bvh::Bvh8;
//! use lumen_geom::{shapes::Sphere, Hitable, MaterialRef};
//! use lumen_math::{Point3, Ray, Vec3};
//!
//! let spheres: Vec<Arc<dyn Hitable>> = (0..100)
//!     .map(|i| {
//!         let center = Point3::new(i as f64 * 3.0, 0.0, -10.0);
//!         Arc::new(Sphere::new(center, 1.0, MaterialRef::new(0))) as Arc<dyn Hitable>
//!     })
//!     .collect();
//!
//! let bvh = Bvh8::build(spheres, 0.0, 1.0)?;
//! assert!(bvh.validate().is_empty());
//!
//! let ray = Ray::new(Point3::new(30.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -1.0));
//! let (rec, _material) = bvh.hit(&ray, 0.001, f64::INFINITY).expect("ray hits sphere 10");
//! assert!((rec.t - 9.0).abs() < 1e-9);
//! # Ok::<(), lumen_bvh::BuildError>(())
//! ```

mod binary;
pub mod build;
mod diagnostics;
pub mod error;
pub mod flatten;
mod settings;
pub mod slab;
mod wide;

#[cfg(test)]
mod testing;

pub use binary::BinaryBvh;
pub use build::{build_tree, BuildNode};
pub use diagnostics::{stats, validate, Bounds32, Stats};
pub use error::{BuildError, IntegrityError, Result};
pub use flatten::{collect_children, flatten, FlatNode};
pub use settings::BuildSettings;
pub use slab::{slab_test, WideRay};
pub use wide::{Bvh4, Bvh8, Hierarchy, MAX_FAN_OUT, STACK_CAPACITY};
