#![warn(missing_docs)]

//! Intersectable primitives for the lumen renderer.
//!
//! This crate defines the capability contract every piece of scene geometry
//! offers to the acceleration structures, plus the primitive set the
//! renderer ships with.
//!
//! # Architecture
//!
//! - [`Hitable`] - bounding box, nearest hit and edge hit; all the
//!   acceleration structures ever ask of a primitive
//! - [`Sampleable`] - PDF and direction sampling for emitter geometry only
//! - [`HitRecord`] / [`MaterialRef`] - what a successful hit reports
//! - [`shapes`] - spheres, triangles, axis-aligned rectangles and the
//!   wrappers that transform them
//!
//! # Example
//!
//! ```
//! use lumen_geom::{Hitable, MaterialRef, shapes::Sphere};
//! use lumen_math::{Point3, Ray, Vec3};
//!
//! let sphere = Sphere::new(Point3::new(0.0, 0.0, -5.0), 1.0, MaterialRef::new(0));
//! let ray = Ray::new(Point3::origin(), Vec3::new(0.0, 0.0, -1.0));
//!
//! let (rec, _material) = sphere.hit(&ray, 0.001, f64::INFINITY).unwrap();
//! assert!((rec.t - 4.0).abs() < 1e-9);
//! ```

mod hitable;
pub mod shapes;

pub use hitable::{HitRecord, Hitable, MaterialRef, Sampleable};
