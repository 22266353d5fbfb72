#![warn(missing_docs)]

//! Geometry cells for the geocell query engine.
//!
//! A geometry tree is built from primitive cells ([`Cylinder`], [`Sphere`],
//! [`Cuboid`], [`Capsule`]) placed under rigid transforms and grouped by
//! [`Composite`] cells. Every node is a [`GeomCell`] and answers the same
//! queries (distance, closest point, ray intersection, bounding box, mesh)
//! in its parent frame, so the root of a tree is queried exactly like a
//! single primitive.
//!
//! ```
//! use geocell_cells::GeomCell;
//! use geocell_math::{Transform, Vec3};
//!
//! let a = GeomCell::cylinder(2, 1.0, 2.0, Transform::translation(3.0, 0.0, 0.0))?.into_ref();
//! let b = GeomCell::cylinder(2, 1.0, 2.0, Transform::translation(-3.0, 0.0, 0.0))?.into_ref();
//! let root = GeomCell::composite(vec![a, b], Transform::identity());
//!
//! let d = root.dist(&Vec3::zeros());
//! assert!(!d.inside);
//! assert!((d.distance - 2.0).abs() < 1e-12);
//! assert_eq!(root.ray_hit(&Vec3::zeros(), &Vec3::x()), Some(2.0));
//! # Ok::<(), geocell_cells::ShapeError>(())
//! ```

mod capsule;
mod cell;
mod composite;
mod cuboid;
mod cylinder;
mod error;
mod shape;
mod sphere;

pub use capsule::Capsule;
pub use cell::{CellRef, CellShape, GeomCell, DEFAULT_RESOLUTION};
pub use composite::Composite;
pub use cuboid::Cuboid;
pub use cylinder::Cylinder;
pub use error::ShapeError;
pub use shape::{CellKind, ClosestPoint, Distance, Shape};
pub use sphere::Sphere;
