#![warn(missing_docs)]

//! Math types for the geocell query engine.
//!
//! Thin layer over nalgebra providing the pieces every geometry cell needs:
//! the [`Scalar`] backend trait (with `f64` and the extended-precision
//! [`Quad`]), generic vector aliases, rigid [`Transform`]s and [`Aabb3`]
//! boxes.

mod aabb;
mod quad;
mod scalar;
mod transform;

pub use aabb::Aabb3;
pub use quad::Quad;
pub use scalar::Scalar;
pub use transform::{Transform, TransformError, RIGID_TOLERANCE};

use nalgebra::Vector3;

/// A point or vector in 3D space.
pub type Vec3<S> = Vector3<S>;

/// Euclidean length of `v`.
#[inline]
pub fn norm<S: Scalar>(v: &Vec3<S>) -> S {
    v.dot(v).sqrt()
}

/// `v / |v|`, or `fallback` when `v` has zero length.
pub fn normalize_or<S: Scalar>(v: &Vec3<S>, fallback: Vec3<S>) -> Vec3<S> {
    let len = norm(v);
    if len.is_zero() || !len.is_finite() {
        fallback
    } else {
        *v / len
    }
}

/// The unit vector along coordinate axis `axis` (0 = X, 1 = Y, 2 = Z).
///
/// # Panics
///
/// Panics if `axis > 2`; callers validate axis indices at construction.
pub fn axis_unit<S: Scalar>(axis: usize) -> Vec3<S> {
    let mut v = Vec3::zeros();
    v[axis] = S::one();
    v
}
