//! Solid ball centered at the origin.

use geocell_math::{norm, Aabb3, Scalar, Vec3};
use geocell_mesh::{tessellate_sphere, TessellationParams, TriangleMesh};

use crate::shape::{check_length, Projection};
use crate::{CellKind, ClosestPoint, Distance, Shape, ShapeError};

/// A ball of radius `radius` centered at the local origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere<S: Scalar> {
    radius: S,
}

impl<S: Scalar> Sphere<S> {
    /// Create a sphere, validating the radius.
    pub fn new(radius: S) -> Result<Self, ShapeError> {
        Ok(Self {
            radius: check_length("radius", radius)?,
        })
    }

    /// Radius.
    pub fn radius(&self) -> S {
        self.radius
    }

    fn project(&self, p: &Vec3<S>) -> Projection<S> {
        let r = norm(p);
        let u = if r > S::zero() { p / r } else { Vec3::x() };
        let inside = r <= self.radius;
        Projection {
            point: u * self.radius,
            inside,
            distance: if inside { self.radius - r } else { r - self.radius },
            normal: u,
            vertex_normal: u,
        }
    }
}

/// Ray parameters where `origin + t * dir` meets the sphere of `radius`
/// around `center`, in increasing order.
pub(crate) fn sphere_roots<S: Scalar>(
    center: &Vec3<S>,
    radius: S,
    origin: &Vec3<S>,
    dir: &Vec3<S>,
) -> Option<(S, S)> {
    let oc = origin - center;
    let a = dir.dot(dir);
    if a.is_zero() {
        return None;
    }
    let half_b = oc.dot(dir);
    let c = oc.dot(&oc) - radius * radius;
    let disc = half_b * half_b - a * c;
    if disc < S::zero() {
        return None;
    }
    let root = disc.sqrt();
    Some(((-half_b - root) / a, (-half_b + root) / a))
}

impl<S: Scalar> Shape<S> for Sphere<S> {
    fn mesh(&self, resolution: u32) -> TriangleMesh {
        tessellate_sphere(
            self.radius.to_f64(),
            &TessellationParams::from_resolution(resolution),
        )
    }

    fn bounding_box(&self) -> Aabb3<S> {
        Aabb3::from_half_extents(&Vec3::from_element(self.radius))
    }

    fn dist(&self, pt: &Vec3<S>) -> Distance<S> {
        self.project(pt).to_distance()
    }

    fn closest(&self, pt: &Vec3<S>, vertex_normal: bool) -> ClosestPoint<S> {
        self.project(pt).to_closest(vertex_normal)
    }

    fn ray_query(&self, origin: &Vec3<S>, dir: &Vec3<S>) -> S {
        match sphere_roots(&Vec3::zeros(), self.radius, origin, dir) {
            Some((t0, _)) if t0 >= S::zero() => t0,
            Some((_, t1)) if t1 >= S::zero() => t1,
            _ => S::infinity(),
        }
    }

    fn kind(&self) -> CellKind {
        CellKind::Sphere
    }
}
