//! Capsule: the set of points within `radius` of an axial segment.

use geocell_math::{axis_unit, norm, Aabb3, Scalar, Vec3};
use geocell_mesh::{tessellate_capsule, TessellationParams, TriangleMesh};

use crate::cylinder::lateral_roots;
use crate::shape::{check_axis, check_length, Projection};
use crate::sphere::sphere_roots;
use crate::{CellKind, ClosestPoint, Distance, Shape, ShapeError};

/// A capsule around the segment `[-half_height, half_height]` on axis `axis`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capsule<S: Scalar> {
    axis: usize,
    radius: S,
    half_height: S,
}

impl<S: Scalar> Capsule<S> {
    /// Create a capsule, validating the axis index and both lengths.
    pub fn new(axis: usize, radius: S, half_height: S) -> Result<Self, ShapeError> {
        Ok(Self {
            axis: check_axis(axis)?,
            radius: check_length("radius", radius)?,
            half_height: check_length("half_height", half_height)?,
        })
    }

    /// Principal axis index.
    pub fn axis(&self) -> usize {
        self.axis
    }

    /// Radius of the band and of both end caps.
    pub fn radius(&self) -> S {
        self.radius
    }

    /// Half-length of the inner segment.
    pub fn half_height(&self) -> S {
        self.half_height
    }

    fn project(&self, p: &Vec3<S>) -> Projection<S> {
        let a = self.axis;
        let center = axis_unit::<S>(a) * p[a].clamp_to(-self.half_height, self.half_height);
        let offset = p - center;
        let d = norm(&offset);
        let u = if d > S::zero() {
            offset / d
        } else {
            axis_unit((a + 1) % 3)
        };
        let inside = d <= self.radius;
        Projection {
            point: center + u * self.radius,
            inside,
            distance: if inside { self.radius - d } else { d - self.radius },
            normal: u,
            vertex_normal: u,
        }
    }
}

impl<S: Scalar> Shape<S> for Capsule<S> {
    fn mesh(&self, resolution: u32) -> TriangleMesh {
        tessellate_capsule(
            self.axis,
            self.radius.to_f64(),
            self.half_height.to_f64(),
            &TessellationParams::from_resolution(resolution),
        )
    }

    fn bounding_box(&self) -> Aabb3<S> {
        let mut h = Vec3::from_element(self.radius);
        h[self.axis] = self.half_height + self.radius;
        Aabb3::from_half_extents(&h)
    }

    fn dist(&self, pt: &Vec3<S>) -> Distance<S> {
        self.project(pt).to_distance()
    }

    fn closest(&self, pt: &Vec3<S>, vertex_normal: bool) -> ClosestPoint<S> {
        self.project(pt).to_closest(vertex_normal)
    }

    fn ray_query(&self, origin: &Vec3<S>, dir: &Vec3<S>) -> S {
        let a = self.axis;
        let h = self.half_height;
        let mut best = S::infinity();
        let mut keep = |t: S, on_surface: bool| {
            if t >= S::zero() && on_surface {
                best = best.fmin(t);
            }
        };

        if let Some((t0, t1)) = lateral_roots(a, self.radius, origin, dir) {
            for t in [t0, t1] {
                keep(t, (origin[a] + dir[a] * t).abs() <= h);
            }
        }
        // Only the outer half of each end sphere belongs to the surface.
        for s in [S::one(), -S::one()] {
            let center = axis_unit::<S>(a) * (s * h);
            if let Some((t0, t1)) = sphere_roots(&center, self.radius, origin, dir) {
                for t in [t0, t1] {
                    keep(t, (origin[a] + dir[a] * t) * s >= h);
                }
            }
        }
        best
    }

    fn kind(&self) -> CellKind {
        CellKind::Capsule
    }
}
