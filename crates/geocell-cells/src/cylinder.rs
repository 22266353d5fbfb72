//! Finite solid cylinder aligned with a coordinate axis.

use geocell_math::{axis_unit, norm, normalize_or, Aabb3, Scalar, Vec3};
use geocell_mesh::{tessellate_cylinder, TessellationParams, TriangleMesh};

use crate::shape::{check_axis, check_length, Projection};
use crate::{CellKind, ClosestPoint, Distance, Shape, ShapeError};

/// Relative threshold below which a ray counts as parallel to the axis.
const PARALLEL_EPS: f64 = 1e-24;

/// A closed cylinder centered at the origin.
///
/// The principal axis is coordinate axis `axis`; the solid spans
/// `[-half_height, half_height]` along it and `radius` around it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cylinder<S: Scalar> {
    axis: usize,
    radius: S,
    half_height: S,
}

impl<S: Scalar> Cylinder<S> {
    /// Create a cylinder, validating the axis index and both lengths.
    pub fn new(axis: usize, radius: S, half_height: S) -> Result<Self, ShapeError> {
        Ok(Self {
            axis: check_axis(axis)?,
            radius: check_length("radius", radius)?,
            half_height: check_length("half_height", half_height)?,
        })
    }

    /// Principal axis index (0 = X, 1 = Y, 2 = Z).
    pub fn axis(&self) -> usize {
        self.axis
    }

    /// Radius.
    pub fn radius(&self) -> S {
        self.radius
    }

    /// Half of the axial extent.
    pub fn half_height(&self) -> S {
        self.half_height
    }

    fn project(&self, p: &Vec3<S>) -> Projection<S> {
        let a = self.axis;
        let e = axis_unit::<S>(a);
        let (big_r, big_h) = (self.radius, self.half_height);

        let y = p[a];
        let mut q = *p;
        q[a] = S::zero();
        let r = norm(&q);
        // On the axis the radial direction is arbitrary; pick the next axis.
        let u = if r > S::zero() {
            q / r
        } else {
            axis_unit((a + 1) % 3)
        };
        let s = if y >= S::zero() { S::one() } else { -S::one() };
        let cap_normal = e * s;
        let rim_normal = normalize_or(&(u + cap_normal), u);
        let ay = y.abs();

        match (r > big_r, ay > big_h) {
            (false, false) => {
                let lateral_gap = big_r - r;
                let cap_gap = big_h - ay;
                if lateral_gap <= cap_gap {
                    Projection {
                        point: u * big_r + e * y,
                        inside: true,
                        distance: lateral_gap,
                        normal: u,
                        vertex_normal: if ay == big_h { rim_normal } else { u },
                    }
                } else {
                    Projection {
                        point: q + e * (s * big_h),
                        inside: true,
                        distance: cap_gap,
                        normal: cap_normal,
                        vertex_normal: if r == big_r { rim_normal } else { cap_normal },
                    }
                }
            }
            (true, false) => Projection {
                point: u * big_r + e * y,
                inside: false,
                distance: r - big_r,
                normal: u,
                vertex_normal: if ay == big_h { rim_normal } else { u },
            },
            (false, true) => Projection {
                point: q + e * (s * big_h),
                inside: false,
                distance: ay - big_h,
                normal: cap_normal,
                vertex_normal: if r == big_r { rim_normal } else { cap_normal },
            },
            (true, true) => {
                let rim = u * big_r + e * (s * big_h);
                let offset = p - rim;
                let distance = norm(&offset);
                Projection {
                    point: rim,
                    inside: false,
                    distance,
                    normal: normalize_or(&offset, rim_normal),
                    vertex_normal: rim_normal,
                }
            }
        }
    }
}

/// Roots of `|q(origin + t * dir)| = radius` where `q` drops the `axis`
/// component, or `None` when the ray is parallel to the axis or misses.
pub(crate) fn lateral_roots<S: Scalar>(
    axis: usize,
    radius: S,
    origin: &Vec3<S>,
    dir: &Vec3<S>,
) -> Option<(S, S)> {
    let mut oq = *origin;
    let mut dq = *dir;
    oq[axis] = S::zero();
    dq[axis] = S::zero();

    let a = dq.dot(&dq);
    if a <= dir.dot(dir) * S::from_f64(PARALLEL_EPS) {
        return None;
    }
    let half_b = oq.dot(&dq);
    let c = oq.dot(&oq) - radius * radius;
    let disc = half_b * half_b - a * c;
    if disc < S::zero() {
        return None;
    }
    let root = disc.sqrt();
    Some(((-half_b - root) / a, (-half_b + root) / a))
}

impl<S: Scalar> Shape<S> for Cylinder<S> {
    fn mesh(&self, resolution: u32) -> TriangleMesh {
        tessellate_cylinder(
            self.axis,
            self.radius.to_f64(),
            self.half_height.to_f64(),
            &TessellationParams::from_resolution(resolution),
        )
    }

    fn bounding_box(&self) -> Aabb3<S> {
        let mut h = Vec3::from_element(self.radius);
        h[self.axis] = self.half_height;
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
        let mut best = S::infinity();

        if let Some((t0, t1)) = lateral_roots(a, self.radius, origin, dir) {
            for t in [t0, t1] {
                if t >= S::zero() && (origin[a] + dir[a] * t).abs() <= self.half_height {
                    best = best.fmin(t);
                }
            }
        }

        if !dir[a].is_zero() {
            let r2 = self.radius * self.radius;
            for h in [self.half_height, -self.half_height] {
                let t = (h - origin[a]) / dir[a];
                if t < S::zero() {
                    continue;
                }
                let mut hit = origin + dir * t;
                hit[a] = S::zero();
                if hit.dot(&hit) <= r2 {
                    best = best.fmin(t);
                }
            }
        }
        best
    }

    fn kind(&self) -> CellKind {
        CellKind::Cylinder
    }
}
