//! Axis-aligned box centered at the origin.

use geocell_math::{norm, normalize_or, Aabb3, Scalar, Vec3};
use geocell_mesh::{tessellate_cuboid, TriangleMesh};

use crate::shape::{check_length, Projection};
use crate::{CellKind, ClosestPoint, Distance, Shape, ShapeError};

/// A box spanning `[-h_i, h_i]` on each local axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cuboid<S: Scalar> {
    half_extents: Vec3<S>,
}

impl<S: Scalar> Cuboid<S> {
    /// Create a box from its half-extents.
    pub fn new(hx: S, hy: S, hz: S) -> Result<Self, ShapeError> {
        Ok(Self {
            half_extents: Vec3::new(
                check_length("hx", hx)?,
                check_length("hy", hy)?,
                check_length("hz", hz)?,
            ),
        })
    }

    /// Half-extents along X, Y and Z.
    pub fn half_extents(&self) -> Vec3<S> {
        self.half_extents
    }

    /// Sum of the outward normals of every face containing `point`,
    /// normalized; falls back to `fallback` on face interiors.
    fn edge_normal(&self, point: &Vec3<S>, fallback: Vec3<S>) -> Vec3<S> {
        let h = &self.half_extents;
        let mut sum = Vec3::zeros();
        let mut faces = 0;
        for i in 0..3 {
            if point[i].abs() >= h[i] {
                sum[i] = if point[i] >= S::zero() { S::one() } else { -S::one() };
                faces += 1;
            }
        }
        if faces > 1 {
            normalize_or(&sum, fallback)
        } else {
            fallback
        }
    }

    fn project(&self, p: &Vec3<S>) -> Projection<S> {
        let h = &self.half_extents;
        let inside = (0..3).all(|i| p[i].abs() <= h[i]);

        if inside {
            // Nearest face: smallest gap, ties to the lowest axis.
            let mut axis = 0;
            let mut gap = h[0] - p[0].abs();
            for i in 1..3 {
                let g = h[i] - p[i].abs();
                if g < gap {
                    axis = i;
                    gap = g;
                }
            }
            let s = if p[axis] >= S::zero() { S::one() } else { -S::one() };
            let mut point = *p;
            point[axis] = s * h[axis];
            let mut normal = Vec3::zeros();
            normal[axis] = s;
            return Projection {
                point,
                inside: true,
                distance: gap,
                normal,
                vertex_normal: self.edge_normal(&point, normal),
            };
        }

        let mut point = *p;
        for i in 0..3 {
            point[i] = p[i].clamp_to(-h[i], h[i]);
        }
        let offset = p - point;
        let normal = normalize_or(&offset, Vec3::x());
        Projection {
            point,
            inside: false,
            distance: norm(&offset),
            normal,
            vertex_normal: self.edge_normal(&point, normal),
        }
    }
}

impl<S: Scalar> Shape<S> for Cuboid<S> {
    /// Twelve triangles; the resolution is ignored.
    fn mesh(&self, _resolution: u32) -> TriangleMesh {
        let h = &self.half_extents;
        tessellate_cuboid([h.x.to_f64(), h.y.to_f64(), h.z.to_f64()])
    }

    fn bounding_box(&self) -> Aabb3<S> {
        Aabb3::from_half_extents(&self.half_extents)
    }

    fn dist(&self, pt: &Vec3<S>) -> Distance<S> {
        self.project(pt).to_distance()
    }

    fn closest(&self, pt: &Vec3<S>, vertex_normal: bool) -> ClosestPoint<S> {
        self.project(pt).to_closest(vertex_normal)
    }

    /// Slab method.
    fn ray_query(&self, origin: &Vec3<S>, dir: &Vec3<S>) -> S {
        let h = &self.half_extents;
        let mut t_min = -S::infinity();
        let mut t_max = S::infinity();
        for i in 0..3 {
            if dir[i].is_zero() {
                if origin[i].abs() > h[i] {
                    return S::infinity();
                }
                continue;
            }
            let mut t1 = (-h[i] - origin[i]) / dir[i];
            let mut t2 = (h[i] - origin[i]) / dir[i];
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.fmax(t1);
            t_max = t_max.fmin(t2);
        }
        if t_max < t_min || t_max < S::zero() {
            S::infinity()
        } else if t_min >= S::zero() {
            t_min
        } else {
            // origin inside: the surface is met on the way out
            t_max
        }
    }

    fn kind(&self) -> CellKind {
        CellKind::Cuboid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn v(x: f64, y: f64, z: f64) -> Vec3<f64> {
        Vec3::new(x, y, z)
    }

    fn sample() -> Cuboid<f64> {
        Cuboid::new(1.0, 2.0, 3.0).unwrap()
    }

    #[test]
    fn test_inside_nearest_face() {
        let d = sample().dist(&v(0.0, 1.5, 0.0));
        assert!(d.inside);
        assert_relative_eq!(d.distance, 0.5);
        assert_eq!(d.normal, v(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_inside_tie_goes_to_lowest_axis() {
        let c = Cuboid::new(1.0, 1.0, 1.0).unwrap();
        let d = c.dist(&v(0.0, 0.0, 0.0));
        assert_eq!(d.normal, v(1.0, 0.0, 0.0));
        let d = c.dist(&v(0.0, -0.5, -0.5));
        assert_eq!(d.normal, v(0.0, -1.0, 0.0));
    }

    #[test]
    fn test_outside_face_and_corner() {
        let c = sample();
        let cp = c.closest(&v(3.0, 0.0, 0.0), true);
        assert!(!cp.inside);
        assert_eq!(cp.point, v(1.0, 0.0, 0.0));
        assert_eq!(cp.normal, v(1.0, 0.0, 0.0));
        assert_eq!(cp.vertex_normal, Some(v(1.0, 0.0, 0.0)));

        let cp = c.closest(&v(2.0, 3.0, 0.0), true);
        assert_eq!(cp.point, v(1.0, 2.0, 0.0));
        assert_relative_eq!(cp.distance, 2f64.sqrt());
        let h = std::f64::consts::FRAC_1_SQRT_2;
        assert_relative_eq!(cp.normal, v(h, h, 0.0), epsilon = 1e-15);
        assert_relative_eq!(cp.vertex_normal.unwrap(), v(h, h, 0.0), epsilon = 1e-15);
    }

    #[test]
    fn test_slab_ray() {
        let c = sample();
        assert_relative_eq!(c.ray_query(&v(-5.0, 0.0, 0.0), &v(1.0, 0.0, 0.0)), 4.0);
        assert_relative_eq!(c.ray_query(&v(0.0, 0.0, 0.0), &v(0.0, 0.0, 1.0)), 3.0);
        assert!(c.ray_query(&v(-5.0, 5.0, 0.0), &v(1.0, 0.0, 0.0)).is_infinite());
        assert!(c.ray_query(&v(-5.0, 0.0, 0.0), &v(-1.0, 0.0, 0.0)).is_infinite());
        // diagonal entry through the x face
        assert_relative_eq!(c.ray_query(&v(-2.0, -1.0, 0.0), &v(1.0, 1.0, 0.0)), 1.0);
    }

    #[test]
    fn test_mesh_ignores_resolution() {
        let c = sample();
        assert_eq!(c.mesh(3), c.mesh(64));
        assert_relative_eq!(c.mesh(8).signed_volume(), 48.0, epsilon = 1e-12);
    }
}
