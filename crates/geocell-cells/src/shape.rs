//! The query protocol shared by every geometry cell.

use std::fmt;

use geocell_math::{Aabb3, Scalar, Transform, Vec3};
use geocell_mesh::TriangleMesh;

use crate::ShapeError;

/// The kind of a cell (for match-based dispatch and serialization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    /// Finite solid cylinder.
    Cylinder,
    /// Solid ball.
    Sphere,
    /// Axis-aligned box.
    Cuboid,
    /// Cylinder with hemispherical ends.
    Capsule,
    /// Rigid composition of child cells.
    Composite,
}

impl CellKind {
    /// All kinds, in tag order.
    pub const ALL: [CellKind; 5] = [
        CellKind::Cylinder,
        CellKind::Sphere,
        CellKind::Cuboid,
        CellKind::Capsule,
        CellKind::Composite,
    ];

    /// Binary record tag.
    pub fn tag(self) -> u8 {
        match self {
            CellKind::Cylinder => 1,
            CellKind::Sphere => 2,
            CellKind::Cuboid => 3,
            CellKind::Capsule => 4,
            CellKind::Composite => 5,
        }
    }

    /// Inverse of [`CellKind::tag`].
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.tag() == tag)
    }

    /// Lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            CellKind::Cylinder => "cylinder",
            CellKind::Sphere => "sphere",
            CellKind::Cuboid => "cuboid",
            CellKind::Capsule => "capsule",
            CellKind::Composite => "composite",
        }
    }
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of a distance query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distance<S: Scalar> {
    /// The query point lies inside or on the surface.
    pub inside: bool,
    /// Unsigned distance to the nearest boundary point.
    pub distance: S,
    /// Unit outward normal at the nearest boundary point.
    pub normal: Vec3<S>,
}

impl<S: Scalar> Distance<S> {
    /// Distance with the usual SDF sign: negative inside.
    pub fn signed(&self) -> S {
        if self.inside {
            -self.distance
        } else {
            self.distance
        }
    }

    /// Result for a cell with no geometry: outside, infinitely far.
    pub fn nothing() -> Self {
        Self {
            inside: false,
            distance: S::infinity(),
            normal: Vec3::zeros(),
        }
    }

    /// Rotate the normal into the parent frame.
    pub fn transformed(mut self, t: &Transform<S>) -> Self {
        self.normal = t.apply_vec(&self.normal);
        self
    }
}

/// Result of a closest-point query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPoint<S: Scalar> {
    /// Nearest point on the boundary.
    pub point: Vec3<S>,
    /// The query point lies inside or on the surface.
    pub inside: bool,
    /// Unsigned distance from the query point to `point`.
    pub distance: S,
    /// Outward face normal at `point`.
    pub normal: Vec3<S>,
    /// Smoothed normal at `point`, only filled when requested.
    ///
    /// Equals `normal` on face interiors; on edges it blends the normals of
    /// the adjacent faces.
    pub vertex_normal: Option<Vec3<S>>,
}

impl<S: Scalar> ClosestPoint<S> {
    /// Result for a cell with no geometry: the query point itself, infinitely far.
    pub fn nothing(pt: &Vec3<S>) -> Self {
        Self {
            point: *pt,
            inside: false,
            distance: S::infinity(),
            normal: Vec3::zeros(),
            vertex_normal: None,
        }
    }

    /// Map point and normals into the parent frame.
    pub fn transformed(mut self, t: &Transform<S>) -> Self {
        self.point = t.apply_point(&self.point);
        self.normal = t.apply_vec(&self.normal);
        self.vertex_normal = self.vertex_normal.map(|n| t.apply_vec(&n));
        self
    }
}

/// Local-frame queries implemented by every cell variant.
///
/// Points, rays, boxes and meshes are expressed in the shape's own frame;
/// [`GeomCell`](crate::GeomCell) maps them to and from its parent frame.
pub trait Shape<S: Scalar>: Send + Sync + fmt::Debug {
    /// Triangulated surface at the given resolution.
    fn mesh(&self, resolution: u32) -> TriangleMesh;

    /// Axis-aligned box containing the shape.
    fn bounding_box(&self) -> Aabb3<S>;

    /// Inside flag, unsigned distance and outward normal for `pt`.
    fn dist(&self, pt: &Vec3<S>) -> Distance<S>;

    /// Nearest boundary point to `pt`.
    fn closest(&self, pt: &Vec3<S>, vertex_normal: bool) -> ClosestPoint<S>;

    /// Smallest `t >= 0` with `origin + t * dir` on the surface, or
    /// `S::infinity()` on a miss. `dir` need not be unit length.
    fn ray_query(&self, origin: &Vec3<S>, dir: &Vec3<S>) -> S;

    /// The kind of this shape.
    fn kind(&self) -> CellKind;
}

/// Full nearest-boundary answer computed once by each primitive and then
/// narrowed into [`Distance`] or [`ClosestPoint`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Projection<S: Scalar> {
    pub point: Vec3<S>,
    pub inside: bool,
    pub distance: S,
    pub normal: Vec3<S>,
    pub vertex_normal: Vec3<S>,
}

impl<S: Scalar> Projection<S> {
    pub fn to_distance(&self) -> Distance<S> {
        Distance {
            inside: self.inside,
            distance: self.distance,
            normal: self.normal,
        }
    }

    pub fn to_closest(&self, vertex_normal: bool) -> ClosestPoint<S> {
        ClosestPoint {
            point: self.point,
            inside: self.inside,
            distance: self.distance,
            normal: self.normal,
            vertex_normal: vertex_normal.then_some(self.vertex_normal),
        }
    }
}

pub(crate) fn check_axis(axis: usize) -> Result<usize, ShapeError> {
    if axis < 3 {
        Ok(axis)
    } else {
        Err(ShapeError::InvalidAxis(axis))
    }
}

pub(crate) fn check_length<S: Scalar>(name: &'static str, value: S) -> Result<S, ShapeError> {
    if value.is_finite() && value >= S::zero() {
        Ok(value)
    } else {
        Err(ShapeError::parameter(name, value.to_f64()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_roundtrip() {
        for kind in CellKind::ALL {
            assert_eq!(CellKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(CellKind::from_tag(0), None);
        assert_eq!(CellKind::from_tag(0xFF), None);
        assert_eq!(CellKind::Capsule.to_string(), "capsule");
    }

    #[test]
    fn test_signed_distance() {
        let d = Distance {
            inside: true,
            distance: 0.5,
            normal: Vec3::new(1.0, 0.0, 0.0),
        };
        assert_eq!(d.signed(), -0.5);
        assert!(Distance::<f64>::nothing().distance.is_infinite());
    }

    #[test]
    fn test_check_length() {
        assert!(check_length("radius", 0.0).is_ok());
        assert_eq!(
            check_length("radius", -1.0),
            Err(ShapeError::parameter("radius", -1.0))
        );
        assert!(check_length("radius", f64::NAN).is_err());
        assert!(check_length("radius", f64::INFINITY).is_err());
        assert_eq!(check_axis(3), Err(ShapeError::InvalidAxis(3)));
    }
}
