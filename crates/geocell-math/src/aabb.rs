//! Axis-aligned bounding boxes.

use crate::{Scalar, Transform, Vec3};

/// Axis-aligned bounding box in 3D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3<S: Scalar> {
    /// Minimum corner.
    pub min: Vec3<S>,
    /// Maximum corner.
    pub max: Vec3<S>,
}

impl<S: Scalar> Aabb3<S> {
    /// Create an AABB from min and max corners.
    pub fn new(min: Vec3<S>, max: Vec3<S>) -> Self {
        Self { min, max }
    }

    /// A box centered at the origin with the given half-extents.
    pub fn from_half_extents(h: &Vec3<S>) -> Self {
        Self::new(-*h, *h)
    }

    /// Create an empty (inverted) AABB suitable for expansion.
    pub fn empty() -> Self {
        let inf = S::infinity();
        Self {
            min: Vec3::new(inf, inf, inf),
            max: Vec3::new(-inf, -inf, -inf),
        }
    }

    /// True if no point has been included yet.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand this AABB to include a point.
    pub fn include_point(&mut self, p: &Vec3<S>) {
        for i in 0..3 {
            self.min[i] = self.min[i].fmin(p[i]);
            self.max[i] = self.max[i].fmax(p[i]);
        }
    }

    /// Expand this AABB to include another box. Empty boxes are ignored.
    pub fn include_box(&mut self, other: &Aabb3<S>) {
        if other.is_empty() {
            return;
        }
        self.include_point(&other.min);
        self.include_point(&other.max);
    }

    /// Test if two AABBs overlap (touching counts as overlap).
    pub fn overlaps(&self, other: &Aabb3<S>) -> bool {
        (0..3).all(|i| self.min[i] <= other.max[i] && self.max[i] >= other.min[i])
    }

    /// True if `p` lies inside or on the box, with slack `tol`.
    pub fn contains_point(&self, p: &Vec3<S>, tol: S) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] - tol && p[i] <= self.max[i] + tol)
    }

    /// Expand the AABB by a tolerance in all directions.
    pub fn expand(&mut self, tol: S) {
        for i in 0..3 {
            self.min[i] -= tol;
            self.max[i] += tol;
        }
    }

    /// The eight corners, `x` varying fastest.
    pub fn corners(&self) -> [Vec3<S>; 8] {
        let (a, b) = (&self.min, &self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Box of the eight transformed corners.
    ///
    /// Sound but not tight: a rotated box is bounded by its corners, so the
    /// result always contains the transformed volume.
    pub fn transformed(&self, t: &Transform<S>) -> Aabb3<S> {
        if self.is_empty() {
            return *self;
        }
        let mut out = Aabb3::empty();
        for c in self.corners().iter() {
            out.include_point(&t.apply_point(c));
        }
        out
    }

    /// Center point (undefined for empty boxes).
    pub fn center(&self) -> Vec3<S> {
        (self.min + self.max) * S::from_f64(0.5)
    }

    /// Edge lengths along each axis.
    pub fn extent(&self) -> Vec3<S> {
        self.max - self.min
    }
}

impl<S: Scalar> Default for Aabb3<S> {
    fn default() -> Self {
        Self::empty()
    }
}
