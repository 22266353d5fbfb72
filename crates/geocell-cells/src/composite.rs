//! Rigid composition of child cells.
//!
//! A composite owns no geometry of its own; it only defines the frame its
//! children are placed in. Children are shared [`CellRef`] handles, so the
//! same cell may sit under several composites. The child list is fixed at
//! construction, which keeps every tree acyclic.

use geocell_math::{Aabb3, Scalar, Vec3};
use geocell_mesh::TriangleMesh;
use tracing::trace;

use crate::{CellKind, CellRef, ClosestPoint, Distance, Shape};

/// An ordered list of shared children.
#[derive(Debug, Clone)]
pub struct Composite<S: Scalar> {
    children: Vec<CellRef<S>>,
    depth: usize,
}

impl<S: Scalar> Composite<S> {
    /// Create a composite over `children`, in query order.
    pub fn new(children: Vec<CellRef<S>>) -> Self {
        let depth = 1 + children.iter().map(|c| c.depth()).max().unwrap_or(0);
        trace!(children = children.len(), depth, "composite built");
        Self { children, depth }
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// True when there are no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Child at `index`.
    pub fn child(&self, index: usize) -> Option<&CellRef<S>> {
        self.children.get(index)
    }

    /// All direct children.
    pub fn children(&self) -> &[CellRef<S>] {
        &self.children
    }

    /// Levels in the subtree rooted here (a composite of primitives is 2).
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl<S: Scalar> Shape<S> for Composite<S> {
    /// Union of the child meshes, each at the child's own resolution.
    fn mesh(&self, _resolution: u32) -> TriangleMesh {
        let mut mesh = TriangleMesh::new();
        for child in &self.children {
            mesh.merge(&child.mesh());
        }
        mesh
    }

    fn bounding_box(&self) -> Aabb3<S> {
        let mut bbox = Aabb3::empty();
        for child in &self.children {
            bbox.include_box(&child.bounding_box());
        }
        bbox
    }

    fn dist(&self, pt: &Vec3<S>) -> Distance<S> {
        let mut best = Distance::nothing();
        for child in &self.children {
            let d = child.dist(pt);
            if d.distance < best.distance {
                best = d;
            }
        }
        best
    }

    fn closest(&self, pt: &Vec3<S>, vertex_normal: bool) -> ClosestPoint<S> {
        let mut best = ClosestPoint::nothing(pt);
        for child in &self.children {
            let cp = child.closest(pt, vertex_normal);
            if cp.distance < best.distance {
                best = cp;
            }
        }
        best
    }

    fn ray_query(&self, origin: &Vec3<S>, dir: &Vec3<S>) -> S {
        self.children
            .iter()
            .map(|c| c.ray_query(origin, dir))
            .fold(S::infinity(), |a, b| a.fmin(b))
    }

    fn kind(&self) -> CellKind {
        CellKind::Composite
    }
}
