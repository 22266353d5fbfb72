//! Geometry cell nodes: a shape placed in its parent frame.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use geocell_math::{Aabb3, Scalar, Transform, Vec3};
use geocell_mesh::TriangleMesh;

use crate::{
    Capsule, CellKind, ClosestPoint, Composite, Cuboid, Cylinder, Distance, Shape, ShapeError,
    Sphere,
};

/// Resolution given to new cells.
pub const DEFAULT_RESOLUTION: u32 = 32;

/// Shared handle to a cell. A cell lives as long as its longest holder.
pub type CellRef<S> = Arc<GeomCell<S>>;

/// The closed set of cell variants.
#[derive(Debug, Clone)]
pub enum CellShape<S: Scalar> {
    /// Finite cylinder.
    Cylinder(Cylinder<S>),
    /// Ball.
    Sphere(Sphere<S>),
    /// Axis-aligned box.
    Cuboid(Cuboid<S>),
    /// Capsule.
    Capsule(Capsule<S>),
    /// Composition of shared children.
    Composite(Composite<S>),
}

macro_rules! dispatch {
    ($shape:expr, $inner:ident => $call:expr) => {
        match $shape {
            CellShape::Cylinder($inner) => $call,
            CellShape::Sphere($inner) => $call,
            CellShape::Cuboid($inner) => $call,
            CellShape::Capsule($inner) => $call,
            CellShape::Composite($inner) => $call,
        }
    };
}

impl<S: Scalar> Shape<S> for CellShape<S> {
    fn mesh(&self, resolution: u32) -> TriangleMesh {
        dispatch!(self, s => s.mesh(resolution))
    }

    fn bounding_box(&self) -> Aabb3<S> {
        dispatch!(self, s => s.bounding_box())
    }

    fn dist(&self, pt: &Vec3<S>) -> Distance<S> {
        dispatch!(self, s => s.dist(pt))
    }

    fn closest(&self, pt: &Vec3<S>, vertex_normal: bool) -> ClosestPoint<S> {
        dispatch!(self, s => s.closest(pt, vertex_normal))
    }

    fn ray_query(&self, origin: &Vec3<S>, dir: &Vec3<S>) -> S {
        dispatch!(self, s => s.ray_query(origin, dir))
    }

    fn kind(&self) -> CellKind {
        dispatch!(self, s => s.kind())
    }
}

impl<S: Scalar> From<Cylinder<S>> for CellShape<S> {
    fn from(s: Cylinder<S>) -> Self {
        CellShape::Cylinder(s)
    }
}

impl<S: Scalar> From<Sphere<S>> for CellShape<S> {
    fn from(s: Sphere<S>) -> Self {
        CellShape::Sphere(s)
    }
}

impl<S: Scalar> From<Cuboid<S>> for CellShape<S> {
    fn from(s: Cuboid<S>) -> Self {
        CellShape::Cuboid(s)
    }
}

impl<S: Scalar> From<Capsule<S>> for CellShape<S> {
    fn from(s: Capsule<S>) -> Self {
        CellShape::Capsule(s)
    }
}

impl<S: Scalar> From<Composite<S>> for CellShape<S> {
    fn from(s: Composite<S>) -> Self {
        CellShape::Composite(s)
    }
}

/// A node of a geometry tree.
///
/// Holds a rigid local-to-parent transform, a tessellation resolution and a
/// shape. All query methods take and return parent-frame coordinates: the
/// query is mapped into the local frame by the inverse transform, answered
/// by the shape, and mapped back. Distances and ray parameters are
/// unchanged by rigid motions.
///
/// Shape parameters never change after construction. The resolution is
/// atomic so it can be adjusted through a shared [`CellRef`]; callers that
/// need a consistent mesh density must not race `set_resolution` against
/// [`GeomCell::mesh`].
#[derive(Debug)]
pub struct GeomCell<S: Scalar> {
    transform: Transform<S>,
    resolution: AtomicU32,
    shape: CellShape<S>,
}

impl<S: Scalar> GeomCell<S> {
    /// Create a cell from any shape variant.
    pub fn new(shape: impl Into<CellShape<S>>, transform: Transform<S>) -> Self {
        Self {
            transform,
            resolution: AtomicU32::new(DEFAULT_RESOLUTION),
            shape: shape.into(),
        }
    }

    /// Create a cylinder cell. See [`Cylinder::new`].
    pub fn cylinder(
        axis: usize,
        radius: S,
        half_height: S,
        transform: Transform<S>,
    ) -> Result<Self, ShapeError> {
        Ok(Self::new(Cylinder::new(axis, radius, half_height)?, transform))
    }

    /// Create a sphere cell.
    pub fn sphere(radius: S, transform: Transform<S>) -> Result<Self, ShapeError> {
        Ok(Self::new(Sphere::new(radius)?, transform))
    }

    /// Create a box cell from half-extents.
    pub fn cuboid(hx: S, hy: S, hz: S, transform: Transform<S>) -> Result<Self, ShapeError> {
        Ok(Self::new(Cuboid::new(hx, hy, hz)?, transform))
    }

    /// Create a capsule cell.
    pub fn capsule(
        axis: usize,
        radius: S,
        half_height: S,
        transform: Transform<S>,
    ) -> Result<Self, ShapeError> {
        Ok(Self::new(Capsule::new(axis, radius, half_height)?, transform))
    }

    /// Create a composite cell over `children`.
    pub fn composite(children: Vec<CellRef<S>>, transform: Transform<S>) -> Self {
        Self::new(Composite::new(children), transform)
    }

    /// Set this node's resolution while building it. Children are left alone;
    /// use [`GeomCell::set_resolution`] to propagate.
    pub fn with_resolution(self, resolution: u32) -> Self {
        self.resolution.store(resolution, Ordering::Relaxed);
        self
    }

    /// Wrap in a shared handle.
    pub fn into_ref(self) -> CellRef<S> {
        Arc::new(self)
    }

    /// Local-to-parent transform.
    pub fn transform(&self) -> &Transform<S> {
        &self.transform
    }

    /// Current tessellation resolution.
    pub fn resolution(&self) -> u32 {
        self.resolution.load(Ordering::Relaxed)
    }

    /// Set the tessellation resolution of this cell and, for composites, of
    /// every descendant. Shared descendants see the change through all of
    /// their parents.
    pub fn set_resolution(&self, resolution: u32) {
        self.resolution.store(resolution, Ordering::Relaxed);
        if let CellShape::Composite(c) = &self.shape {
            for child in c.children() {
                child.set_resolution(resolution);
            }
        }
    }

    /// The shape variant.
    pub fn shape(&self) -> &CellShape<S> {
        &self.shape
    }

    /// Kind tag of the shape.
    pub fn kind(&self) -> CellKind {
        self.shape.kind()
    }

    /// The composite payload, if this is a composite cell.
    pub fn as_composite(&self) -> Option<&Composite<S>> {
        match &self.shape {
            CellShape::Composite(c) => Some(c),
            _ => None,
        }
    }

    /// Levels in the subtree rooted here; primitives are 1.
    pub fn depth(&self) -> usize {
        self.as_composite().map_or(1, Composite::depth)
    }

    /// Mesh at the current resolution, in the parent frame.
    pub fn mesh(&self) -> TriangleMesh {
        self.shape
            .mesh(self.resolution())
            .transformed(&self.transform.cast::<f64>())
    }

    /// Parent-frame box around the eight transformed corners of the local box.
    pub fn bounding_box(&self) -> Aabb3<S> {
        self.shape.bounding_box().transformed(&self.transform)
    }

    /// Distance query for a parent-frame point.
    pub fn dist(&self, pt: &Vec3<S>) -> Distance<S> {
        let local = self.transform.inverse_apply_point(pt);
        self.shape.dist(&local).transformed(&self.transform)
    }

    /// Closest-point query for a parent-frame point.
    pub fn closest(&self, pt: &Vec3<S>, vertex_normal: bool) -> ClosestPoint<S> {
        let local = self.transform.inverse_apply_point(pt);
        self.shape
            .closest(&local, vertex_normal)
            .transformed(&self.transform)
    }

    /// Ray query in the parent frame; `S::infinity()` on a miss.
    pub fn ray_query(&self, origin: &Vec3<S>, dir: &Vec3<S>) -> S {
        self.shape.ray_query(
            &self.transform.inverse_apply_point(origin),
            &self.transform.inverse_apply_vec(dir),
        )
    }

    /// Ray query returning `None` instead of the infinity sentinel.
    pub fn ray_hit(&self, origin: &Vec3<S>, dir: &Vec3<S>) -> Option<S> {
        let t = self.ray_query(origin, dir);
        t.is_finite().then_some(t)
    }

    /// A new node with the same transform, resolution and shape. Composite
    /// children are shared with the original, not copied.
    pub fn deep_clone(&self) -> CellRef<S> {
        Arc::new(self.clone())
    }
}

impl<S: Scalar> Clone for GeomCell<S> {
    fn clone(&self) -> Self {
        Self {
            transform: self.transform,
            resolution: AtomicU32::new(self.resolution()),
            shape: self.shape.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geocell_math::Quad;
    use std::f64::consts::FRAC_PI_2;

    fn v(x: f64, y: f64, z: f64) -> Vec3<f64> {
        Vec3::new(x, y, z)
    }

    #[test]
    fn test_queries_in_parent_frame() {
        // z-axis cylinder turned onto the x axis, then moved up by 10
        let t = Transform::translation(0.0, 0.0, 10.0).then(&Transform::rotation_y(FRAC_PI_2));
        let cell = GeomCell::cylinder(2, 1.0, 2.0, t).unwrap();

        let d = cell.dist(&v(0.0, 0.0, 13.0));
        assert!(!d.inside);
        assert_relative_eq!(d.distance, 2.0, epsilon = 1e-12);
        assert_relative_eq!(d.normal, v(0.0, 0.0, 1.0), epsilon = 1e-12);

        let cp = cell.closest(&v(5.0, 0.0, 10.0), false);
        assert_relative_eq!(cp.point, v(2.0, 0.0, 10.0), epsilon = 1e-12);
        assert_relative_eq!(cp.normal, v(1.0, 0.0, 0.0), epsilon = 1e-12);

        let t = cell.ray_query(&v(0.0, 0.0, 0.0), &v(0.0, 0.0, 1.0));
        assert_relative_eq!(t, 9.0, epsilon = 1e-12);
        assert_eq!(cell.ray_hit(&v(0.0, 0.0, 0.0), &v(0.0, 0.0, -1.0)), None);

        let bbox = cell.bounding_box();
        assert_relative_eq!(bbox.max, v(2.0, 1.0, 11.0), epsilon = 1e-12);
    }

    #[test]
    fn test_distance_invariant_under_rigid_motion() {
        let t = Transform::rotation_about_axis(&v(1.0, 2.0, 3.0), 0.9)
            .then(&Transform::translation(-4.0, 0.5, 2.0));
        let at_origin = GeomCell::capsule(1, 0.5, 1.5, Transform::identity()).unwrap();
        let moved = GeomCell::capsule(1, 0.5, 1.5, t).unwrap();
        let p = v(0.3, 2.7, -1.1);
        let a = at_origin.dist(&p);
        let b = moved.dist(&t.apply_point(&p));
        assert_eq!(a.inside, b.inside);
        assert_relative_eq!(a.distance, b.distance, epsilon = 1e-12);
        assert_relative_eq!(t.apply_vec(&a.normal), b.normal, epsilon = 1e-12);
    }

    #[test]
    fn test_set_resolution_propagates_to_shared_children() {
        let shared = GeomCell::sphere(1.0, Transform::identity()).unwrap().into_ref();
        let left = GeomCell::composite(vec![shared.clone()], Transform::identity());
        let right = GeomCell::composite(vec![shared.clone()], Transform::translation(5.0, 0.0, 0.0));
        assert_eq!(shared.resolution(), DEFAULT_RESOLUTION);

        left.set_resolution(7);
        assert_eq!(left.resolution(), 7);
        assert_eq!(shared.resolution(), 7);
        let seen = right.as_composite().unwrap().child(0).unwrap();
        assert_eq!(seen.resolution(), 7);
        assert_eq!(right.resolution(), DEFAULT_RESOLUTION);
    }

    #[test]
    fn test_with_resolution_is_local() {
        let child = GeomCell::sphere(1.0, Transform::identity()).unwrap().into_ref();
        let parent = GeomCell::composite(vec![child.clone()], Transform::identity()).with_resolution(4);
        assert_eq!(parent.resolution(), 4);
        assert_eq!(child.resolution(), DEFAULT_RESOLUTION);
    }

    #[test]
    fn test_clone_shares_children() {
        let child = GeomCell::cuboid(1.0, 1.0, 1.0, Transform::identity()).unwrap().into_ref();
        let parent = GeomCell::composite(vec![child.clone()], Transform::identity()).with_resolution(9);
        let copy = parent.deep_clone();
        assert_eq!(copy.resolution(), 9);
        assert_eq!(copy.kind(), CellKind::Composite);
        let copied_child = copy.as_composite().unwrap().child(0).unwrap();
        assert!(Arc::ptr_eq(copied_child, &child));

        // the copy's own resolution is independent
        copy.set_resolution(3);
        assert_eq!(parent.resolution(), 9);
        assert_eq!(child.resolution(), 3);
    }

    #[test]
    fn test_mesh_follows_transform_and_resolution() {
        let cell = GeomCell::cylinder(2, 1.0, 1.0, Transform::translation(0.0, 0.0, 5.0))
            .unwrap()
            .with_resolution(8);
        let mesh = cell.mesh();
        assert_eq!(mesh.num_triangles(), 8 * 4);
        assert_relative_eq!(mesh.bounding_box().min.z, 4.0, epsilon = 1e-12);
        cell.set_resolution(16);
        assert_eq!(cell.mesh().num_triangles(), 16 * 4);
    }

    #[test]
    fn test_quad_cell() {
        let q = Quad::from_f64;
        let t = Transform::translation(q(3.0), q(0.0), q(0.0));
        let cell = GeomCell::sphere(q(1.0), t).unwrap();
        let origin = Vec3::new(q(0.0), q(0.0), q(0.0));
        let dir = Vec3::new(q(1.0), q(0.0), q(0.0));
        assert_eq!(cell.ray_query(&origin, &dir).to_f64(), 2.0);
        assert_eq!(cell.dist(&origin).distance.to_f64(), 2.0);
        assert_eq!(cell.kind(), CellKind::Sphere);
        assert_eq!(cell.depth(), 1);
    }

    #[test]
    fn test_cells_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GeomCell<f64>>();
        assert_send_sync::<CellRef<Quad>>();
    }
}
