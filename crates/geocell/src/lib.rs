#![warn(missing_docs)]

//! Composite geometric-query engine.
//!
//! A geometry tree is built from primitive cells (cylinders, spheres,
//! cuboids, capsules) and composites that group shared children, each
//! node carrying a rigid placement. Every node answers signed-distance,
//! closest-point and ray queries in its parent's frame, can be
//! tessellated to a triangle mesh, and round-trips through a compact
//! binary format that keeps shared children shared.
//!
//! The [`Builder`] applies a [`GeomConfig`] (default resolution and rigid
//! tolerance) to new cells; [`save`] and [`load`] wrap the binary format
//! under the configured limits.
//!
//! # Example
//!
//! ```
//! use geocell::{Builder, GeomConfig, Transform, Vec3};
//!
//! let builder = Builder::<f64>::new(GeomConfig::default());
//! let left = builder.cylinder(2, 1.0, 1.0, Transform::translation(-3.0, 0.0, 0.0))?;
//! let right = builder.cylinder(2, 1.0, 1.0, Transform::translation(3.0, 0.0, 0.0))?;
//! let pair = builder.composite(vec![left, right], Transform::identity());
//!
//! let d = pair.dist(&Vec3::zeros());
//! assert!(!d.inside);
//! assert_eq!(d.distance, 2.0);
//! assert_eq!(pair.ray_query(&Vec3::zeros(), &Vec3::x()), 2.0);
//! # Ok::<(), geocell::Error>(())
//! ```

pub use geocell_cells;
pub use geocell_io;
pub use geocell_math;
pub use geocell_mesh;

pub use geocell_cells::{
    Capsule, CellKind, CellRef, CellShape, ClosestPoint, Composite, Cuboid, Cylinder, Distance,
    GeomCell, Shape, ShapeError, Sphere, DEFAULT_RESOLUTION,
};
pub use geocell_io::{from_bytes, to_bytes, ReadError, ReadLimits, WriteError};
pub use geocell_math::{Aabb3, Quad, Scalar, Transform, TransformError, Vec3, RIGID_TOLERANCE};
pub use geocell_mesh::TriangleMesh;

mod config;
mod error;

pub use config::{ConfigError, GeomConfig, LimitsConfig, TessellationConfig, ToleranceConfig};
pub use error::{Error, Result};

use std::marker::PhantomData;
use std::path::Path;

use tracing::info;

/// Write a geometry tree to a file.
///
/// The tree is checked against the configured limits first, so every file
/// `save` produces can be read back by [`load`] with the same config.
pub fn save<S: Scalar>(
    cell: &GeomCell<S>,
    path: impl AsRef<Path>,
    config: &GeomConfig,
) -> Result<()> {
    let path = path.as_ref();
    let bytes = geocell_io::to_bytes(cell, &config.limits())?;
    std::fs::write(path, &bytes).map_err(WriteError::from)?;
    info!(path = %path.display(), bytes = bytes.len(), "geometry tree saved");
    Ok(())
}

/// Read a geometry tree from a file, bounded by the configured limits.
pub fn load<S: Scalar>(path: impl AsRef<Path>, config: &GeomConfig) -> Result<CellRef<S>> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(ReadError::from)?;
    let cell = geocell_io::from_bytes(&data, &config.limits())?;
    info!(path = %path.display(), kind = %cell.kind(), depth = cell.depth(), "geometry tree loaded");
    Ok(cell)
}

/// Factory for cells that share one configuration.
///
/// New cells start at the configured default resolution, and matrices
/// are accepted as transforms within the configured rigid tolerance.
#[derive(Debug, Clone)]
pub struct Builder<S: Scalar> {
    config: GeomConfig,
    _scalar: PhantomData<S>,
}

impl<S: Scalar> Default for Builder<S> {
    fn default() -> Self {
        Self::new(GeomConfig::default())
    }
}

impl<S: Scalar> Builder<S> {
    /// Create a builder for the given configuration.
    pub fn new(config: GeomConfig) -> Self {
        Self {
            config,
            _scalar: PhantomData,
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &GeomConfig {
        &self.config
    }

    fn finish(&self, cell: GeomCell<S>) -> CellRef<S> {
        cell.with_resolution(self.config.tessellation.default_resolution)
            .into_ref()
    }

    /// Validate a row-major 4x4 matrix as a rigid transform.
    pub fn transform(&self, rows: &[S; 16]) -> Result<Transform<S>> {
        Ok(Transform::from_row_slice(rows, self.config.tolerance.rigid)?)
    }

    /// Cylinder along `axis` with radius `radius` and half-height `half_height`.
    pub fn cylinder(
        &self,
        axis: usize,
        radius: S,
        half_height: S,
        transform: Transform<S>,
    ) -> Result<CellRef<S>> {
        let cell = GeomCell::cylinder(axis, radius, half_height, transform)?;
        Ok(self.finish(cell))
    }

    /// Sphere of radius `radius`.
    pub fn sphere(&self, radius: S, transform: Transform<S>) -> Result<CellRef<S>> {
        Ok(self.finish(GeomCell::sphere(radius, transform)?))
    }

    /// Axis-aligned box with the given half-extents.
    pub fn cuboid(&self, hx: S, hy: S, hz: S, transform: Transform<S>) -> Result<CellRef<S>> {
        Ok(self.finish(GeomCell::cuboid(hx, hy, hz, transform)?))
    }

    /// Capsule along `axis`.
    pub fn capsule(
        &self,
        axis: usize,
        radius: S,
        half_height: S,
        transform: Transform<S>,
    ) -> Result<CellRef<S>> {
        let cell = GeomCell::capsule(axis, radius, half_height, transform)?;
        Ok(self.finish(cell))
    }

    /// Composite over existing children. The children are shared, not copied.
    pub fn composite(&self, children: Vec<CellRef<S>>, transform: Transform<S>) -> CellRef<S> {
        self.finish(GeomCell::composite(children, transform))
    }
}
