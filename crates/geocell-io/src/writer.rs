//! Binary writer: serializes a geometry tree, emitting shared cells once.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use geocell_cells::{CellShape, Composite, GeomCell};
use geocell_math::{Scalar, Transform};
use tracing::debug;

use crate::error::WriteError;
use crate::reader::ReadLimits;
use crate::{BACK_REFERENCE, FORMAT_VERSION, MAGIC};

/// Write a geometry tree to a file with default limits.
pub fn write_cell<S: Scalar>(cell: &GeomCell<S>, path: impl AsRef<Path>) -> Result<(), WriteError> {
    let bytes = to_bytes(cell, &ReadLimits::default())?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Encode a geometry tree into a byte buffer.
pub fn to_bytes<S: Scalar>(cell: &GeomCell<S>, limits: &ReadLimits) -> Result<Vec<u8>, WriteError> {
    let mut out = Vec::new();
    write_to(cell, &mut out, limits)?;
    Ok(out)
}

/// Encode a geometry tree into any writer.
///
/// Scalars are stored at the backend's native width (`S::WIDTH` words).
/// Each distinct cell is written once; later occurrences of the same
/// [`CellRef`](geocell_cells::CellRef) become back-references.
///
/// The tree is checked against `limits` first, the same way
/// [`from_bytes`](crate::from_bytes) checks it, so anything written here
/// reads back under the same limits. Nothing is written when a check fails.
pub fn write_to<S: Scalar, W: Write>(
    cell: &GeomCell<S>,
    out: &mut W,
    limits: &ReadLimits,
) -> Result<(), WriteError> {
    let mut writer = CellWriter {
        out,
        limits,
        registry: HashMap::new(),
        references: 0,
        bytes: 0,
    };
    writer.check_slot(cell, 1)?;
    writer.registry.clear();

    writer.put(&MAGIC)?;
    writer.put(&FORMAT_VERSION.to_le_bytes())?;
    writer.put(&[S::WIDTH])?;
    writer.write_slot(cell)?;
    writer.out.flush()?;
    debug!(
        cells = writer.registry.len(),
        shared_references = writer.references,
        bytes = writer.bytes,
        scalar = S::NAME,
        "geometry tree written"
    );
    Ok(())
}

/// Stored child count of a composite.
fn child_count<S: Scalar>(composite: &Composite<S>, limits: &ReadLimits) -> Result<u32, WriteError> {
    let too_many = || WriteError::TooManyChildren {
        count: composite.len(),
        max: limits.max_children,
    };
    let count = u32::try_from(composite.len()).map_err(|_| too_many())?;
    if count > limits.max_children {
        return Err(too_many());
    }
    Ok(count)
}

/// Context for encoding one tree.
struct CellWriter<'w, W: Write, S: Scalar> {
    out: &'w mut W,
    limits: &'w ReadLimits,
    /// Maps cell identity to its registry index (first-appearance order).
    registry: HashMap<*const GeomCell<S>, u32>,
    references: usize,
    bytes: usize,
}

impl<W: Write, S: Scalar> CellWriter<'_, W, S> {
    /// Registers `cell` and returns its index, or `None` for a repeat.
    fn register(&mut self, cell: &GeomCell<S>) -> Option<u32> {
        let key = cell as *const GeomCell<S>;
        if self.registry.contains_key(&key) {
            return None;
        }
        let index = self.registry.len() as u32;
        self.registry.insert(key, index);
        Some(index)
    }

    /// Walks the tree in write order. Only a cell's first appearance is
    /// checked, since repeats are stored as back-references.
    fn check_slot(&mut self, cell: &GeomCell<S>, depth: usize) -> Result<(), WriteError> {
        let Some(index) = self.register(cell) else {
            return Ok(());
        };
        if depth > self.limits.max_depth {
            return Err(WriteError::TooDeep {
                max_depth: self.limits.max_depth,
            });
        }
        Transform::from_matrix(*cell.transform().matrix(), self.limits.rigid_tolerance).map_err(
            |source| WriteError::InvalidTransform {
                index: index as usize,
                source,
            },
        )?;
        if let Some(composite) = cell.as_composite() {
            child_count(composite, self.limits)?;
            for child in composite.children() {
                self.check_slot(child, depth + 1)?;
            }
        }
        Ok(())
    }

    fn put(&mut self, bytes: &[u8]) -> Result<(), WriteError> {
        self.out.write_all(bytes)?;
        self.bytes += bytes.len();
        Ok(())
    }

    fn put_u32(&mut self, value: u32) -> Result<(), WriteError> {
        self.put(&value.to_le_bytes())
    }

    fn put_scalar(&mut self, value: S) -> Result<(), WriteError> {
        if S::WIDTH == 1 {
            self.put(&value.to_f64().to_le_bytes())
        } else {
            let (hi, lo) = value.to_parts();
            self.put(&hi.to_le_bytes())?;
            self.put(&lo.to_le_bytes())
        }
    }

    fn write_slot(&mut self, cell: &GeomCell<S>) -> Result<(), WriteError> {
        let key = cell as *const GeomCell<S>;
        if let Some(&index) = self.registry.get(&key) {
            self.references += 1;
            self.put(&[BACK_REFERENCE])?;
            return self.put_u32(index);
        }
        // The index is taken when the record begins, before its children.
        self.register(cell);
        self.write_record(cell)
    }

    fn write_record(&mut self, cell: &GeomCell<S>) -> Result<(), WriteError> {
        self.put(&[cell.kind().tag()])?;
        for value in cell.transform().to_row_array() {
            self.put_scalar(value)?;
        }
        self.put_u32(cell.resolution())?;

        match cell.shape() {
            CellShape::Cylinder(c) => {
                self.put(&[c.axis() as u8])?;
                self.put_scalar(c.radius())?;
                self.put_scalar(c.half_height())?;
            }
            CellShape::Sphere(s) => {
                self.put_scalar(s.radius())?;
            }
            CellShape::Cuboid(b) => {
                let h = b.half_extents();
                self.put_scalar(h.x)?;
                self.put_scalar(h.y)?;
                self.put_scalar(h.z)?;
            }
            CellShape::Capsule(c) => {
                self.put(&[c.axis() as u8])?;
                self.put_scalar(c.radius())?;
                self.put_scalar(c.half_height())?;
            }
            CellShape::Composite(c) => {
                self.put_u32(child_count(c, self.limits)?)?;
                for child in c.children() {
                    self.write_slot(child)?;
                }
            }
        }
        Ok(())
    }
}
