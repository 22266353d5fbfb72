#![warn(missing_docs)]

//! Binary serialization of geocell geometry trees.
//!
//! The format is a small little-endian stream:
//!
//! ```text
//! header  := "GEOC" version:u16 width:u8
//! slot    := tag:u8 record | 0xFF index:u32
//! record  := transform:scalar[16] resolution:u32 fields
//! ```
//!
//! `width` is the number of `f64` words per scalar (1 for `f64`, 2 for
//! `Quad` hi/lo pairs). Every record is assigned the next registry index
//! when it begins, in pre-order; a cell that appears again (the same
//! [`CellRef`](geocell_cells::CellRef)) is written as a back-reference to
//! that index, so shared children come back shared.
//!
//! # Example
//!
//! ```
//! use geocell_cells::GeomCell;
//! use geocell_io::{from_bytes, to_bytes, ReadLimits};
//! use geocell_math::Transform;
//!
//! let leg = GeomCell::cylinder(2, 0.1, 1.0, Transform::identity())?.into_ref();
//! let table = GeomCell::composite(vec![leg.clone(), leg], Transform::identity());
//!
//! let bytes = to_bytes(&table, &ReadLimits::default())?;
//! let back = from_bytes::<f64>(&bytes, &ReadLimits::default())?;
//! let legs = back.as_composite().unwrap();
//! assert!(std::sync::Arc::ptr_eq(legs.child(0).unwrap(), legs.child(1).unwrap()));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod reader;
mod writer;

pub use error::{ReadError, WriteError};
pub use reader::{from_bytes, read_cell, read_from, ReadLimits};
pub use writer::{to_bytes, write_cell, write_to};

/// File magic.
pub const MAGIC: [u8; 4] = *b"GEOC";

/// Current format version.
pub const FORMAT_VERSION: u16 = 1;

/// Slot tag introducing a back-reference.
pub const BACK_REFERENCE: u8 = 0xFF;

#[cfg(test)]
mod tests {
    use super::*;
    use geocell_cells::{CellKind, CellRef, GeomCell};
    use geocell_math::{Quad, Scalar, Transform, Vec3};

    fn sample_tree<S: Scalar>() -> GeomCell<S> {
        let s = S::from_f64;
        let t = Transform::translation(s(1.0), s(-2.0), s(0.5))
            .then(&Transform::rotation_x(s(0.3)));
        let cyl = GeomCell::cylinder(0, s(0.5), s(1.5), t)
            .unwrap()
            .with_resolution(8)
            .into_ref();
        let ball = GeomCell::sphere(s(0.75), Transform::identity()).unwrap().into_ref();
        let slab = GeomCell::cuboid(s(2.0), s(0.1), s(1.0), Transform::rotation_z(s(1.0)))
            .unwrap()
            .into_ref();
        let pill = GeomCell::capsule(1, s(0.2), s(0.4), Transform::identity())
            .unwrap()
            .into_ref();
        let shift = Transform::translation(s(3.0), s(0.0), s(0.0));
        let inner = GeomCell::composite(vec![cyl.clone(), ball], shift).into_ref();
        GeomCell::composite(vec![inner, cyl, slab, pill], Transform::identity())
    }

    fn kinds<S: Scalar>(cell: &GeomCell<S>, out: &mut Vec<(CellKind, u32)>) {
        out.push((cell.kind(), cell.resolution()));
        if let Some(c) = cell.as_composite() {
            for child in c.children() {
                kinds(child, out);
            }
        }
    }

    #[test]
    fn test_roundtrip_preserves_structure_and_queries() {
        let tree = sample_tree::<f64>();
        let bytes = to_bytes(&tree, &ReadLimits::default()).unwrap();
        let back: CellRef<f64> = from_bytes(&bytes, &ReadLimits::default()).unwrap();

        let (mut a, mut b) = (Vec::new(), Vec::new());
        kinds(&tree, &mut a);
        kinds(&back, &mut b);
        assert_eq!(a, b);

        let points = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(3.2, -1.0, 0.4),
            Vec3::new(-5.0, 2.0, 1.0),
        ];
        for p in points {
            assert_eq!(tree.dist(&p), back.dist(&p));
        }
        let origin = Vec3::new(-9.0, 0.0, 0.0);
        let dir = Vec3::new(1.0, 0.1, 0.0);
        assert_eq!(tree.ray_query(&origin, &dir), back.ray_query(&origin, &dir));
    }

    #[test]
    fn test_reencode_is_stable() {
        let first = to_bytes(&sample_tree::<Quad>(), &ReadLimits::default()).unwrap();
        let back: CellRef<Quad> = from_bytes(&first, &ReadLimits::default()).unwrap();
        let second = to_bytes(&*back, &ReadLimits::default()).unwrap();
        assert_eq!(second.len(), first.len());
        let again: CellRef<Quad> = from_bytes(&second, &ReadLimits::default()).unwrap();
        assert_eq!(to_bytes(&*again, &ReadLimits::default()).unwrap(), second);
    }

    #[test]
    fn test_file_roundtrip() {
        let path = std::env::temp_dir().join(format!("geocell-io-{}.geoc", std::process::id()));
        write_cell(&sample_tree::<f64>(), &path).unwrap();
        let back: CellRef<f64> = read_cell(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(back.as_composite().unwrap().len(), 4);

        let mut cursor = std::io::Cursor::new(to_bytes(&*back, &ReadLimits::default()).unwrap());
        let again: CellRef<f64> = read_from(&mut cursor, &ReadLimits::default()).unwrap();
        assert_eq!(again.depth(), 3);
    }
}
