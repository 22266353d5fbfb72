//! Binary reader: rebuilds a geometry tree, restoring shared cells.

use std::io::Read;
use std::path::Path;

use geocell_cells::{
    Capsule, CellKind, CellRef, CellShape, Composite, Cuboid, Cylinder, GeomCell, ShapeError,
    Sphere,
};
use geocell_math::{Scalar, Transform, RIGID_TOLERANCE};
use tracing::{debug, warn};

use crate::error::ReadError;
use crate::{BACK_REFERENCE, FORMAT_VERSION, MAGIC};

/// Bounds applied while decoding untrusted input.
///
/// The writer enforces the same bounds, so a tree written under some
/// limits always reads back under them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadLimits {
    /// Maximum nesting of records; a lone primitive has depth 1.
    pub max_depth: usize,
    /// Maximum child count of a single composite.
    pub max_children: u32,
    /// Allowed deviation of a stored rotation block from orthonormality.
    pub rigid_tolerance: f64,
}

impl Default for ReadLimits {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_children: 1 << 20,
            rigid_tolerance: RIGID_TOLERANCE,
        }
    }
}

/// Read a geometry tree from a file with default limits.
pub fn read_cell<S: Scalar>(path: impl AsRef<Path>) -> Result<CellRef<S>, ReadError> {
    let data = std::fs::read(path)?;
    from_bytes(&data, &ReadLimits::default())
}

/// Read a geometry tree from any reader.
pub fn read_from<S: Scalar, R: Read>(
    input: &mut R,
    limits: &ReadLimits,
) -> Result<CellRef<S>, ReadError> {
    let mut data = Vec::new();
    input.read_to_end(&mut data)?;
    from_bytes(&data, limits)
}

/// Decode a geometry tree from a byte buffer.
///
/// Input stored at either scalar width is accepted and converted to `S`
/// (widening is exact, narrowing rounds). Cells that were shared when
/// written are shared again: every back-reference resolves to the same
/// [`CellRef`].
pub fn from_bytes<S: Scalar>(data: &[u8], limits: &ReadLimits) -> Result<CellRef<S>, ReadError> {
    let result = decode(data, limits);
    if let Err(err) = &result {
        warn!(error = %err, bytes = data.len(), "failed to read geometry tree");
    }
    result
}

fn decode<S: Scalar>(data: &[u8], limits: &ReadLimits) -> Result<CellRef<S>, ReadError> {
    let mut reader = CellReader {
        data,
        pos: 0,
        width: 1,
        limits,
        registry: Vec::new(),
        references: 0,
    };
    reader.read_header()?;
    let root = reader.read_slot(1)?;
    if reader.pos != data.len() {
        return Err(ReadError::TrailingData {
            offset: reader.pos,
            len: data.len() - reader.pos,
        });
    }
    debug!(
        cells = reader.registry.len(),
        shared_references = reader.references,
        bytes = data.len(),
        scalar_width = reader.width,
        "geometry tree read"
    );
    Ok(root)
}

/// Context for decoding one tree.
struct CellReader<'a, S: Scalar> {
    data: &'a [u8],
    pos: usize,
    width: u8,
    limits: &'a ReadLimits,
    /// Cells in first-appearance order; `None` while a record is being read.
    registry: Vec<Option<CellRef<S>>>,
    references: usize,
}

impl<'a, S: Scalar> CellReader<'a, S> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], ReadError> {
        let data = self.data;
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| ReadError::truncated(self.pos, n))?;
        let bytes = &data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], ReadError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, ReadError> {
        Ok(self.take_array::<1>()?[0])
    }

    fn u32(&mut self) -> Result<u32, ReadError> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    fn f64(&mut self) -> Result<f64, ReadError> {
        Ok(f64::from_le_bytes(self.take_array()?))
    }

    fn scalar(&mut self) -> Result<S, ReadError> {
        if self.width == 1 {
            Ok(S::from_f64(self.f64()?))
        } else {
            let hi = self.f64()?;
            let lo = self.f64()?;
            Ok(S::from_parts(hi, lo))
        }
    }

    fn read_header(&mut self) -> Result<(), ReadError> {
        let magic = self.take_array::<4>()?;
        if magic != MAGIC {
            return Err(ReadError::BadMagic(magic));
        }
        let version = u16::from_le_bytes(self.take_array()?);
        if version != FORMAT_VERSION {
            return Err(ReadError::UnsupportedVersion(version));
        }
        self.width = match self.u8()? {
            w @ (1 | 2) => w,
            other => return Err(ReadError::BadScalarWidth(other)),
        };
        Ok(())
    }

    fn read_slot(&mut self, depth: usize) -> Result<CellRef<S>, ReadError> {
        let offset = self.pos;
        let tag = self.u8()?;
        if tag == BACK_REFERENCE {
            let index = self.u32()?;
            self.references += 1;
            return match self.registry.get(index as usize) {
                Some(Some(cell)) => Ok(cell.clone()),
                Some(None) => Err(ReadError::IncompleteReference(index)),
                None => Err(ReadError::DanglingReference {
                    index,
                    registered: self.registry.len(),
                }),
            };
        }
        let kind = CellKind::from_tag(tag).ok_or(ReadError::UnknownTag { tag, offset })?;
        if depth > self.limits.max_depth {
            return Err(ReadError::TooDeep {
                max_depth: self.limits.max_depth,
            });
        }

        // Reserve the registry slot before any child can refer to it.
        let index = self.registry.len();
        self.registry.push(None);

        let mut rows = [S::zero(); 16];
        for value in rows.iter_mut() {
            *value = self.scalar()?;
        }
        let transform = Transform::from_row_slice(&rows, self.limits.rigid_tolerance)
            .map_err(|source| ReadError::InvalidTransform { index, source })?;
        let resolution = self.u32()?;

        let invalid = |source: ShapeError| ReadError::InvalidShape { index, source };
        let shape: CellShape<S> = match kind {
            CellKind::Cylinder => {
                let axis = self.u8()? as usize;
                let radius = self.scalar()?;
                let half_height = self.scalar()?;
                Cylinder::new(axis, radius, half_height).map_err(invalid)?.into()
            }
            CellKind::Sphere => Sphere::new(self.scalar()?).map_err(invalid)?.into(),
            CellKind::Cuboid => {
                let hx = self.scalar()?;
                let hy = self.scalar()?;
                let hz = self.scalar()?;
                Cuboid::new(hx, hy, hz).map_err(invalid)?.into()
            }
            CellKind::Capsule => {
                let axis = self.u8()? as usize;
                let radius = self.scalar()?;
                let half_height = self.scalar()?;
                Capsule::new(axis, radius, half_height).map_err(invalid)?.into()
            }
            CellKind::Composite => {
                let count = self.u32()?;
                if count > self.limits.max_children {
                    return Err(ReadError::TooManyChildren {
                        count,
                        max: self.limits.max_children,
                    });
                }
                // Never trust the declared count for allocation.
                let mut children = Vec::with_capacity((count as usize).min(256));
                for _ in 0..count {
                    children.push(self.read_slot(depth + 1)?);
                }
                Composite::new(children).into()
            }
        };

        let cell = GeomCell::new(shape, transform)
            .with_resolution(resolution)
            .into_ref();
        self.registry[index] = Some(cell.clone());
        Ok(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::to_bytes;
    use geocell_math::Quad;
    use proptest::prelude::*;
    use std::sync::Arc;

    /// Hand-assembles byte streams, including malformed ones.
    struct Bytes(Vec<u8>);

    impl Bytes {
        fn header(width: u8) -> Self {
            let mut b = Bytes(MAGIC.to_vec());
            b.0.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
            b.0.push(width);
            b
        }

        fn u8(mut self, v: u8) -> Self {
            self.0.push(v);
            self
        }

        fn u32(mut self, v: u32) -> Self {
            self.0.extend_from_slice(&v.to_le_bytes());
            self
        }

        fn f64(mut self, v: f64) -> Self {
            self.0.extend_from_slice(&v.to_le_bytes());
            self
        }

        /// Tag, a transform with uniform scale `scale`, and a resolution.
        fn record(mut self, tag: u8, scale: f64) -> Self {
            self = self.u8(tag);
            for row in 0..4 {
                for col in 0..4 {
                    let v = if row == col { if row == 3 { 1.0 } else { scale } } else { 0.0 };
                    self = self.f64(v);
                }
            }
            self.u32(16)
        }

        fn read(&self) -> Result<CellRef<f64>, ReadError> {
            from_bytes(&self.0, &ReadLimits::default())
        }
    }

    #[test]
    fn test_minimal_sphere() {
        let cell = Bytes::header(1).record(2, 1.0).f64(2.5).read().unwrap();
        assert_eq!(cell.kind(), CellKind::Sphere);
        assert_eq!(cell.resolution(), 16);
        assert!(cell.transform().is_identity());
    }

    #[test]
    fn test_shared_children_restored() {
        let shared = GeomCell::capsule(0, 0.5, 1.0, Transform::translation(1.0, 2.0, 3.0))
            .unwrap()
            .into_ref();
        let left = GeomCell::composite(vec![shared.clone()], Transform::identity()).into_ref();
        let right = GeomCell::composite(vec![shared], Transform::rotation_z(0.5)).into_ref();
        let root = GeomCell::composite(vec![left, right], Transform::identity());

        let limits = ReadLimits::default();
        let back: CellRef<f64> = from_bytes(&to_bytes(&root, &limits).unwrap(), &limits).unwrap();
        let root = back.as_composite().unwrap();
        let a = root.child(0).unwrap().as_composite().unwrap().child(0).unwrap();
        let b = root.child(1).unwrap().as_composite().unwrap().child(0).unwrap();
        assert!(Arc::ptr_eq(a, b));

        root.child(0).unwrap().set_resolution(5);
        assert_eq!(b.resolution(), 5);
    }

    #[test]
    fn test_width_conversion() {
        let third = Quad::from_f64(1.0) / Quad::from_f64(3.0);
        let quad_cell = GeomCell::sphere(third, Transform::identity()).unwrap();
        let bytes = to_bytes(&quad_cell, &ReadLimits::default()).unwrap();

        // narrowing rounds to the nearest double
        let narrow: CellRef<f64> = from_bytes(&bytes, &ReadLimits::default()).unwrap();
        match narrow.shape() {
            CellShape::Sphere(s) => assert_eq!(s.radius(), 1.0 / 3.0),
            other => panic!("expected sphere, got {other:?}"),
        }
        // same width keeps both words
        let same: CellRef<Quad> = from_bytes(&bytes, &ReadLimits::default()).unwrap();
        match same.shape() {
            CellShape::Sphere(s) => assert_eq!(s.radius().to_parts(), third.to_parts()),
            other => panic!("expected sphere, got {other:?}"),
        }
        // widening is exact
        let wide: CellRef<Quad> = Bytes::header(1)
            .record(2, 1.0)
            .f64(0.1)
            .read()
            .map(|c| to_bytes(&*c, &ReadLimits::default()).unwrap())
            .and_then(|b| from_bytes(&b, &ReadLimits::default()))
            .unwrap();
        match wide.shape() {
            CellShape::Sphere(s) => assert_eq!(s.radius().to_parts(), (0.1, 0.0)),
            other => panic!("expected sphere, got {other:?}"),
        }
    }

    #[test]
    fn test_header_errors() {
        assert!(matches!(
            from_bytes::<f64>(b"NOPE\x01\x00\x01", &ReadLimits::default()),
            Err(ReadError::BadMagic(m)) if &m == b"NOPE"
        ));
        let mut b = MAGIC.to_vec();
        b.extend_from_slice(&7u16.to_le_bytes());
        b.push(1);
        assert!(matches!(
            from_bytes::<f64>(&b, &ReadLimits::default()),
            Err(ReadError::UnsupportedVersion(7))
        ));
        assert!(matches!(
            Bytes::header(3).read(),
            Err(ReadError::BadScalarWidth(3))
        ));
        assert!(matches!(
            from_bytes::<f64>(b"GE", &ReadLimits::default()),
            Err(ReadError::Truncated { offset: 0, needed: 4 })
        ));
    }

    #[test]
    fn test_unknown_tag_and_truncation() {
        assert!(matches!(
            Bytes::header(1).u8(9).read(),
            Err(ReadError::UnknownTag { tag: 9, offset: 7 })
        ));
        assert!(matches!(
            Bytes::header(1).record(1, 1.0).u8(2).read(),
            Err(ReadError::Truncated { .. })
        ));
        assert!(matches!(Bytes::header(1).read(), Err(ReadError::Truncated { .. })));
    }

    #[test]
    fn test_reference_errors() {
        // composite whose only child points at the composite itself
        let cyclic = Bytes::header(1).record(5, 1.0).u32(1).u8(BACK_REFERENCE).u32(0);
        assert!(matches!(cyclic.read(), Err(ReadError::IncompleteReference(0))));

        let dangling = Bytes::header(1).record(5, 1.0).u32(1).u8(BACK_REFERENCE).u32(4);
        assert!(matches!(
            dangling.read(),
            Err(ReadError::DanglingReference { index: 4, registered: 1 })
        ));

        assert!(matches!(
            Bytes::header(1).u8(BACK_REFERENCE).u32(0).read(),
            Err(ReadError::DanglingReference { index: 0, registered: 0 })
        ));
    }

    #[test]
    fn test_validation_errors() {
        let scaled = Bytes::header(1).record(2, 2.0).f64(1.0);
        assert!(matches!(
            scaled.read(),
            Err(ReadError::InvalidTransform { index: 0, .. })
        ));

        let negative = Bytes::header(1).record(1, 1.0).u8(2).f64(-1.0).f64(1.0);
        assert!(matches!(
            negative.read(),
            Err(ReadError::InvalidShape { index: 0, .. })
        ));

        let bad_axis = Bytes::header(1).record(4, 1.0).u8(3).f64(1.0).f64(1.0);
        assert!(matches!(
            bad_axis.read(),
            Err(ReadError::InvalidShape { source: ShapeError::InvalidAxis(3), .. })
        ));
    }

    #[test]
    fn test_limits() {
        let limits = ReadLimits {
            max_depth: 2,
            max_children: 3,
            ..ReadLimits::default()
        };
        // composite > composite > sphere is three levels
        let deep = Bytes::header(1)
            .record(5, 1.0)
            .u32(1)
            .record(5, 1.0)
            .u32(1)
            .record(2, 1.0)
            .f64(1.0);
        assert!(matches!(
            from_bytes::<f64>(&deep.0, &limits),
            Err(ReadError::TooDeep { max_depth: 2 })
        ));
        assert!(deep.read().is_ok());

        let wide = Bytes::header(1).record(5, 1.0).u32(4);
        assert!(matches!(
            from_bytes::<f64>(&wide.0, &limits),
            Err(ReadError::TooManyChildren { count: 4, max: 3 })
        ));
        // a huge declared count fails on truncation, not allocation
        let huge = Bytes::header(1).record(5, 1.0).u32(1 << 20);
        assert!(matches!(huge.read(), Err(ReadError::Truncated { .. })));
    }

    #[test]
    fn test_trailing_data() {
        let extra = Bytes::header(1).record(2, 1.0).f64(1.0).u8(0);
        assert!(matches!(
            extra.read(),
            Err(ReadError::TrailingData { len: 1, .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_arbitrary_bytes_never_panic(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let _ = from_bytes::<f64>(&data, &ReadLimits::default());
        }

        #[test]
        fn prop_arbitrary_body_never_panics(
            width in 1u8..=2,
            body in proptest::collection::vec(any::<u8>(), 0..1024),
        ) {
            let mut data = Bytes::header(width).0;
            data.extend_from_slice(&body);
            let _ = from_bytes::<Quad>(&data, &ReadLimits::default());
        }
    }
}
