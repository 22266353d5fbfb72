//! Rigid 4x4 homogeneous transforms.

use nalgebra::Matrix4;
use thiserror::Error;

use crate::{Scalar, Vec3};

/// Default bound on the deviation of a rotation block from orthonormality.
pub const RIGID_TOLERANCE: f64 = 1e-9;

/// Errors raised when a matrix is not a rigid motion.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    /// An entry is NaN or infinite.
    #[error("transform contains a non-finite entry at ({row}, {col})")]
    NonFinite {
        /// Row of the offending entry.
        row: usize,
        /// Column of the offending entry.
        col: usize,
    },

    /// The bottom row is not `0 0 0 1`.
    #[error("transform bottom row is not [0, 0, 0, 1]")]
    NotAffine,

    /// The rotation block is not orthonormal with determinant +1.
    #[error("rotation block is not orthonormal (error {error:e}, determinant {determinant})")]
    NotRigid {
        /// Largest deviation of `R^T R` from the identity.
        error: f64,
        /// Determinant of the rotation block.
        determinant: f64,
    },
}

/// A rigid motion (rotation followed by translation) stored as a 4x4
/// homogeneous matrix.
///
/// Constructors only ever produce rigid matrices; arbitrary matrices go
/// through [`Transform::from_matrix`], which validates them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform<S: Scalar> {
    matrix: Matrix4<S>,
}

impl<S: Scalar> Transform<S> {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: S, dy: S, dz: S) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = dx;
        m[(1, 3)] = dy;
        m[(2, 3)] = dz;
        Self { matrix: m }
    }

    /// Translation by a vector.
    pub fn from_translation(t: &Vec3<S>) -> Self {
        Self::translation(t.x, t.y, t.z)
    }

    /// Rotation about the X axis by `angle` radians.
    pub fn rotation_x(angle: S) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(1, 1)] = c;
        m[(1, 2)] = -s;
        m[(2, 1)] = s;
        m[(2, 2)] = c;
        Self { matrix: m }
    }

    /// Rotation about the Y axis by `angle` radians.
    pub fn rotation_y(angle: S) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(0, 0)] = c;
        m[(0, 2)] = s;
        m[(2, 0)] = -s;
        m[(2, 2)] = c;
        Self { matrix: m }
    }

    /// Rotation about the Z axis by `angle` radians.
    pub fn rotation_z(angle: S) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(0, 0)] = c;
        m[(0, 1)] = -s;
        m[(1, 0)] = s;
        m[(1, 1)] = c;
        Self { matrix: m }
    }

    /// Rotation about an arbitrary axis through the origin by `angle` radians.
    ///
    /// The axis does not need to be normalized. A zero axis yields the identity.
    pub fn rotation_about_axis(axis: &Vec3<S>, angle: S) -> Self {
        let len = crate::norm(axis);
        if len.is_zero() {
            return Self::identity();
        }
        let (x, y, z) = (axis.x / len, axis.y / len, axis.z / len);
        let (s, c) = angle.sin_cos();
        let t = S::one() - c;
        let mut m = Matrix4::identity();
        m[(0, 0)] = t * x * x + c;
        m[(0, 1)] = t * x * y - s * z;
        m[(0, 2)] = t * x * z + s * y;
        m[(1, 0)] = t * x * y + s * z;
        m[(1, 1)] = t * y * y + c;
        m[(1, 2)] = t * y * z - s * x;
        m[(2, 0)] = t * x * z - s * y;
        m[(2, 1)] = t * y * z + s * x;
        m[(2, 2)] = t * z * z + c;
        Self { matrix: m }
    }

    /// Validates an arbitrary homogeneous matrix as a rigid motion.
    ///
    /// `tol` bounds the allowed deviation of `R^T R` from the identity and of
    /// the determinant from 1.
    pub fn from_matrix(matrix: Matrix4<S>, tol: f64) -> Result<Self, TransformError> {
        for row in 0..4 {
            for col in 0..4 {
                if !matrix[(row, col)].is_finite() {
                    return Err(TransformError::NonFinite { row, col });
                }
            }
        }
        let bottom = [S::zero(), S::zero(), S::zero(), S::one()];
        for (col, expected) in bottom.iter().enumerate() {
            if (matrix[(3, col)] - *expected).abs().to_f64() > tol {
                return Err(TransformError::NotAffine);
            }
        }
        let candidate = Self { matrix };
        let (error, determinant) = candidate.rigidity_error();
        if error > tol || (determinant - 1.0).abs() > tol {
            return Err(TransformError::NotRigid { error, determinant });
        }
        Ok(candidate)
    }

    /// Validates a row-major list of 16 entries. See [`Transform::from_matrix`].
    pub fn from_row_slice(rows: &[S; 16], tol: f64) -> Result<Self, TransformError> {
        Self::from_matrix(Matrix4::from_row_slice(rows), tol)
    }

    /// The 16 entries in row-major order.
    pub fn to_row_array(&self) -> [S; 16] {
        let mut out = [S::zero(); 16];
        for row in 0..4 {
            for col in 0..4 {
                out[row * 4 + col] = self.matrix[(row, col)];
            }
        }
        out
    }

    /// The underlying homogeneous matrix.
    pub fn matrix(&self) -> &Matrix4<S> {
        &self.matrix
    }

    /// Translation component.
    pub fn translation_part(&self) -> Vec3<S> {
        Vec3::new(self.matrix[(0, 3)], self.matrix[(1, 3)], self.matrix[(2, 3)])
    }

    /// Largest deviation of `R^T R` from the identity, and `det(R)`, as `f64`.
    pub fn rigidity_error(&self) -> (f64, f64) {
        let m = &self.matrix;
        let mut error = 0.0f64;
        for i in 0..3 {
            for j in 0..3 {
                let mut dot = S::zero();
                for k in 0..3 {
                    dot += m[(k, i)] * m[(k, j)];
                }
                let expected = if i == j { S::one() } else { S::zero() };
                error = error.max((dot - expected).abs().to_f64());
            }
        }
        let det = m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
            - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
            + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)]);
        (error, det.to_f64())
    }

    /// Compose as `self * other`: applies `other` first, then `self`.
    pub fn then(&self, other: &Transform<S>) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Vec3<S>) -> Vec3<S> {
        self.apply_vec(p) + self.translation_part()
    }

    /// Transform a direction vector (rotation only).
    pub fn apply_vec(&self, v: &Vec3<S>) -> Vec3<S> {
        let m = &self.matrix;
        Vec3::new(
            m[(0, 0)] * v.x + m[(0, 1)] * v.y + m[(0, 2)] * v.z,
            m[(1, 0)] * v.x + m[(1, 1)] * v.y + m[(1, 2)] * v.z,
            m[(2, 0)] * v.x + m[(2, 1)] * v.y + m[(2, 2)] * v.z,
        )
    }

    /// Map a parent-frame point into this transform's local frame.
    pub fn inverse_apply_point(&self, p: &Vec3<S>) -> Vec3<S> {
        self.inverse_apply_vec(&(p - self.translation_part()))
    }

    /// Map a parent-frame direction into this transform's local frame.
    pub fn inverse_apply_vec(&self, v: &Vec3<S>) -> Vec3<S> {
        let m = &self.matrix;
        Vec3::new(
            m[(0, 0)] * v.x + m[(1, 0)] * v.y + m[(2, 0)] * v.z,
            m[(0, 1)] * v.x + m[(1, 1)] * v.y + m[(2, 1)] * v.z,
            m[(0, 2)] * v.x + m[(1, 2)] * v.y + m[(2, 2)] * v.z,
        )
    }

    /// Inverse motion: `R^T` and `-R^T t`. Always exists for a rigid transform.
    pub fn inverse(&self) -> Self {
        let mut m = Matrix4::identity();
        for i in 0..3 {
            for j in 0..3 {
                m[(i, j)] = self.matrix[(j, i)];
            }
        }
        let t = self.inverse_apply_vec(&self.translation_part());
        m[(0, 3)] = -t.x;
        m[(1, 3)] = -t.y;
        m[(2, 3)] = -t.z;
        Self { matrix: m }
    }

    /// Converts every entry to another scalar backend.
    pub fn cast<T: Scalar>(&self) -> Transform<T> {
        Transform {
            matrix: self.matrix.map(|x| x.cast::<T>()),
        }
    }

    /// True when this is exactly the identity matrix.
    pub fn is_identity(&self) -> bool {
        self.matrix == Matrix4::identity()
    }
}

impl<S: Scalar> Default for Transform<S> {
    fn default() -> Self {
        Self::identity()
    }
}
