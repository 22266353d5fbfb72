//! Scalar abstraction shared by every geometry algorithm.
//!
//! Geometry code is written once against [`Scalar`] and instantiated with
//! either native `f64` or the double-double [`Quad`](crate::Quad). Both
//! backends expose the same arithmetic, transcendental, rounding and
//! classification operations under the same names, so a distance
//! computation that loses too many digits in `f64` can be rerun in `Quad`
//! without touching the algorithm.
//!
//! Contract:
//! - Every operation is pure and total. Invalid inputs propagate NaN the way
//!   IEEE-754 does; nothing panics or returns an error.
//! - `is_finite` is `!is_inf && !is_nan`, `abs` is `fabs`.
//! - `fmin`/`fmax` return the other operand when exactly one is NaN.
//! - `to_f64(from_f64(x)) == x` for every `f64` `x`.

use core::fmt;
use core::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use core::str::FromStr;

use num_traits::{One, Zero};

/// Arithmetic and transcendental operations required by the geometry kernel.
///
/// The operator supertraits make `+ - * /` and unary `-` available in generic
/// code, and together with [`Zero`]/[`One`] they satisfy nalgebra's bounds so
/// `Vector3<S>` and `Matrix4<S>` support dot/cross products and matrix
/// multiplication for any backend.
pub trait Scalar:
    Copy
    + fmt::Debug
    + fmt::Display
    + FromStr
    + Default
    + PartialEq
    + PartialOrd
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
    + Zero
    + One
{
    /// Short backend name, used in diagnostics.
    const NAME: &'static str;

    /// Number of `f64` words the binary codec needs to store one value losslessly.
    const WIDTH: u8;

    /// Widens a native double. Exact for every backend.
    fn from_f64(value: f64) -> Self;

    /// Narrows to a native double (round to nearest).
    fn to_f64(self) -> f64;

    /// Splits the value into an unevaluated sum `hi + lo` of doubles.
    ///
    /// For `f64` the low word is always zero.
    fn to_parts(self) -> (f64, f64);

    /// Rebuilds a value from an unevaluated sum `hi + lo`.
    fn from_parts(hi: f64, lo: f64) -> Self;

    /// Positive infinity.
    fn infinity() -> Self {
        Self::from_f64(f64::INFINITY)
    }

    /// A quiet NaN.
    fn nan() -> Self {
        Self::from_f64(f64::NAN)
    }

    /// Machine epsilon of the backend.
    fn epsilon() -> Self;

    /// Archimedes' constant at the backend's precision.
    fn pi() -> Self;

    /// Converts between backends without going through a single `f64`.
    ///
    /// Widening is exact; narrowing a `Quad` into `f64` rounds.
    fn cast<T: Scalar>(self) -> T {
        let (hi, lo) = self.to_parts();
        T::from_parts(hi, lo)
    }

    /// Sine (radians).
    fn sin(self) -> Self;
    /// Cosine (radians).
    fn cos(self) -> Self;
    /// Tangent (radians).
    fn tan(self) -> Self;
    /// Arcsine.
    fn asin(self) -> Self;
    /// Arccosine.
    fn acos(self) -> Self;
    /// Arctangent.
    fn atan(self) -> Self;
    /// Four-quadrant arctangent of `self / other`.
    fn atan2(self, other: Self) -> Self;
    /// Hyperbolic sine.
    fn sinh(self) -> Self;
    /// Hyperbolic cosine.
    fn cosh(self) -> Self;
    /// Hyperbolic tangent.
    fn tanh(self) -> Self;
    /// Inverse hyperbolic sine.
    fn asinh(self) -> Self;
    /// Inverse hyperbolic cosine.
    fn acosh(self) -> Self;
    /// Inverse hyperbolic tangent.
    fn atanh(self) -> Self;

    /// Both sine and cosine.
    fn sin_cos(self) -> (Self, Self) {
        (self.sin(), self.cos())
    }

    /// Natural exponential.
    fn exp(self) -> Self;
    /// Natural logarithm.
    fn log(self) -> Self;
    /// Base-2 logarithm.
    fn log2(self) -> Self;
    /// Base-10 logarithm.
    fn log10(self) -> Self;
    /// `self` raised to `exponent`.
    fn pow(self, exponent: Self) -> Self;
    /// Square root.
    fn sqrt(self) -> Self;
    /// Cube root (defined for negative inputs).
    fn cbrt(self) -> Self;
    /// Gauss error function. Odd, with `erf(±inf) = ±1`.
    fn erf(self) -> Self;
    /// Complementary error function `1 - erf(self)`, without the
    /// cancellation for large arguments.
    fn erfc(self) -> Self;

    /// Smallest integer not less than `self`.
    fn ceil(self) -> Self;
    /// Largest integer not greater than `self`.
    fn floor(self) -> Self;
    /// Nearest integer, halfway cases away from zero.
    fn round(self) -> Self;
    /// Remainder of `self / other` with the sign of `self` (C `fmod`).
    fn fmod(self, other: Self) -> Self;

    /// Minimum that ignores a single NaN operand.
    fn fmin(self, other: Self) -> Self {
        if self.is_nan() {
            other
        } else if other.is_nan() || self <= other {
            self
        } else {
            other
        }
    }

    /// Maximum that ignores a single NaN operand.
    fn fmax(self, other: Self) -> Self {
        if self.is_nan() {
            other
        } else if other.is_nan() || self >= other {
            self
        } else {
            other
        }
    }

    /// Absolute value.
    fn fabs(self) -> Self;

    /// Absolute value; identical to [`Scalar::fabs`].
    fn abs(self) -> Self {
        self.fabs()
    }

    /// True for NaN.
    fn is_nan(self) -> bool;
    /// True for positive or negative infinity.
    fn is_inf(self) -> bool;

    /// Neither infinite nor NaN.
    fn is_finite(self) -> bool {
        !self.is_inf() && !self.is_nan()
    }

    /// Splits into a mantissa with magnitude in `[0.5, 1)` and a power of two.
    ///
    /// Zero, infinities and NaN are returned unchanged with exponent 0.
    fn frexp(self) -> (Self, i32);

    /// Multiplies by `2^exp`.
    fn ldexp(self, exp: i32) -> Self;

    /// Square of the value.
    fn sq(self) -> Self {
        self * self
    }

    /// Sign-preserving clamp into `[lo, hi]`.
    fn clamp_to(self, lo: Self, hi: Self) -> Self {
        if self < lo {
            lo
        } else if self > hi {
            hi
        } else {
            self
        }
    }
}

/// `frexp` for native doubles, including subnormals.
pub(crate) fn frexp_f64(x: f64) -> (f64, i32) {
    if x == 0.0 || x.is_nan() || x.is_infinite() {
        return (x, 0);
    }
    let bits = x.to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i32;
    if biased == 0 {
        // Subnormal: lift into the normal range first.
        let (m, e) = frexp_f64(x * pow2(54));
        return (m, e - 54);
    }
    let mantissa = f64::from_bits((bits & !(0x7ffu64 << 52)) | (1022u64 << 52));
    (mantissa, biased - 1022)
}

/// `ldexp` for native doubles, stepping so large exponents do not overflow
/// the scale factor before the product is formed.
pub(crate) fn ldexp_f64(mut x: f64, mut exp: i32) -> f64 {
    while exp > 1023 {
        x *= pow2(1023);
        exp -= 1023;
        if x.is_infinite() {
            return x;
        }
    }
    while exp < -1022 {
        x *= pow2(-1022);
        exp += 1022;
        if x == 0.0 {
            return x;
        }
    }
    x * pow2(exp)
}

/// Exact `2^e` for `e` in the normal exponent range.
fn pow2(e: i32) -> f64 {
    debug_assert!((-1022..=1023).contains(&e));
    f64::from_bits(((e + 1023) as u64) << 52)
}

impl Scalar for f64 {
    const NAME: &'static str = "f64";
    const WIDTH: u8 = 1;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn to_parts(self) -> (f64, f64) {
        (self, 0.0)
    }

    #[inline]
    fn from_parts(hi: f64, lo: f64) -> Self {
        hi + lo
    }

    fn infinity() -> Self {
        f64::INFINITY
    }

    fn nan() -> Self {
        f64::NAN
    }

    fn epsilon() -> Self {
        f64::EPSILON
    }

    fn pi() -> Self {
        core::f64::consts::PI
    }

    fn sin(self) -> Self {
        f64::sin(self)
    }
    fn cos(self) -> Self {
        f64::cos(self)
    }
    fn tan(self) -> Self {
        f64::tan(self)
    }
    fn asin(self) -> Self {
        f64::asin(self)
    }
    fn acos(self) -> Self {
        f64::acos(self)
    }
    fn atan(self) -> Self {
        f64::atan(self)
    }
    fn atan2(self, other: Self) -> Self {
        f64::atan2(self, other)
    }
    fn sinh(self) -> Self {
        f64::sinh(self)
    }
    fn cosh(self) -> Self {
        f64::cosh(self)
    }
    fn tanh(self) -> Self {
        f64::tanh(self)
    }
    fn asinh(self) -> Self {
        f64::asinh(self)
    }
    fn acosh(self) -> Self {
        f64::acosh(self)
    }
    fn atanh(self) -> Self {
        f64::atanh(self)
    }

    fn sin_cos(self) -> (Self, Self) {
        f64::sin_cos(self)
    }

    fn exp(self) -> Self {
        f64::exp(self)
    }
    fn log(self) -> Self {
        f64::ln(self)
    }
    fn log2(self) -> Self {
        f64::log2(self)
    }
    fn log10(self) -> Self {
        f64::log10(self)
    }
    fn pow(self, exponent: Self) -> Self {
        f64::powf(self, exponent)
    }
    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }
    fn cbrt(self) -> Self {
        f64::cbrt(self)
    }
    fn erf(self) -> Self {
        libm::erf(self)
    }
    fn erfc(self) -> Self {
        libm::erfc(self)
    }

    fn ceil(self) -> Self {
        f64::ceil(self)
    }
    fn floor(self) -> Self {
        f64::floor(self)
    }
    fn round(self) -> Self {
        f64::round(self)
    }
    fn fmod(self, other: Self) -> Self {
        self % other
    }

    fn fabs(self) -> Self {
        f64::abs(self)
    }

    fn is_nan(self) -> bool {
        f64::is_nan(self)
    }
    fn is_inf(self) -> bool {
        f64::is_infinite(self)
    }

    fn frexp(self) -> (Self, i32) {
        frexp_f64(self)
    }
    fn ldexp(self, exp: i32) -> Self {
        ldexp_f64(self, exp)
    }
}
