//! Double-double extended-precision backend.
//!
//! [`Quad`] wraps [`twofloat::TwoFloat`] (an unevaluated sum of two `f64`s,
//! about 106 bits of mantissa) and implements [`Scalar`] for it. Near-degenerate
//! predicates such as the radial/axial comparison of a point that sits almost
//! on a cylinder rim keep their significant digits in this backend where
//! plain `f64` would cancel them away.
//!
//! Text I/O goes through `f64`: [`Display`](fmt::Display) narrows before
//! formatting and [`FromStr`] parses a double and widens it. This loses
//! precision and is meant for logs and debugging only; the binary codec
//! stores both words.

use core::cmp::Ordering;
use core::fmt;
use core::num::ParseFloatError;
use core::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Rem, Sub, SubAssign};
use core::str::FromStr;

use num_traits::{One, Zero};
use twofloat::TwoFloat;

use crate::scalar::{frexp_f64, ldexp_f64, Scalar};

/// Extended-precision scalar (double-double).
#[derive(Clone, Copy)]
pub struct Quad(TwoFloat);

impl Quad {
    /// Wraps a raw `TwoFloat`.
    pub fn new(value: TwoFloat) -> Self {
        Self(value)
    }

    /// The wrapped `TwoFloat`.
    pub fn into_inner(self) -> TwoFloat {
        self.0
    }

    /// High-order word.
    #[inline]
    pub fn hi(self) -> f64 {
        self.0.hi()
    }

    /// Low-order word.
    #[inline]
    pub fn lo(self) -> f64 {
        self.0.lo()
    }

    fn trunc_quotient(self, other: Self) -> Self {
        let q = self / other;
        if q >= Self::zero() {
            Scalar::floor(q)
        } else {
            Scalar::ceil(q)
        }
    }
}

impl From<f64> for Quad {
    fn from(value: f64) -> Self {
        Self(TwoFloat::from(value))
    }
}

impl From<Quad> for f64 {
    fn from(value: Quad) -> Self {
        value.to_f64()
    }
}

impl Default for Quad {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Debug for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Quad({:e} + {:e})", self.hi(), self.lo())
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_f64(), f)
    }
}

impl FromStr for Quad {
    type Err = ParseFloatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<f64>().map(Self::from_f64)
    }
}

impl PartialEq for Quad {
    fn eq(&self, other: &Self) -> bool {
        self.hi() == other.hi() && self.lo() == other.lo()
    }
}

impl PartialOrd for Quad {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.hi().partial_cmp(&other.hi())? {
            Ordering::Equal => self.lo().partial_cmp(&other.lo()),
            ord => Some(ord),
        }
    }
}

macro_rules! forward_binop {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident, $op:tt) => {
        impl $trait for Quad {
            type Output = Quad;
            #[inline]
            fn $method(self, rhs: Quad) -> Quad {
                Quad(self.0 $op rhs.0)
            }
        }

        impl $trait<f64> for Quad {
            type Output = Quad;
            #[inline]
            fn $method(self, rhs: f64) -> Quad {
                Quad(self.0 $op rhs)
            }
        }

        impl $assign_trait for Quad {
            #[inline]
            fn $assign_method(&mut self, rhs: Quad) {
                *self = *self $op rhs;
            }
        }
    };
}

forward_binop!(Add, add, AddAssign, add_assign, +);
forward_binop!(Sub, sub, SubAssign, sub_assign, -);
forward_binop!(Mul, mul, MulAssign, mul_assign, *);
forward_binop!(Div, div, DivAssign, div_assign, /);

impl Rem for Quad {
    type Output = Quad;

    fn rem(self, rhs: Quad) -> Quad {
        Scalar::fmod(self, rhs)
    }
}

impl Neg for Quad {
    type Output = Quad;

    #[inline]
    fn neg(self) -> Quad {
        Quad(-self.0)
    }
}

impl Zero for Quad {
    fn zero() -> Self {
        Self::from_f64(0.0)
    }

    fn is_zero(&self) -> bool {
        self.hi() == 0.0
    }
}

impl One for Quad {
    fn one() -> Self {
        Self::from_f64(1.0)
    }
}

// hi and lo words of pi, ln 2 and ln 10.
const PI_PARTS: (f64, f64) = (3.141_592_653_589_793, 1.224_646_799_147_353_2e-16);
const LN_2_PARTS: (f64, f64) = (0.693_147_180_559_945_3, 2.319_046_813_846_299_6e-17);
const LN_10_PARTS: (f64, f64) = (2.302_585_092_994_046, -2.170_756_223_382_249_4e-16);

// Below this the erf series is used, above it the erfc continued fraction.
const ERF_SPLIT: f64 = 4.0;
const ERF_MAX_TERMS: usize = 500;
const ERFC_CF_DEPTH: usize = 300;
// erfc is below the normal f64 range past this point and exp(x^2) overflows soon after.
const ERFC_UNDERFLOW: f64 = 26.5;

impl Quad {
    /// `erf(x)` for `0 <= x < ERF_SPLIT` from the all-positive series
    /// `2/sqrt(pi) * exp(-x^2) * sum 2^n x^(2n+1) / (2n+1)!!`.
    fn erf_series(self) -> Self {
        let two_x2 = self * self * 2.0;
        let mut term = self;
        let mut sum = self;
        for n in 1..ERF_MAX_TERMS {
            term = term * two_x2 / (2 * n + 1) as f64;
            sum += term;
            if term <= sum * Self::epsilon() {
                break;
            }
        }
        sum * 2.0 / (gauss_inverse(self) * Self::pi().sqrt())
    }

    /// `erfc(x)` for `x >= ERF_SPLIT` from the Laplace continued fraction
    /// `exp(-x^2)/sqrt(pi) / (x + (1/2)/(x + 1/(x + (3/2)/(x + ...))))`,
    /// evaluated from the tail.
    fn erfc_fraction(self) -> Self {
        if self > Self::from_f64(ERFC_UNDERFLOW) {
            return Self::zero();
        }
        let mut t = self;
        for k in (1..=ERFC_CF_DEPTH).rev() {
            t = self + Self::from_f64(k as f64 * 0.5) / t;
        }
        Self::one() / (gauss_inverse(self) * Self::pi().sqrt() * t)
    }
}

/// `exp(x^2)`. Kept at a positive argument, where twofloat's range
/// reduction lands inside its polynomial's interval.
fn gauss_inverse(x: Quad) -> Quad {
    (x * x).exp()
}

impl Scalar for Quad {
    const NAME: &'static str = "quad";
    const WIDTH: u8 = 2;

    #[inline]
    fn from_f64(value: f64) -> Self {
        Self(TwoFloat::from(value))
    }

    #[inline]
    fn to_f64(self) -> f64 {
        if self.lo() == 0.0 {
            // keeps the sign of -0.0
            return self.hi();
        }
        self.hi() + self.lo()
    }

    #[inline]
    fn to_parts(self) -> (f64, f64) {
        (self.hi(), self.lo())
    }

    #[inline]
    fn from_parts(hi: f64, lo: f64) -> Self {
        if lo == 0.0 || !hi.is_finite() {
            return Self::from_f64(hi);
        }
        Self(TwoFloat::from(hi) + lo)
    }

    fn infinity() -> Self {
        Self::from_f64(f64::INFINITY)
    }

    fn nan() -> Self {
        Self::from_f64(f64::NAN)
    }

    fn epsilon() -> Self {
        // 2^-104: one unit in the last place of the low word relative to 1.
        Self::from_f64(ldexp_f64(1.0, -104))
    }

    fn pi() -> Self {
        Self::from_parts(PI_PARTS.0, PI_PARTS.1)
    }

    fn sin(self) -> Self {
        Self(self.0.sin())
    }
    fn cos(self) -> Self {
        Self(self.0.cos())
    }
    fn tan(self) -> Self {
        Self(self.0.tan())
    }
    fn asin(self) -> Self {
        Self(self.0.asin())
    }
    fn acos(self) -> Self {
        Self(self.0.acos())
    }
    fn atan(self) -> Self {
        Self(self.0.atan())
    }
    fn atan2(self, other: Self) -> Self {
        Self(self.0.atan2(other.0))
    }
    fn sinh(self) -> Self {
        Self(self.0.sinh())
    }
    fn cosh(self) -> Self {
        Self(self.0.cosh())
    }
    fn tanh(self) -> Self {
        Self(self.0.tanh())
    }
    fn asinh(self) -> Self {
        Self(self.0.asinh())
    }
    fn acosh(self) -> Self {
        Self(self.0.acosh())
    }
    fn atanh(self) -> Self {
        Self(self.0.atanh())
    }

    fn exp(self) -> Self {
        Self(self.0.exp())
    }
    fn log(self) -> Self {
        Self(self.0.ln())
    }
    fn log2(self) -> Self {
        self.log() / Self::from_parts(LN_2_PARTS.0, LN_2_PARTS.1)
    }
    fn log10(self) -> Self {
        self.log() / Self::from_parts(LN_10_PARTS.0, LN_10_PARTS.1)
    }
    fn pow(self, exponent: Self) -> Self {
        Self(self.0.powf(exponent.0))
    }
    fn sqrt(self) -> Self {
        Self(self.0.sqrt())
    }

    fn cbrt(self) -> Self {
        // One Newton step from the f64 estimate doubles the correct digits.
        let seed = self.to_f64().cbrt();
        if seed == 0.0 || !seed.is_finite() {
            return Self::from_f64(seed);
        }
        let y = Self::from_f64(seed);
        y - (y * y * y - self) / (y * y * 3.0)
    }

    fn erf(self) -> Self {
        if self.is_nan() || self.is_zero() {
            return self;
        }
        let x = self.fabs();
        let magnitude = if x < Self::from_f64(ERF_SPLIT) {
            x.erf_series()
        } else {
            Self::one() - x.erfc_fraction()
        };
        if self < Self::zero() {
            -magnitude
        } else {
            magnitude
        }
    }

    fn erfc(self) -> Self {
        if self.is_nan() {
            return self;
        }
        if self < Self::zero() {
            return Self::from_f64(2.0) - (-self).erfc();
        }
        if self < Self::from_f64(ERF_SPLIT) {
            Self::one() - self.erf_series()
        } else {
            self.erfc_fraction()
        }
    }

    fn ceil(self) -> Self {
        let hi = self.hi().ceil();
        if hi != self.hi() {
            return Self::from_f64(hi);
        }
        Self::from_parts(hi, self.lo().ceil())
    }

    fn floor(self) -> Self {
        let hi = self.hi().floor();
        if hi != self.hi() {
            return Self::from_f64(hi);
        }
        Self::from_parts(hi, self.lo().floor())
    }

    fn round(self) -> Self {
        let half = Self::from_f64(0.5);
        if self >= Self::zero() {
            let f = self.floor();
            if self - f >= half {
                f + Self::one()
            } else {
                f
            }
        } else {
            -(-self).round()
        }
    }

    fn fmod(self, other: Self) -> Self {
        if other.is_zero() || self.is_inf() || self.is_nan() || other.is_nan() {
            return Self::nan();
        }
        if other.is_inf() {
            return self;
        }
        self - self.trunc_quotient(other) * other
    }

    fn fabs(self) -> Self {
        if self.hi() < 0.0 {
            -self
        } else {
            self
        }
    }

    fn is_nan(self) -> bool {
        self.hi().is_nan()
    }

    fn is_inf(self) -> bool {
        self.hi().is_infinite()
    }

    fn frexp(self) -> (Self, i32) {
        if self.is_zero() || !self.is_finite() {
            return (self, 0);
        }
        let (_, mut e) = frexp_f64(self.hi());
        let mut m = self.ldexp(-e);
        // hi can be exactly +-0.5 with a low word that pulls the sum below it.
        if m.fabs() < Self::from_f64(0.5) {
            m = m.ldexp(1);
            e -= 1;
        }
        (m, e)
    }

    fn ldexp(self, exp: i32) -> Self {
        Self::from_parts(ldexp_f64(self.hi(), exp), ldexp_f64(self.lo(), exp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn q(x: f64) -> Quad {
        Quad::from_f64(x)
    }

    #[test]
    fn test_extra_precision_survives_cancellation() {
        // 1 + 2^-60 is not representable as f64 but is as a double-double.
        let tiny = ldexp_f64(1.0, -60);
        let a = q(1.0) + q(tiny);
        let diff = a - q(1.0);
        assert_eq!(diff.to_f64(), tiny);
        assert_eq!((1.0f64 + tiny) - 1.0, 0.0);
    }

    #[test]
    fn test_parts_roundtrip() {
        let tiny = ldexp_f64(1.0, -70);
        let a = q(3.0) + q(tiny);
        let (hi, lo) = a.to_parts();
        assert_eq!(hi, 3.0);
        assert_eq!(lo, tiny);
        assert_eq!(Quad::from_parts(hi, lo), a);
    }

    #[test]
    fn test_cast_between_backends() {
        let x = 0.1f64;
        let wide: Quad = x.cast();
        let back: f64 = wide.cast();
        assert_eq!(back, x);
    }

    #[test]
    fn test_sqrt_and_cbrt() {
        assert_relative_eq!(q(2.0).sqrt().to_f64(), 2f64.sqrt());
        assert_relative_eq!(q(27.0).cbrt().to_f64(), 3.0);
        assert_relative_eq!(q(-8.0).cbrt().to_f64(), -2.0);
        assert_eq!(q(0.0).cbrt().to_f64(), 0.0);
    }

    #[test]
    fn test_rounding() {
        assert_eq!(q(2.5).round().to_f64(), 3.0);
        assert_eq!(q(-2.5).round().to_f64(), -3.0);
        assert_eq!(q(2.4).floor().to_f64(), 2.0);
        assert_eq!(q(-2.4).floor().to_f64(), -3.0);
        assert_eq!(q(2.4).ceil().to_f64(), 3.0);
        assert_eq!(q(-2.4).ceil().to_f64(), -2.0);

        // Integer hi word with a negative low word.
        let below_three = q(3.0) - q(ldexp_f64(1.0, -80));
        assert_eq!(below_three.floor().to_f64(), 2.0);
        assert_eq!(below_three.ceil().to_f64(), 3.0);
    }

    #[test]
    fn test_fmod() {
        assert_relative_eq!(q(7.5).fmod(q(2.0)).to_f64(), 1.5);
        assert_relative_eq!(q(-7.5).fmod(q(2.0)).to_f64(), -1.5);
        assert!(q(1.0).fmod(q(0.0)).is_nan());
        assert_eq!(q(1.25).fmod(Quad::infinity()).to_f64(), 1.25);
    }

    #[test]
    fn test_transcendentals_match_f64() {
        let x = 0.7;
        assert_relative_eq!(q(x).sin().to_f64(), x.sin(), epsilon = 1e-15);
        assert_relative_eq!(q(x).cos().to_f64(), x.cos(), epsilon = 1e-15);
        assert_relative_eq!(q(x).atan2(q(0.3)).to_f64(), x.atan2(0.3), epsilon = 1e-15);
        assert_relative_eq!(q(x).exp().to_f64(), x.exp(), epsilon = 1e-14);
        assert_relative_eq!(q(x).log().to_f64(), x.ln(), epsilon = 1e-15);
        assert_relative_eq!(q(8.0).log2().to_f64(), 3.0, epsilon = 1e-15);
        assert_relative_eq!(q(1000.0).log10().to_f64(), 3.0, epsilon = 1e-15);
        assert_relative_eq!(q(2.0).pow(q(0.5)).to_f64(), 2f64.sqrt(), epsilon = 1e-15);
        assert_relative_eq!(Quad::pi().to_f64(), core::f64::consts::PI);
    }

    #[test]
    fn test_classification() {
        assert!(Quad::nan().is_nan());
        assert!(Quad::infinity().is_inf());
        assert!((-Quad::infinity()).is_inf());
        assert!(!Quad::infinity().is_finite());
        assert!(q(1.0).is_finite());
        assert_eq!(q(-4.0).abs().to_f64(), 4.0);
    }

    #[test]
    fn test_text_io_goes_through_f64() {
        let parsed: Quad = "0.25".parse().unwrap();
        assert_eq!(parsed.to_f64(), 0.25);
        let wide = q(1.0) + q(ldexp_f64(1.0, -80));
        assert_eq!(wide.to_string(), "1");
        assert_eq!(format!("{:.2}", q(1.5)), "1.50");
        assert!("abc".parse::<Quad>().is_err());
    }

    #[test]
    fn test_frexp_ldexp() {
        let (m, e) = q(12.0).frexp();
        assert_eq!(m.to_f64(), 0.75);
        assert_eq!(e, 4);
        assert_eq!(m.ldexp(e).to_f64(), 12.0);

        let just_below_half = q(0.5) - q(ldexp_f64(1.0, -90));
        let (m, e) = just_below_half.frexp();
        assert!(m >= q(0.5) && m < q(1.0));
        assert_eq!(e, -1);
        assert_eq!(m.ldexp(e), just_below_half);
    }

    fn assert_close(value: Quad, (hi, lo): (f64, f64), rel: f64) {
        let expected = Quad::from_parts(hi, lo);
        let err = ((value - expected) / expected).fabs().to_f64();
        assert!(err <= rel, "{value:?} vs {expected:?}: relative error {err:e}");
    }

    #[test]
    fn test_erf_special_values() {
        assert_eq!(q(0.0).erf().to_f64(), 0.0);
        assert!(q(-0.0).erf().to_f64().is_sign_negative());
        assert_eq!(q(0.0).erfc().to_f64(), 1.0);
        assert_eq!(Quad::infinity().erf().to_f64(), 1.0);
        assert_eq!((-Quad::infinity()).erf().to_f64(), -1.0);
        assert_eq!(Quad::infinity().erfc().to_f64(), 0.0);
        assert_eq!((-Quad::infinity()).erfc().to_f64(), 2.0);
        assert!(Quad::nan().erf().is_nan());
        assert!(Quad::nan().erfc().is_nan());
        assert_eq!(q(40.0).erfc().to_f64(), 0.0);
        assert_eq!(q(40.0).erf().to_f64(), 1.0);
    }

    #[test]
    fn test_erf_beyond_f64_precision() {
        // hi and lo words of the exact values
        assert_close(q(1.0).erf(), (0.842_700_792_949_714_9, -2.480_101_178_911_860_2e-17), 1e-26);
        assert_close(q(3.0).erf(), (0.999_977_909_503_001_4, 5.363_397_058_636_269e-17), 1e-26);
        assert_close(q(2.0).erfc(), (0.004_677_734_981_047_266, -3.879_423_832_664_125_6e-19), 1e-24);
        assert_close(q(4.0).erfc(), (1.541_725_790_028_002e-8, -1.141_787_216_837_102_6e-24), 1e-24);
        assert_close(q(5.0).erfc(), (1.537_459_794_428_035e-12, -8.569_418_222_079_096e-29), 1e-24);
    }

    #[test]
    fn test_erf_agrees_with_f64() {
        for x in [-5.5, -2.0, -0.3, 1e-10, 0.5, 3.999, 4.0, 4.5, 9.0] {
            assert_relative_eq!(q(x).erf().to_f64(), Scalar::erf(x), max_relative = 1e-15);
            assert_relative_eq!(q(x).erfc().to_f64(), Scalar::erfc(x), max_relative = 1e-13);
        }
    }

    proptest! {
        #[test]
        fn prop_erf_odd_and_complementary(x in -6.0f64..6.0) {
            let x = q(x);
            prop_assert_eq!((-x).erf(), -x.erf());
            let gap = (x.erf() + x.erfc() - q(1.0)).fabs().to_f64();
            prop_assert!(gap <= 1e-28, "erf + erfc - 1 = {:e}", gap);
        }

        #[test]
        fn prop_widen_narrow_identity(bits in any::<u64>()) {
            let x = f64::from_bits(bits);
            let y = Quad::from_f64(x).to_f64();
            prop_assert!(y.to_bits() == x.to_bits() || (x.is_nan() && y.is_nan()));
        }

        #[test]
        fn prop_is_finite_derivation(bits in any::<u64>()) {
            let x = Quad::from_f64(f64::from_bits(bits));
            prop_assert_eq!(x.is_finite(), !x.is_nan() && !x.is_inf());
        }
    }
}
