use crate::error::ArithmeticError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Exact rational number used for all cycle arithmetic.
///
/// Always normalized: gcd-reduced, denominator positive, sign on the
/// numerator. 128-bit components; arithmetic fails loudly on overflow
/// instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fraction {
    numerator: i128,
    denominator: i128,
}

impl Fraction {
    pub const ZERO: Fraction = Fraction {
        numerator: 0,
        denominator: 1,
    };
    pub const ONE: Fraction = Fraction {
        numerator: 1,
        denominator: 1,
    };

    /// Create a normalized fraction. Panics on a zero denominator; use
    /// [`Fraction::try_new`] where the denominator is not trusted.
    pub fn new(numerator: i128, denominator: i128) -> Self {
        Self::try_new(numerator, denominator).expect("fraction denominator is zero")
    }

    pub fn try_new(numerator: i128, denominator: i128) -> Result<Self, ArithmeticError> {
        if denominator == 0 {
            return Err(ArithmeticError::ZeroDenominator);
        }
        let mut f = Fraction {
            numerator,
            denominator,
        };
        f.normalize();
        Ok(f)
    }

    pub fn from_int(n: i64) -> Self {
        Fraction {
            numerator: n as i128,
            denominator: 1,
        }
    }

    /// Closest fraction with denominator 10^7, enough for the engine's
    /// boundary epsilon and for script-supplied doubles.
    pub fn from_f64(value: f64) -> Self {
        const SCALE: f64 = 10_000_000.0;
        let n = (value * SCALE).round();
        if !n.is_finite() {
            return Fraction::ZERO;
        }
        Fraction::new(n as i128, SCALE as i128)
    }

    pub fn to_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    pub fn numerator(&self) -> i128 {
        self.numerator
    }

    pub fn denominator(&self) -> i128 {
        self.denominator
    }

    fn normalize(&mut self) {
        let gcd = Self::gcd(self.numerator.abs(), self.denominator.abs());
        self.numerator /= gcd;
        self.denominator /= gcd;
        if self.denominator < 0 {
            self.numerator = -self.numerator;
            self.denominator = -self.denominator;
        }
    }

    fn gcd(mut a: i128, mut b: i128) -> i128 {
        while b != 0 {
            let t = b;
            b = a % b;
            a = t;
        }
        a.max(1)
    }

    fn mul_i128(a: i128, b: i128, op: &'static str) -> Result<i128, ArithmeticError> {
        a.checked_mul(b).ok_or(ArithmeticError::Overflow { op })
    }

    fn mul_loud(a: i128, b: i128, op: &'static str) -> i128 {
        Self::mul_i128(a, b, op).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Multiply, reporting 128-bit overflow instead of panicking.
    pub fn checked_mul(self, other: Fraction) -> Result<Self, ArithmeticError> {
        Fraction::try_new(
            Self::mul_i128(self.numerator, other.numerator, "mul")?,
            Self::mul_i128(self.denominator, other.denominator, "mul")?,
        )
    }

    /// Add, reporting 128-bit overflow instead of panicking.
    pub fn checked_add(self, other: Fraction) -> Result<Self, ArithmeticError> {
        let den = Self::mul_i128(self.denominator, other.denominator, "add")?;
        let left = Self::mul_i128(self.numerator, other.denominator, "add")?;
        let right = Self::mul_i128(other.numerator, self.denominator, "add")?;
        let num = left
            .checked_add(right)
            .ok_or(ArithmeticError::Overflow { op: "add" })?;
        Fraction::try_new(num, den)
    }

    /// Rational least common multiple: lcm(a/b, c/d) = lcm(a, c) / gcd(b, d).
    pub fn lcm(self, other: Fraction) -> Fraction {
        if self.numerator == 0 || other.numerator == 0 {
            return Fraction::ZERO;
        }
        let num_gcd = Self::gcd(self.numerator.abs(), other.numerator.abs());
        let num = Self::mul_loud(self.numerator.abs() / num_gcd, other.numerator.abs(), "lcm");
        let den = Self::gcd(self.denominator, other.denominator);
        Fraction::new(num, den)
    }

    pub fn reciprocal(self) -> Self {
        self.checked_recip().expect("reciprocal of zero")
    }

    pub fn checked_recip(self) -> Result<Self, ArithmeticError> {
        if self.numerator == 0 {
            return Err(ArithmeticError::DivisionByZero);
        }
        Fraction::try_new(self.denominator, self.numerator)
    }

    pub fn checked_div(self, other: Fraction) -> Result<Self, ArithmeticError> {
        Ok(self * other.checked_recip()?)
    }

    pub fn is_zero(&self) -> bool {
        self.numerator == 0
    }

    pub fn is_negative(&self) -> bool {
        self.numerator < 0
    }

    pub fn abs(self) -> Self {
        Fraction {
            numerator: self.numerator.abs(),
            denominator: self.denominator,
        }
    }

    /// Largest integer not above the value.
    pub fn floor(self) -> Self {
        Fraction::from_i128(self.numerator.div_euclid(self.denominator))
    }

    /// Smallest integer not below the value.
    pub fn ceil(self) -> Self {
        let q = self.numerator.div_euclid(self.denominator);
        if self.numerator.rem_euclid(self.denominator) == 0 {
            Fraction::from_i128(q)
        } else {
            Fraction::from_i128(q + 1)
        }
    }

    /// Non-negative fractional part: `self - floor(self)`, in [0, 1).
    pub fn frac(self) -> Self {
        self - self.floor()
    }

    /// Floor as a plain integer cycle number.
    pub fn floor_int(self) -> i64 {
        self.numerator.div_euclid(self.denominator) as i64
    }

    fn from_i128(n: i128) -> Self {
        Fraction {
            numerator: n,
            denominator: 1,
        }
    }

    pub fn min(self, other: Fraction) -> Fraction {
        if self <= other {
            self
        } else {
            other
        }
    }

    pub fn max(self, other: Fraction) -> Fraction {
        if self >= other {
            self
        } else {
            other
        }
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

impl From<i64> for Fraction {
    fn from(n: i64) -> Self {
        Fraction::from_int(n)
    }
}

impl From<f64> for Fraction {
    fn from(value: f64) -> Self {
        Fraction::from_f64(value)
    }
}

impl From<(i64, i64)> for Fraction {
    fn from((num, den): (i64, i64)) -> Self {
        Fraction::new(num as i128, den as i128)
    }
}

impl Add for Fraction {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        self.checked_add(other).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl Sub for Fraction {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        self + (-other)
    }
}

impl Mul for Fraction {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        self.checked_mul(other).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl Div for Fraction {
    type Output = Self;

    #[allow(clippy::suspicious_arithmetic_impl)]
    fn div(self, other: Self) -> Self {
        self * other.reciprocal()
    }
}

impl Neg for Fraction {
    type Output = Self;

    fn neg(self) -> Self {
        Fraction {
            numerator: -self.numerator,
            denominator: self.denominator,
        }
    }
}

impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fraction {
    fn cmp(&self, other: &Self) -> Ordering {
        let left = Self::mul_loud(self.numerator, other.denominator, "cmp");
        let right = Self::mul_loud(other.numerator, self.denominator, "cmp");
        left.cmp(&right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_on_creation() {
        let f = Fraction::new(4, 8);
        assert_eq!(f.numerator(), 1);
        assert_eq!(f.denominator(), 2);

        let g = Fraction::new(3, -6);
        assert_eq!(g.numerator(), -1);
        assert_eq!(g.denominator(), 2);
    }

    #[test]
    fn zero_denominator_is_an_error() {
        assert_eq!(
            Fraction::try_new(1, 0),
            Err(ArithmeticError::ZeroDenominator)
        );
    }

    #[test]
    fn arithmetic() {
        assert_eq!(
            Fraction::new(1, 2) + Fraction::new(1, 3),
            Fraction::new(5, 6)
        );
        assert_eq!(
            Fraction::new(2, 3) * Fraction::new(3, 4),
            Fraction::new(1, 2)
        );
        assert_eq!(
            Fraction::new(1, 2) - Fraction::new(3, 4),
            Fraction::new(-1, 4)
        );
        assert_eq!(
            Fraction::new(1, 2) / Fraction::new(1, 4),
            Fraction::from_int(2)
        );
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert_eq!(
            Fraction::ONE.checked_div(Fraction::ZERO),
            Err(ArithmeticError::DivisionByZero)
        );
    }

    #[test]
    fn overflow_is_a_typed_error() {
        let big = Fraction::new(i128::MAX, 1);
        assert_eq!(
            big.checked_mul(Fraction::from_int(2)),
            Err(ArithmeticError::Overflow { op: "mul" })
        );
        assert_eq!(
            big.checked_add(big),
            Err(ArithmeticError::Overflow { op: "add" })
        );
        assert_eq!(
            big.checked_mul(Fraction::ONE),
            Ok(big)
        );
    }

    #[test]
    fn floor_ceil_frac_for_negatives() {
        let f = Fraction::new(-5, 2);
        assert_eq!(f.floor(), Fraction::from_int(-3));
        assert_eq!(f.ceil(), Fraction::from_int(-2));
        assert_eq!(f.frac(), Fraction::new(1, 2));

        let g = Fraction::new(7, 3);
        assert_eq!(g.floor(), Fraction::from_int(2));
        assert_eq!(g.ceil(), Fraction::from_int(3));
        assert_eq!(g.frac(), Fraction::new(1, 3));
    }

    #[test]
    fn ordering() {
        assert!(Fraction::new(1, 2) < Fraction::new(2, 3));
        assert!(Fraction::new(-1, 2) < Fraction::ZERO);
        assert_eq!(Fraction::new(2, 4).cmp(&Fraction::new(1, 2)), Ordering::Equal);
    }

    #[test]
    fn rational_lcm() {
        assert_eq!(
            Fraction::from_int(2).lcm(Fraction::from_int(3)),
            Fraction::from_int(6)
        );
        assert_eq!(
            Fraction::new(1, 2).lcm(Fraction::new(1, 3)),
            Fraction::from_int(1)
        );
    }

    #[test]
    fn f64_round_trip_is_close() {
        let f = Fraction::from_f64(0.25);
        assert_eq!(f, Fraction::new(1, 4));
        assert!((Fraction::new(1, 3).to_f64() - 1.0 / 3.0).abs() < 1e-12);
    }
}
