//! Fixed-point decimal arithmetic for every monetary value in the engine.
//!
//! Wraps `rust_decimal::Decimal` (a base-10 scaled `i128`) so that PnL,
//! prices, sizes and fees never drift the way `f64` does. Division and the
//! few operations that can overflow return `Result`, never a silent zero and
//! never a panic — callers are expected to handle `MathError` explicitly.

use crate::error::MathError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal as Inner;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

/// Fixed-point decimal value used for all money and price math in the engine.
///
/// # Example
/// ```
/// use trading_engine_core::money::Decimal;
/// let price = Decimal::from_string("100.50").unwrap();
/// let qty = Decimal::from_int(2);
/// let total = price * qty;
/// assert_eq!(total.to_float(), 201.0);
/// ```
#[derive(Debug, Clone, Copy, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::str")] Inner);

impl Decimal {
    pub const ZERO: Decimal = Decimal(Inner::ZERO);
    pub const ONE: Decimal = Decimal(Inner::ONE);

    pub fn from_int(value: i64) -> Self {
        Decimal(Inner::from(value))
    }

    /// Explicitly lossy construction from a binary float. Never used
    /// implicitly (no `From<f64>` impl) — callers must opt in.
    pub fn from_float(value: f64) -> Self {
        Inner::try_from(value)
            .map(Decimal)
            .unwrap_or_else(|_| Decimal(Inner::from_f64_retain(value).unwrap_or(Inner::ZERO)))
    }

    pub fn from_string(s: &str) -> Result<Self, MathError> {
        Inner::from_str(s).map(Decimal).map_err(|_| MathError::ParseError)
    }

    /// Lossy conversion back to `f64`, for ratios, reporting and indicator math.
    pub fn to_float(self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self, MathError> {
        self.0.checked_add(rhs.0).map(Decimal).ok_or(MathError::Overflow)
    }

    pub fn checked_sub(self, rhs: Self) -> Result<Self, MathError> {
        self.0.checked_sub(rhs.0).map(Decimal).ok_or(MathError::Overflow)
    }

    pub fn checked_mul(self, rhs: Self) -> Result<Self, MathError> {
        self.0.checked_mul(rhs.0).map(Decimal).ok_or(MathError::Overflow)
    }

    /// Division is never an operator overload: zero divisors and overflow
    /// are always signalled, per the engine's error-handling contract.
    pub fn checked_div(self, rhs: Self) -> Result<Self, MathError> {
        if rhs.0.is_zero() {
            return Err(MathError::DivisionByZero);
        }
        self.0.checked_div(rhs.0).map(Decimal).ok_or(MathError::Overflow)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn abs(self) -> Self {
        Decimal(self.0.abs())
    }

    pub fn max(self, other: Self) -> Self {
        Decimal(self.0.max(other.0))
    }

    pub fn min(self, other: Self) -> Self {
        Decimal(self.0.min(other.0))
    }

    pub fn round_dp(self, dp: u32) -> Self {
        Decimal(self.0.round_dp(dp))
    }
}

impl Default for Decimal {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl std::hash::Hash for Decimal {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

// add/sub/mul panic on overflow like the underlying `rust_decimal` operators
// do; at the magnitudes this engine deals with (prices, sizes, PnL) that
// never fires in practice. Division is intentionally not an operator — see
// `checked_div`.
impl Add for Decimal {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Decimal(self.0 + rhs.0)
    }
}

impl AddAssign for Decimal {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Decimal {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Decimal(self.0 - rhs.0)
    }
}

impl SubAssign for Decimal {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Mul for Decimal {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        Decimal(self.0 * rhs.0)
    }
}

impl Neg for Decimal {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Decimal(-self.0)
    }
}

impl std::iter::Sum for Decimal {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Decimal::ZERO, |acc, x| acc + x)
    }
}

impl<'a> std::iter::Sum<&'a Decimal> for Decimal {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Decimal::ZERO, |acc, x| acc + *x)
    }
}
