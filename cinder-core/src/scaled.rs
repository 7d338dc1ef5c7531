//! Exact fixed-point monetary values
//!
//! Prices travel as decimal strings holding an integer scaled by 10^9, and
//! amounts as decimal strings holding base units. Both are kept as
//! arbitrary-precision integers; the `f64` "human" form is derived for
//! display and USD conversion only and never flows back into integer math.

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{ToPrimitive, Zero};
use rust_decimal::prelude::ToPrimitive as _;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use crate::CinderError;

/// Scale factor between a scaled price and its human value
pub const PRICE_SCALE: u64 = 1_000_000_000;

/// Decimal places used when converting to USD
const USD_DECIMAL_PLACES: u32 = 12;

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

// ============================================================================
// ScaledPrice
// ============================================================================

/// A price as an integer multiplied by 10^9
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScaledPrice(BigInt);

impl ScaledPrice {
    /// Wrap an already-scaled integer
    pub fn from_raw(raw: impl Into<BigInt>) -> Self {
        Self(raw.into())
    }

    /// The scaled integer
    pub fn as_raw(&self) -> &BigInt {
        &self.0
    }

    /// True when the scaled integer is strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0.sign() == Sign::Plus
    }

    /// Convert to the human-readable price
    ///
    /// The integer and fractional parts are split exactly before a single
    /// decimal-string to `f64` parse.
    pub fn to_human(&self) -> f64 {
        let scale = BigUint::from(PRICE_SCALE);
        let magnitude = self.0.magnitude();
        let whole = magnitude / &scale;
        let frac = (magnitude % &scale).to_u64().unwrap_or(0);
        let sign = if self.0.sign() == Sign::Minus { "-" } else { "" };

        format!("{sign}{whole}.{frac:09}").parse().unwrap_or(0.0)
    }
}

impl FromStr for ScaledPrice {
    type Err = CinderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix('-').unwrap_or(s);
        if !is_digits(digits) {
            return Err(CinderError::parse(format!("Invalid scaled price: {:?}", s)));
        }

        BigInt::parse_bytes(s.as_bytes(), 10)
            .map(Self)
            .ok_or_else(|| CinderError::parse(format!("Invalid scaled price: {:?}", s)))
    }
}

impl fmt::Display for ScaledPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ScaledPrice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ScaledPrice {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

// ============================================================================
// Amount
// ============================================================================

/// A non-negative quantity of base or token units
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(BigUint);

impl Amount {
    /// Zero units
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    /// Parse an optional decimal string, falling back to zero
    ///
    /// Upstream rows routinely carry missing or malformed quantities; they
    /// count as nothing rather than failing the whole row.
    pub fn parse_lenient(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or_default()
    }

    /// The underlying integer
    pub fn as_raw(&self) -> &BigUint {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Display-only conversion, may lose precision
    pub fn to_f64_lossy(&self) -> f64 {
        self.0.to_f64().unwrap_or(f64::INFINITY)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<BigUint> for Amount {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl FromStr for Amount {
    type Err = CinderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_digits(s) {
            return Err(CinderError::parse(format!("Invalid amount: {:?}", s)));
        }

        BigUint::parse_bytes(s.as_bytes(), 10)
            .map(Self)
            .ok_or_else(|| CinderError::parse(format!("Invalid amount: {:?}", s)))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a Amount> for Amount {
    type Output = Amount;

    fn add(self, rhs: &'a Amount) -> Amount {
        Amount(self.0 + &rhs.0)
    }
}

impl<'a> AddAssign<&'a Amount> for Amount {
    fn add_assign(&mut self, rhs: &'a Amount) {
        self.0 += &rhs.0;
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.fold(Amount::zero(), |acc, a| acc + a)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

// ============================================================================
// Display-side helpers
// ============================================================================

/// Round a display value to `dp` decimal places (ties to even)
///
/// Rounds the exact binary value, so `2.675` (stored just below) becomes
/// `2.67`.
pub fn round_dp(value: f64, dp: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }

    match Decimal::from_f64_retain(value) {
        Some(d) => d
            .round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven)
            .to_f64()
            .unwrap_or(value),
        // Too small for Decimal: rounds to zero
        None if value.abs() < 1.0 => 0.0_f64.copysign(value),
        // Too large for Decimal: already integral
        None => value,
    }
}

/// Convert a display amount to USD, `None` when no rate is known
pub fn to_usd(amount: f64, usd_rate: Option<f64>) -> Option<f64> {
    usd_rate.map(|rate| round_dp(amount * rate, USD_DECIMAL_PLACES))
}
