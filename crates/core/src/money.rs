//! Exact-decimal monetary value object.
//!
//! All rule logic (offer pricing, LOA allocation, EMD caps) works on `Money`,
//! never on binary floating point, so totals stay drift-free across many line
//! items and amendments. Amounts are normalized to 2 decimal places, half-up.

use core::iter::Sum;
use core::ops::{Add, AddAssign, Sub};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::value_object::ValueObject;

/// Currency scale used throughout the workflow (paise/cents).
const SCALE: u32 = 2;

/// A monetary amount with exact decimal semantics.
///
/// Comparisons are exact equality/inequality on the underlying decimal.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Construct from a decimal amount, rounding to currency scale (half-up).
    pub fn new(amount: Decimal) -> Self {
        Self(amount.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Construct from whole currency units.
    pub fn from_major(units: i64) -> Self {
        Self(Decimal::from(units))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// `rate` percent of this amount (e.g. `percent(5)` is a 5% share).
    pub fn percent(&self, rate: Decimal) -> Money {
        Money::new(self.0 * rate / Decimal::ONE_HUNDRED)
    }

    /// Multiply by a dimensionless factor (quantity, tax multiplier).
    pub fn scale_by(&self, factor: Decimal) -> Money {
        Money::new(self.0 * factor)
    }
}

impl ValueObject for Money {}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
