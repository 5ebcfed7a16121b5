//! Type-safe money representation using decimal arithmetic.
//!
//! Amounts are carried at full precision through every calculation and only
//! rounded to cents at presentation or serialization boundaries.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Sub};
use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A monetary amount in the shop's currency.
///
/// Serializes as a decimal string (e.g. `"19.99"`) so no precision is lost
/// on the wire.
///
/// # Examples
///
/// ```
/// use refund_desk_core::Money;
///
/// let unit = Money::from_cents(2500);
/// assert_eq!(unit.times(2).to_string(), "50.00");
///
/// let third = Money::from_cents(1000).scale(rust_decimal::Decimal::ONE / rust_decimal::Decimal::from(3));
/// assert_eq!(third.round_cents().to_string(), "3.33");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero in any currency.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create money from a decimal amount in the currency's standard unit.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create money from an amount in minor units (e.g. cents).
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// The underlying full-precision amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns `true` if the amount is exactly zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns `true` if the amount is strictly greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Returns `true` if the amount is strictly less than zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Multiply by a whole quantity. Saturates at the decimal range.
    #[must_use]
    pub fn times(self, quantity: i64) -> Self {
        Self(self.0.saturating_mul(Decimal::from(quantity)))
    }

    /// Multiply by an arbitrary decimal factor (e.g. a proration fraction).
    #[must_use]
    pub fn scale(self, factor: Decimal) -> Self {
        Self(self.0.saturating_mul(factor))
    }

    /// Divide evenly by a whole count.
    ///
    /// Returns `None` when `count` is zero.
    #[must_use]
    pub fn split(self, count: i64) -> Option<Self> {
        self.0.checked_div(Decimal::from(count)).map(Self)
    }

    /// The fraction `self / whole`, or `None` when `whole` is zero.
    #[must_use]
    pub fn fraction_of(self, whole: Self) -> Option<Decimal> {
        self.0.checked_div(whole.0)
    }

    /// The larger of `self` and zero.
    #[must_use]
    pub fn clamp_non_negative(self) -> Self {
        if self.is_negative() { Self::ZERO } else { self }
    }

    /// Round to two decimal places, midpoint away from zero.
    #[must_use]
    pub fn round_cents(self) -> Self {
        let mut rounded = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(2);
        Self(rounded)
    }
}

impl fmt::Display for Money {
    /// Always renders exactly two decimal places.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.round_cents().0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Self)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Money {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Errors that can occur when parsing a [`CurrencyCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported currency code: {0}")]
pub struct CurrencyCodeError(pub String);

/// ISO 4217 currency codes supported by the shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    USD,
    EUR,
    GBP,
    CAD,
    #[default]
    AUD,
    NZD,
}

impl CurrencyCode {
    /// Currency symbol for display.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD | Self::NZD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// Three-letter ISO code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
            Self::NZD => "NZD",
        }
    }

    /// Format an amount for display (e.g., "$19.99").
    #[must_use]
    pub fn display(&self, amount: Money) -> String {
        format!("{}{amount}", self.symbol())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CurrencyCode {
    type Err = CurrencyCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            "NZD" => Ok(Self::NZD),
            _ => Err(CurrencyCodeError(s.to_owned())),
        }
    }
}
