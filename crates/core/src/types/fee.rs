//! Event fee in Indian rupees using decimal arithmetic.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A registration fee in rupees.
///
/// Serialized as a plain JSON number so catalog files and persisted cart
/// items stay readable (`"fee": 150`).
///
/// ```
/// use varnothsava_core::Fee;
///
/// let total: Fee = [Fee::rupees(150), Fee::rupees(99)].into_iter().sum();
/// assert_eq!(total.to_string(), "₹249.00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fee(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Fee {
    /// A zero fee (free events, empty carts).
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a fee from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a fee from a whole number of rupees.
    #[must_use]
    pub fn rupees(amount: u32) -> Self {
        Self(Decimal::from(amount))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the fee is zero.
    #[must_use]
    pub const fn is_free(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Fee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₹{:.2}", self.0.round_dp(2))
    }
}

impl Add for Fee {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Fee {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Fee {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}
