use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------       Money       -----------------------------------------------------------
/// A monetary amount in integer cents. All storefront prices, totals and receipt figures are carried as `Money` so
/// that arithmetic is exact; display formatting is the only place a decimal point appears.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in cents: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MoneyConversionError(format!("Value {} is too large to convert to Money", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", cents / 100, cents % 100)
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn from_whole(units: i64) -> Self {
        Self(units * 100)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// The given fraction of this amount, expressed in basis points (1/100th of a percent), rounded half-up to the
    /// nearest cent. `Money::from_whole(100).percentage(800)` is $8.00.
    pub fn percentage(&self, basis_points: i64) -> Self {
        Self((self.0 * basis_points + 5_000) / 10_000)
    }
}

#[cfg(test)]
mod test {
    use super::Money;

    #[test]
    fn display_formatting() {
        assert_eq!(Money::from_cents(123_456).to_string(), "$1234.56");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-995).to_string(), "-$9.95");
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(Money::from_whole(100).percentage(800), Money::from_whole(8));
        // 8% of $0.99 = 7.92c, rounds to 8c
        assert_eq!(Money::from_cents(99).percentage(800), Money::from_cents(8));
        // 8% of $0.05 = 0.4c, rounds to 0c
        assert_eq!(Money::from_cents(5).percentage(800), Money::from_cents(0));
    }

    #[test]
    fn arithmetic() {
        let subtotal = Money::from_whole(250) + Money::from_cents(50);
        assert_eq!(subtotal, Money::from_cents(25_050));
        assert_eq!(subtotal - Money::from_cents(50), Money::from_whole(250));
        assert_eq!(Money::from_cents(199) * 3, Money::from_cents(597));
        let total: Money = [Money::from_cents(100), Money::from_cents(250)].into_iter().sum();
        assert_eq!(total, Money::from_cents(350));
    }
}
