use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;

use crate::{
    fixed::{format_hundredths, parse_hundredths, SCALE},
    op,
    FixedPointError,
    Quantity,
};

pub const SOM_CURRENCY_CODE: &str = "UZS";
pub const SOM_CURRENCY_CODE_LOWER: &str = "uzs";

//--------------------------------------       Money        ----------------------------------------------------------

/// A monetary amount in tiyin (hundredths of a som), stored as a signed 64-bit integer.
///
/// All arithmetic is integer arithmetic. The value serializes as the raw tiyin count, so wire
/// payloads and database columns never carry a float.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
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

impl FromStr for Money {
    type Err = FixedPointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hundredths(s).map(Self)
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {SOM_CURRENCY_CODE}", format_hundredths(self.0))
    }
}

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_tiyin(tiyin: i64) -> Self {
        Self(tiyin)
    }

    pub fn from_som(som: i64) -> Self {
        Self(som * SCALE)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// The price of `qty` units at this unit price, rounded half away from zero to whole tiyin.
    ///
    /// The intermediate product is taken in `i128`, so any representable price/quantity pair is
    /// exact up to the final rounding step.
    pub fn line_total(&self, qty: Quantity) -> Money {
        let numer = i128::from(self.0) * i128::from(qty.value());
        let denom = i128::from(SCALE);
        let half = denom / 2;
        let rounded = if numer >= 0 { (numer + half) / denom } else { (numer - half) / denom };
        Money(rounded as i64)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn displays_as_som() {
        assert_eq!(Money::from_som(12).to_string(), "12.00 UZS");
        assert_eq!(Money::from_tiyin(1_234_567).to_string(), "12345.67 UZS");
    }

    #[test]
    fn parses_decimal_strings() {
        assert_eq!("2500.00".parse::<Money>().unwrap(), Money::from_som(2500));
        assert_eq!("0.05".parse::<Money>().unwrap(), Money::from_tiyin(5));
        assert!("12.345".parse::<Money>().is_err());
    }

    #[test]
    fn line_totals_are_exact_integer_math() {
        let price = "2500.00".parse::<Money>().unwrap();
        let qty = "4.50".parse::<Quantity>().unwrap();
        assert_eq!(price.line_total(qty), Money::from_som(11_250));

        // half a tiyin rounds away from zero
        let tiny = Money::from_tiyin(1).line_total("0.50".parse::<Quantity>().unwrap());
        assert_eq!(tiny, Money::from_tiyin(1));
    }

    #[test]
    fn sums_lines() {
        let total: Money = [Money::from_som(10), Money::from_som(5), Money::from_tiyin(25)].into_iter().sum();
        assert_eq!(total, Money::from_tiyin(1525));
    }
}
