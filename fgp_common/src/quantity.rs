use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;

use crate::{
    fixed::{format_hundredths, parse_hundredths, SCALE},
    op,
    FixedPointError,
};

//--------------------------------------      Quantity      ----------------------------------------------------------

/// A stock quantity in hundredths of a product's unit (so `450` is 4.5 kg of carrots).
///
/// Same representation rules as [`crate::Money`]: integer storage, integer arithmetic, serialized
/// as the raw hundredths count.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Quantity(i64);

op!(binary Quantity, Add, add);
op!(binary Quantity, Sub, sub);
op!(inplace Quantity, AddAssign, add_assign);
op!(inplace Quantity, SubAssign, sub_assign);
op!(unary Quantity, Neg, neg);

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl From<i64> for Quantity {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Quantity {}

impl FromStr for Quantity {
    type Err = FixedPointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hundredths(s).map(Self)
    }
}

impl Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_hundredths(self.0))
    }
}

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_whole_units(units: i64) -> Self {
        Self(units * SCALE)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_and_displays() {
        let q = "5.0".parse::<Quantity>().unwrap();
        assert_eq!(q, Quantity::from_whole_units(5));
        assert_eq!(q.to_string(), "5.00");
        assert_eq!("0.25".parse::<Quantity>().unwrap().value(), 25);
    }

    #[test]
    fn ordering_matches_amounts() {
        let a = "4.0".parse::<Quantity>().unwrap();
        let b = "3.0".parse::<Quantity>().unwrap();
        assert!(a > b);
        assert_eq!(a - b, Quantity::from_whole_units(1));
    }
}
