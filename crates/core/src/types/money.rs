//! Conversion between POS minor currency units and local decimal prices.
//!
//! The POS reports every amount as an integer count of the smallest currency
//! unit (cents). Locally, prices are `Decimal` values in major units with two
//! decimal places.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Number of minor units per major unit, as a decimal scale.
const MINOR_UNIT_SCALE: u32 = 2;

/// Convert a POS amount in minor units into a local price.
///
/// ```rust
/// # use corner_shop_core::minor_to_major;
/// # use rust_decimal::Decimal;
/// assert_eq!(minor_to_major(500), Decimal::new(500, 2));
/// ```
#[must_use]
pub fn minor_to_major(minor: i64) -> Decimal {
    Decimal::new(minor, MINOR_UNIT_SCALE)
}

/// Convert a local price into POS minor units.
///
/// Fractions of a minor unit are rounded half away from zero. Returns `None`
/// if the amount does not fit in an `i64`.
#[must_use]
pub fn major_to_minor(major: Decimal) -> Option<i64> {
    let scaled = major.checked_mul(Decimal::ONE_HUNDRED)?;
    scaled
        .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_to_major() {
        assert_eq!(minor_to_major(500).to_string(), "5.00");
        assert_eq!(minor_to_major(1999).to_string(), "19.99");
        assert_eq!(minor_to_major(0), Decimal::ZERO);
    }

    #[test]
    fn test_major_to_minor() {
        assert_eq!(major_to_minor(Decimal::new(700, 2)), Some(700));
        assert_eq!(major_to_minor(Decimal::new(12, 0)), Some(1200));
    }

    #[test]
    fn test_major_to_minor_rounds_sub_cent_amounts() {
        assert_eq!(major_to_minor(Decimal::new(10_005, 3)), Some(1001));
        assert_eq!(major_to_minor(Decimal::new(10_004, 3)), Some(1000));
    }
}
