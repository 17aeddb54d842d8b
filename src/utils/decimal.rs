//! Decimal arithmetic utilities for financial calculations.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Round a decimal to a specific number of decimal places.
pub fn round_to_precision(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp(decimals)
}

/// Safe division that returns zero if divisor is zero.
pub fn safe_div(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator == Decimal::ZERO {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}

/// Lossy conversion for statistics that are computed in floating point.
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_safe_div() {
        assert_eq!(safe_div(dec!(10), dec!(4)), dec!(2.5));
        assert_eq!(safe_div(dec!(10), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_round_to_precision() {
        assert_eq!(round_to_precision(dec!(1.23456), 2), dec!(1.23));
        assert_eq!(round_to_precision(dec!(100), 4), dec!(100));
    }

    #[test]
    fn test_to_f64() {
        assert!((to_f64(dec!(0.015)) - 0.015).abs() < 1e-12);
        assert_eq!(to_f64(Decimal::ZERO), 0.0);
    }
}
