//! Amount and rate helpers
//!
//! Lending exchanges accept amounts with at most 8 decimal places (one
//! satoshi for BTC). Amounts are truncated, never rounded up, so an offer can
//! never exceed the balance it was computed from.

use rust_decimal::{Decimal, RoundingStrategy};

/// Smallest tradable unit: 8 decimal places
pub const AMOUNT_DECIMALS: u32 = 8;

/// Truncate an amount to the smallest tradable unit
#[inline]
pub fn truncate_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(AMOUNT_DECIMALS, RoundingStrategy::ToZero)
}

/// Format an amount with its currency, e.g. "1.50000000 BTC"
pub fn format_amount(amount: Decimal, currency: impl std::fmt::Display) -> String {
    format!(
        "{:.prec$} {}",
        truncate_amount(amount),
        currency,
        prec = AMOUNT_DECIMALS as usize
    )
}

/// Format a daily rate fraction as a percentage, e.g. 0.00015 -> "0.0150%"
pub fn format_rate_pct(rate: Decimal) -> String {
    format!("{:.4}%", rate * Decimal::ONE_HUNDRED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_truncate_never_rounds_up() {
        assert_eq!(truncate_amount(dec!(1.123456789)), dec!(1.12345678));
        assert_eq!(truncate_amount(dec!(0.999999999)), dec!(0.99999999));
        assert_eq!(truncate_amount(dec!(5)), dec!(5));
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_amount(dec!(1.5), "BTC"), "1.50000000 BTC");
        assert_eq!(format_rate_pct(dec!(0.00015)), "0.0150%");
    }
}
