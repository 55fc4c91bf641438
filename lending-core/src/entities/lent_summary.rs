use super::ActiveLoan;
use crate::value_objects::{Currency, format_rate_pct};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Amount currently lent per currency and the amount-weighted average rate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LentSummary {
    totals: BTreeMap<Currency, Decimal>,
    weighted_rates: BTreeMap<Currency, Decimal>,
}

impl LentSummary {
    pub fn from_loans<'a>(loans: impl IntoIterator<Item = &'a ActiveLoan>) -> Self {
        let mut summary = LentSummary::default();
        for loan in loans {
            *summary
                .totals
                .entry(loan.currency.clone())
                .or_insert(Decimal::ZERO) += loan.amount;
            *summary
                .weighted_rates
                .entry(loan.currency.clone())
                .or_insert(Decimal::ZERO) += loan.amount * loan.rate;
        }
        summary
    }

    /// Total amount lent in `currency` (zero if nothing is lent)
    pub fn total_lent(&self, currency: &Currency) -> Decimal {
        self.totals
            .get(currency)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Amount-weighted average daily rate for `currency`
    pub fn average_rate(&self, currency: &Currency) -> Option<Decimal> {
        let total = self.totals.get(currency)?;
        if total.is_zero() {
            return None;
        }
        self.weighted_rates.get(currency).map(|w| w / total)
    }

    pub fn currencies(&self) -> impl Iterator<Item = &Currency> {
        self.totals.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// Human readable "Lent: [1.0000 BTC @ 0.0200%] ..." status line
    pub fn describe(&self) -> String {
        let mut line = String::from("Lent:");
        for (currency, total) in &self.totals {
            let avg = self.average_rate(currency).unwrap_or(Decimal::ZERO);
            line.push_str(&format!(
                " [{:.4} {} @ {}]",
                total,
                currency,
                format_rate_pct(avg)
            ));
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn loan(id: u64, cur: &str, amount: Decimal, rate: Decimal) -> ActiveLoan {
        ActiveLoan {
            id,
            currency: Currency::new(cur).unwrap(),
            amount,
            rate,
            duration: 2,
        }
    }

    #[test]
    fn test_weighted_average() {
        let loans = vec![
            loan(1, "BTC", dec!(1), dec!(0.0001)),
            loan(2, "BTC", dec!(3), dec!(0.0005)),
            loan(3, "ETH", dec!(2), dec!(0.0002)),
        ];
        let summary = LentSummary::from_loans(&loans);
        let btc = Currency::new("BTC").unwrap();

        assert_eq!(summary.total_lent(&btc), dec!(4));
        assert_eq!(summary.average_rate(&btc), Some(dec!(0.0004)));
        assert_eq!(summary.total_lent(&Currency::new("XMR").unwrap()), Decimal::ZERO);
        assert_eq!(
            summary.describe(),
            "Lent: [4.0000 BTC @ 0.0400%] [2.0000 ETH @ 0.0200%]"
        );
    }
}
