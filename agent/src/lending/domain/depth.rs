//! Order-book depth discovery
//!
//! The finder walks one side of a loan book until the accumulated volume
//! covers the requested depth and quotes the level *after* the one that
//! satisfied it, so our offers never sit at the most aggressive competing
//! rate. When the walk runs off the end of a book that was truncated by the
//! fetch limit the answer is unknown and the caller must fetch more levels.

use lending_core::{BookLevel, Currency};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Levels fetched for a currency that has never needed more
pub const DEFAULT_REQUEST_DEPTH: usize = 5;
/// Upper bound on the levels requested per book
pub const MAX_REQUEST_DEPTH: usize = 1000;

/// Result of a depth walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepthOutcome<T> {
    Found(T),
    /// The fetched levels were not enough to answer
    NeedMoreDepth,
}

impl<T> DepthOutcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> DepthOutcome<U> {
        match self {
            DepthOutcome::Found(value) => DepthOutcome::Found(f(value)),
            DepthOutcome::NeedMoreDepth => DepthOutcome::NeedMoreDepth,
        }
    }
}

/// How many book levels to request per currency. Entries only grow.
#[derive(Debug, Clone, Default)]
pub struct RequestDepthTable {
    depths: HashMap<Currency, usize>,
}

impl RequestDepthTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, currency: &Currency) -> usize {
        self.depths
            .get(currency)
            .copied()
            .unwrap_or(DEFAULT_REQUEST_DEPTH)
    }

    /// Double the currency's depth (capped) and return the new value
    pub fn grow(&mut self, currency: &Currency) -> usize {
        let next = (self.get(currency) * 2).min(MAX_REQUEST_DEPTH);
        self.depths.insert(currency.clone(), next);
        next
    }
}

/// Unit of a depth target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthUnits {
    /// Target is an absolute volume
    Raw,
    /// Target is a percent of the total balance
    PercentOfBalance,
}

/// Finds the rate sitting at a given depth of one side of a loan book
#[derive(Debug, Clone, Copy)]
pub struct DepthRateFinder {
    /// Levels that were requested for this book
    request_depth: usize,
    max_rate: Decimal,
}

impl DepthRateFinder {
    pub fn new(request_depth: usize, max_rate: Decimal) -> Self {
        DepthRateFinder {
            request_depth,
            max_rate,
        }
    }

    pub fn find_rate(
        &self,
        target: Decimal,
        levels: &[BookLevel],
        total_balance: Decimal,
        units: DepthUnits,
    ) -> DepthOutcome<Decimal> {
        let expected = match units {
            DepthUnits::Raw => target,
            DepthUnits::PercentOfBalance => target * total_balance / Decimal::ONE_HUNDRED,
        };

        if levels.is_empty() {
            return DepthOutcome::Found(self.max_rate);
        }

        let mut accumulated = Decimal::ZERO;
        let mut i = 0;
        while accumulated < expected {
            if i + 1 >= levels.len() {
                if levels.len() >= self.request_depth {
                    return DepthOutcome::NeedMoreDepth;
                }
                return DepthOutcome::Found(self.max_rate);
            }
            accumulated += levels[i].amount;
            i += 1;
        }

        DepthOutcome::Found(levels[i].rate.min(self.max_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn levels(rates: &[Decimal], volume: Decimal) -> Vec<BookLevel> {
        rates
            .iter()
            .map(|r| BookLevel::new(*r, volume, 2))
            .collect()
    }

    fn five_levels() -> Vec<BookLevel> {
        levels(
            &[dec!(0.01), dec!(0.02), dec!(0.03), dec!(0.04), dec!(0.05)],
            dec!(10),
        )
    }

    #[test]
    fn test_relative_target_quotes_next_level() {
        let finder = DepthRateFinder::new(10, dec!(0.1));
        let outcome = finder.find_rate(
            dec!(15),
            &five_levels(),
            dec!(100),
            DepthUnits::PercentOfBalance,
        );
        assert_eq!(outcome, DepthOutcome::Found(dec!(0.03)));
    }

    #[test]
    fn test_zero_target_quotes_best_level() {
        let finder = DepthRateFinder::new(10, dec!(0.1));
        let outcome = finder.find_rate(dec!(0), &five_levels(), dec!(100), DepthUnits::Raw);
        assert_eq!(outcome, DepthOutcome::Found(dec!(0.01)));
    }

    #[test]
    fn test_exhausted_capped_book_needs_more_depth() {
        let finder = DepthRateFinder::new(5, dec!(0.1));
        let outcome = finder.find_rate(dec!(100), &five_levels(), dec!(100), DepthUnits::Raw);
        assert_eq!(outcome, DepthOutcome::NeedMoreDepth);
    }

    #[test]
    fn test_exhausted_short_book_returns_max_rate() {
        let finder = DepthRateFinder::new(10, dec!(0.1));
        let outcome = finder.find_rate(dec!(100), &five_levels(), dec!(100), DepthUnits::Raw);
        assert_eq!(outcome, DepthOutcome::Found(dec!(0.1)));

        let outcome = finder.find_rate(dec!(1), &[], dec!(100), DepthUnits::Raw);
        assert_eq!(outcome, DepthOutcome::Found(dec!(0.1)));
    }

    #[test]
    fn test_rate_capped_at_max() {
        let finder = DepthRateFinder::new(10, dec!(0.025));
        let outcome = finder.find_rate(dec!(25), &five_levels(), dec!(100), DepthUnits::Raw);
        assert_eq!(outcome, DepthOutcome::Found(dec!(0.025)));
    }

    #[test]
    fn test_deeper_target_never_lowers_rate() {
        let book = levels(
            &[
                dec!(0.0001),
                dec!(0.0002),
                dec!(0.0002),
                dec!(0.0004),
                dec!(0.0007),
                dec!(0.0009),
            ],
            dec!(3),
        );
        let finder = DepthRateFinder::new(100, dec!(0.0008));
        let mut previous = Decimal::ZERO;
        for target in 0..30 {
            let outcome = finder.find_rate(Decimal::from(target), &book, dec!(1), DepthUnits::Raw);
            let DepthOutcome::Found(rate) = outcome else {
                panic!("uncapped book never needs more depth");
            };
            assert!(rate >= previous, "target {target}: {rate} < {previous}");
            previous = rate;
        }
    }

    #[test]
    fn test_depth_table_only_grows() {
        let mut table = RequestDepthTable::new();
        let btc = Currency::new("BTC").unwrap();
        assert_eq!(table.get(&btc), DEFAULT_REQUEST_DEPTH);
        assert_eq!(table.grow(&btc), 10);
        assert_eq!(table.grow(&btc), 20);
        for _ in 0..20 {
            let before = table.get(&btc);
            assert!(table.grow(&btc) >= before);
        }
        assert_eq!(table.get(&btc), MAX_REQUEST_DEPTH);
    }
}
