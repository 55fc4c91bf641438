use super::BookLevel;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Snapshot of a currency's loan order book
///
/// Both sides are ordered from the best level outwards: `offers` (the supply
/// competing with our own offers) by ascending rate, `demands` (borrowers'
/// bids) by descending rate. A snapshot holds at most the number of levels
/// that were requested from the exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanBook {
    pub offers: Vec<BookLevel>,
    pub demands: Vec<BookLevel>,
}

impl LoanBook {
    pub fn new(offers: Vec<BookLevel>, demands: Vec<BookLevel>) -> Self {
        LoanBook { offers, demands }
    }

    /// Lowest competing offer
    pub fn best_offer(&self) -> Option<&BookLevel> {
        self.offers.first()
    }

    /// Best borrower demand
    pub fn best_demand(&self) -> Option<&BookLevel> {
        self.demands.first()
    }

    /// Rate of the lowest competing offer, zero when there is no supply
    pub fn lowest_offer_rate(&self) -> Decimal {
        self.best_offer().map(|l| l.rate).unwrap_or(Decimal::ZERO)
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty() && self.demands.is_empty()
    }

    /// Total supply volume across the fetched levels
    pub fn offer_volume(&self) -> Decimal {
        self.offers.iter().map(|l| l.amount).sum()
    }

    /// Drop empty levels and restore best-first order on both sides
    pub fn normalized(mut self) -> Self {
        self.offers.retain(|l| !l.is_empty());
        self.offers.sort_by(|a, b| a.rate.cmp(&b.rate));
        self.demands.retain(|l| !l.is_empty());
        self.demands.sort_by(|a, b| b.rate.cmp(&a.rate));
        self
    }

    /// Keep at most `limit` levels per side
    pub fn truncated(mut self, limit: usize) -> Self {
        self.offers.truncate(limit);
        self.demands.truncate(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_best_levels() {
        let book = LoanBook::new(
            vec![
                BookLevel::new(dec!(0.0002), dec!(5), 2),
                BookLevel::new(dec!(0.0003), dec!(7), 30),
            ],
            vec![BookLevel::new(dec!(0.0001), dec!(3), 2)],
        );
        assert_eq!(book.lowest_offer_rate(), dec!(0.0002));
        assert_eq!(book.best_demand().unwrap().amount, dec!(3));
        assert_eq!(book.offer_volume(), dec!(12));
    }

    #[test]
    fn test_empty_book() {
        let book = LoanBook::default();
        assert!(book.is_empty());
        assert_eq!(book.lowest_offer_rate(), Decimal::ZERO);
    }

    #[test]
    fn test_normalized_sorts_and_drops_empty() {
        let book = LoanBook::new(
            vec![
                BookLevel::new(dec!(0.0003), dec!(1), 2),
                BookLevel::new(dec!(0.0002), dec!(0), 2),
                BookLevel::new(dec!(0.0001), dec!(1), 2),
            ],
            vec![
                BookLevel::new(dec!(0.0001), dec!(2), 2),
                BookLevel::new(dec!(0.0004), dec!(2), 30),
            ],
        )
        .normalized();
        let rates: Vec<_> = book.offers.iter().map(|l| l.rate).collect();
        assert_eq!(rates, vec![dec!(0.0001), dec!(0.0003)]);
        assert_eq!(book.best_demand().unwrap().rate, dec!(0.0004));
    }
}
