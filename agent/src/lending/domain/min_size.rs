use lending_core::Currency;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

const MIN_SIZE_MARKERS: [&str; 2] = ["Amount must be at least ", "minimum is "];

/// Learns per-currency minimum offer sizes from exchange rejections
#[derive(Debug, Clone, Default)]
pub struct MinSizeLearner {
    learned: HashMap<Currency, Decimal>,
}

impl MinSizeLearner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_min_size_rejection(message: &str) -> bool {
        MIN_SIZE_MARKERS.iter().any(|m| message.contains(m))
    }

    pub fn learned(&self, currency: &Currency) -> Option<Decimal> {
        self.learned.get(currency).copied()
    }

    /// Minimum size to respect for `currency`: the larger of the configured
    /// and the learned value
    pub fn effective(&self, currency: &Currency, configured: Decimal) -> Decimal {
        self.learned(currency)
            .map_or(configured, |learned| learned.max(configured))
    }

    /// Record the minimum quoted by a rejection. Returns the learned minimum,
    /// or `None` when the message carries no usable amount.
    pub fn on_rejection(&mut self, currency: &Currency, message: &str) -> Option<Decimal> {
        let quoted = parse_minimum(message)?;
        let entry = self.learned.entry(currency.clone()).or_insert(quoted);
        if quoted > *entry {
            *entry = quoted;
        }
        Some(*entry)
    }
}

fn parse_minimum(message: &str) -> Option<Decimal> {
    let (_, rest) = MIN_SIZE_MARKERS
        .iter()
        .find_map(|marker| message.split_once(marker))?;
    let literal: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    Decimal::from_str(literal.trim_end_matches('.')).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn btc() -> Currency {
        Currency::new("BTC").unwrap()
    }

    #[test]
    fn test_parses_both_message_styles() {
        let mut learner = MinSizeLearner::new();
        assert_eq!(
            learner.on_rejection(&btc(), "Amount must be at least 0.01 BTC."),
            Some(dec!(0.01))
        );
        let eth = Currency::new("ETH").unwrap();
        assert_eq!(
            learner.on_rejection(&eth, "Offer too small, minimum is 0.5."),
            Some(dec!(0.5))
        );
    }

    #[test]
    fn test_unparseable_message() {
        let mut learner = MinSizeLearner::new();
        assert!(MinSizeLearner::is_min_size_rejection("Amount must be at least a lot"));
        assert_eq!(learner.on_rejection(&btc(), "Amount must be at least a lot"), None);
        assert_eq!(learner.learned(&btc()), None);
    }

    #[test]
    fn test_learned_size_never_decreases() {
        let mut learner = MinSizeLearner::new();
        let quotes = ["0.02", "0.05", "0.01", "0.05", "0.03", "0.2"];
        let mut previous = Decimal::ZERO;
        for quote in quotes {
            let learned = learner
                .on_rejection(&btc(), &format!("Amount must be at least {quote} BTC"))
                .unwrap();
            assert!(learned >= previous);
            previous = learned;
        }
        assert_eq!(learner.learned(&btc()), Some(dec!(0.2)));
    }

    #[test]
    fn test_effective_takes_larger_value() {
        let mut learner = MinSizeLearner::new();
        assert_eq!(learner.effective(&btc(), dec!(0.01)), dec!(0.01));
        learner.on_rejection(&btc(), "Amount must be at least 0.05");
        assert_eq!(learner.effective(&btc(), dec!(0.01)), dec!(0.05));
        assert_eq!(learner.effective(&btc(), dec!(0.1)), dec!(0.1));
    }
}
