use crate::value_objects::Currency;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Last traded and best bid price of a market pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerEntry {
    pub last: Decimal,
    pub highest_bid: Decimal,
}

/// Market ticker keyed by "QUOTE_BASE" pair names (e.g. "BTC_ETH")
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub pairs: HashMap<String, TickerEntry>,
}

impl Ticker {
    pub fn pair_name(quote: &Currency, base: &Currency) -> String {
        format!("{}_{}", quote, base)
    }

    pub fn get(&self, pair: &str) -> Option<&TickerEntry> {
        self.pairs.get(pair)
    }

    /// Value of one unit of `currency` expressed in `reference`.
    ///
    /// Returns one for the reference currency itself and `None` when the
    /// exchange does not list the pair.
    pub fn price_in(&self, currency: &Currency, reference: &Currency) -> Option<Decimal> {
        if currency == reference {
            return Some(Decimal::ONE);
        }
        self.get(&Self::pair_name(reference, currency))
            .map(|entry| entry.last)
            .filter(|last| !last.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_in_reference() {
        let mut ticker = Ticker::default();
        ticker.pairs.insert(
            "BTC_ETH".to_string(),
            TickerEntry {
                last: dec!(0.05),
                highest_bid: dec!(0.049),
            },
        );
        let btc = Currency::new("BTC").unwrap();
        let eth = Currency::new("ETH").unwrap();

        assert_eq!(ticker.price_in(&eth, &btc), Some(dec!(0.05)));
        assert_eq!(ticker.price_in(&btc, &btc), Some(Decimal::ONE));
        assert_eq!(ticker.price_in(&Currency::new("XMR").unwrap(), &btc), None);
    }
}
