use super::depth::{DepthOutcome, DepthRateFinder, DepthUnits};
use super::policy::{CoinPolicy, GapMode, LendingStrategy};
use lending_core::{BookLevel, truncate_amount};
use rust_decimal::Decimal;
use tracing::warn;

/// One offer the session should place
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderIntent {
    pub amount: Decimal,
    /// `None` for an unpriced order, which takes the decided floor rate
    pub rate: Option<Decimal>,
}

/// Splits a lendable balance into offers across the book
#[derive(Debug, Clone, Copy)]
pub struct OrderBuilder<'a> {
    policy: &'a CoinPolicy,
    min_order_size: Decimal,
    request_depth: usize,
}

impl<'a> OrderBuilder<'a> {
    /// `min_order_size` is the effective size, including anything learned
    /// from exchange rejections.
    pub fn new(policy: &'a CoinPolicy, min_order_size: Decimal, request_depth: usize) -> Self {
        OrderBuilder {
            policy,
            min_order_size,
            request_depth,
        }
    }

    /// Number of price levels to spread `active_balance` over
    pub fn spread_count(&self, active_balance: Decimal) -> u32 {
        if self.policy.strategy == LendingStrategy::FlashRate {
            return 1;
        }
        let mut spread = self.policy.spread.max(1);
        while spread > 1 && Decimal::from(spread) * self.min_order_size > active_balance {
            spread -= 1;
        }
        spread
    }

    /// `reference_price` is the value of one unit of the currency in the
    /// reference currency and is only read in [`GapMode::RawReference`].
    pub fn build(
        &self,
        active_balance: Decimal,
        total_balance: Decimal,
        offers: &[BookLevel],
        reference_price: Option<Decimal>,
    ) -> DepthOutcome<Vec<OrderIntent>> {
        let spread = self.spread_count(active_balance);
        if spread == 1 {
            return DepthOutcome::Found(vec![OrderIntent {
                amount: active_balance,
                rate: None,
            }]);
        }

        let finder = DepthRateFinder::new(self.request_depth, self.policy.max_daily_rate);
        let (bottom_target, top_target, units) = self.gap_targets(reference_price);

        let bottom = match finder.find_rate(bottom_target, offers, total_balance, units) {
            DepthOutcome::Found(rate) => rate,
            DepthOutcome::NeedMoreDepth => return DepthOutcome::NeedMoreDepth,
        };
        let top = match finder.find_rate(top_target, offers, total_balance, units) {
            DepthOutcome::Found(rate) => rate,
            DepthOutcome::NeedMoreDepth => return DepthOutcome::NeedMoreDepth,
        };

        let step = (top - bottom) / Decimal::from(spread - 1);
        let mut rates: Vec<Decimal> = (0..spread)
            .map(|i| (bottom + step * Decimal::from(i)).min(self.policy.max_daily_rate))
            .collect();
        rates.sort();
        rates.dedup();

        let amounts = split_amount(active_balance, rates.len());
        DepthOutcome::Found(
            rates
                .into_iter()
                .zip(amounts)
                .map(|(rate, amount)| OrderIntent {
                    amount,
                    rate: Some(rate),
                })
                .collect(),
        )
    }

    fn gap_targets(&self, reference_price: Option<Decimal>) -> (Decimal, Decimal, DepthUnits) {
        let bottom = self.policy.gap_bottom;
        let top = self.policy.gap_top;
        match self.policy.gap_mode {
            GapMode::Raw => (bottom, top, DepthUnits::Raw),
            GapMode::Relative => (bottom, top, DepthUnits::PercentOfBalance),
            GapMode::RawReference => match reference_price.filter(|p| !p.is_zero()) {
                Some(price) => (bottom / price, top / price, DepthUnits::Raw),
                None => {
                    warn!("No reference price available, using raw gap targets");
                    (bottom, top, DepthUnits::Raw)
                }
            },
        }
    }
}

/// Split `total` into `parts` shares truncated to the tradable precision,
/// handing the remainder to the first share so the shares add up to `total`.
pub fn split_amount(total: Decimal, parts: usize) -> Vec<Decimal> {
    if parts == 0 {
        return Vec::new();
    }
    let share = truncate_amount(total / Decimal::from(parts));
    let mut amounts = vec![share; parts];
    amounts[0] += total - share * Decimal::from(parts);
    amounts
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn book() -> Vec<BookLevel> {
        [dec!(0.0001), dec!(0.0002), dec!(0.0003), dec!(0.0004), dec!(0.0005)]
            .iter()
            .map(|r| BookLevel::new(*r, dec!(10), 2))
            .collect()
    }

    fn spread_policy(spread: u32) -> CoinPolicy {
        CoinPolicy {
            spread,
            gap_mode: GapMode::Raw,
            gap_bottom: dec!(5),
            gap_top: dec!(25),
            max_daily_rate: dec!(0.05),
            ..CoinPolicy::default()
        }
    }

    #[test]
    fn test_spread_reduced_to_fit_min_size() {
        let policy = spread_policy(5);
        let builder = OrderBuilder::new(&policy, dec!(0.1), 10);
        assert_eq!(builder.spread_count(dec!(1)), 5);
        assert_eq!(builder.spread_count(dec!(0.35)), 3);
        assert_eq!(builder.spread_count(dec!(0.05)), 1);
    }

    #[test]
    fn test_flash_rate_strategy_is_single_order() {
        let policy = CoinPolicy {
            strategy: LendingStrategy::FlashRate,
            ..spread_policy(10)
        };
        let builder = OrderBuilder::new(&policy, dec!(0.01), 10);
        let DepthOutcome::Found(orders) = builder.build(dec!(5), dec!(5), &book(), None) else {
            panic!("single order needs no depth");
        };
        assert_eq!(
            orders,
            vec![OrderIntent {
                amount: dec!(5),
                rate: None
            }]
        );
    }

    #[test]
    fn test_spread_orders_between_gap_rates() {
        let policy = spread_policy(3);
        let builder = OrderBuilder::new(&policy, dec!(0.01), 10);
        let DepthOutcome::Found(orders) = builder.build(dec!(3), dec!(3), &book(), None) else {
            panic!("book deep enough");
        };
        let rates: Vec<_> = orders.iter().filter_map(|o| o.rate).collect();
        // bottom 5 -> level 2, top 25 -> level 4
        assert_eq!(rates, vec![dec!(0.0002), dec!(0.0003), dec!(0.0004)]);
        assert!(orders.iter().all(|o| o.amount == dec!(1)));
    }

    #[test]
    fn test_duplicate_rates_collapse() {
        let policy = CoinPolicy {
            gap_top: dec!(5),
            ..spread_policy(4)
        };
        let builder = OrderBuilder::new(&policy, dec!(0.01), 10);
        let DepthOutcome::Found(orders) = builder.build(dec!(1), dec!(1), &book(), None) else {
            panic!("book deep enough");
        };
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].amount, dec!(1));
    }

    #[test]
    fn test_reference_gap_mode_converts_targets() {
        let policy = CoinPolicy {
            gap_mode: GapMode::RawReference,
            gap_bottom: dec!(0.5),
            gap_top: dec!(2.5),
            ..spread_policy(3)
        };
        let builder = OrderBuilder::new(&policy, dec!(0.01), 10);
        let DepthOutcome::Found(orders) =
            builder.build(dec!(3), dec!(3), &book(), Some(dec!(0.1)))
        else {
            panic!("book deep enough");
        };
        let rates: Vec<_> = orders.iter().filter_map(|o| o.rate).collect();
        assert_eq!(rates, vec![dec!(0.0002), dec!(0.0003), dec!(0.0004)]);
    }

    #[test]
    fn test_shallow_capped_book_needs_more_depth() {
        let policy = CoinPolicy {
            gap_top: dec!(500),
            ..spread_policy(3)
        };
        let builder = OrderBuilder::new(&policy, dec!(0.01), 5);
        assert_eq!(
            builder.build(dec!(3), dec!(3), &book(), None),
            DepthOutcome::NeedMoreDepth
        );
    }

    #[test]
    fn test_split_sums_to_balance_for_every_spread() {
        for balance in [dec!(1), dec!(0.12345678), dec!(7.00000001), dec!(123.45678901)] {
            for parts in 1..=20 {
                let amounts = split_amount(balance, parts);
                assert_eq!(amounts.len(), parts);
                assert_eq!(amounts.iter().copied().sum::<Decimal>(), balance);
                assert!(amounts[0] >= amounts[parts - 1]);
            }
        }
    }
}
