use super::policy::{BiasRange, CoinPolicy, LendingStrategy};
use lending_core::Currency;
use rust_decimal::Decimal;
use std::collections::HashSet;
use tracing::{info, warn};

/// Number of equal steps the bias range is divided into
pub const BIAS_STEPS: u32 = 5;

/// The rate chosen for a currency this tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateDecision {
    /// Floor the currency's offers must not go below
    pub rate: Decimal,
    /// Configured minimum daily rate
    pub floor: Decimal,
    /// The flash-rate path was taken
    pub flash_path: bool,
    /// The flash-derived candidate beat the configured floor
    pub flash_used: bool,
    /// Flash rate after applying the bias
    pub flash_rate: Option<Decimal>,
    /// Flash rate as published by the exchange
    pub flash_base: Option<Decimal>,
    pub bias_pct: Option<Decimal>,
    /// 1-based step within the bias range
    pub bias_step: Option<u32>,
}

impl RateDecision {
    fn fixed(floor: Decimal) -> Self {
        RateDecision {
            rate: floor,
            floor,
            flash_path: false,
            flash_used: false,
            flash_rate: None,
            flash_base: None,
            bias_pct: None,
            bias_step: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateOutcome {
    Decided(RateDecision),
    /// Currency has lending disabled
    Disabled,
}

/// Cycles through the bias steps, one step per decided currency
#[derive(Debug, Clone, Copy, Default)]
pub struct BiasCycle {
    counter: u32,
}

impl BiasCycle {
    /// Zero-based step, 0..=BIAS_STEPS
    pub fn step(&self) -> u32 {
        self.counter % (BIAS_STEPS + 1)
    }

    pub fn advance(&mut self) {
        self.counter = (self.counter + 1) % (BIAS_STEPS + 1);
    }

    pub fn bias_for(&self, range: BiasRange) -> Decimal {
        let range = range.normalized();
        let step_size = (range.max - range.min) / Decimal::from(BIAS_STEPS);
        range.min + step_size * Decimal::from(self.step())
    }
}

/// Decides the minimum acceptable daily rate of each currency
#[derive(Debug, Default)]
pub struct RateDecider {
    bias: BiasCycle,
    disabled_logged: HashSet<Currency>,
    fallback_logged: HashSet<Currency>,
}

impl RateDecider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether deciding this currency needs the exchange's flash rate
    pub fn wants_flash_rate(&self, policy: &CoinPolicy, exchange_supports_flash: bool) -> bool {
        !policy.is_disabled() && policy.strategy == LendingStrategy::FlashRate && exchange_supports_flash
    }

    /// `flash_base` must be the exchange's flash rate whenever
    /// [`wants_flash_rate`](Self::wants_flash_rate) returned true.
    pub fn decide(
        &mut self,
        currency: &Currency,
        policy: &CoinPolicy,
        flash_base: Option<Decimal>,
        bias_override: Option<BiasRange>,
    ) -> RateOutcome {
        if policy.is_disabled() {
            if self.disabled_logged.insert(currency.clone()) {
                info!(currency = %currency, "Lending disabled (max active amount is 0)");
            }
            return RateOutcome::Disabled;
        }

        let decision = match (policy.strategy, flash_base) {
            (LendingStrategy::Spread, _) => RateDecision::fixed(policy.min_daily_rate),
            (LendingStrategy::FlashRate, None) => {
                if self.fallback_logged.insert(currency.clone()) {
                    warn!(
                        currency = %currency,
                        "Exchange has no flash rate, lending at the minimum daily rate"
                    );
                }
                RateDecision::fixed(policy.min_daily_rate)
            }
            (LendingStrategy::FlashRate, Some(base)) => {
                let range = bias_override.unwrap_or(policy.bias);
                self.flash_decision(policy.min_daily_rate, base, range)
            }
        };

        self.bias.advance();
        RateOutcome::Decided(decision)
    }

    fn flash_decision(&self, floor: Decimal, base: Decimal, range: BiasRange) -> RateDecision {
        let bias = self.bias.bias_for(range);
        let candidate = base * (Decimal::ONE + bias / Decimal::ONE_HUNDRED);
        let flash_used = candidate > floor;
        RateDecision {
            rate: if flash_used { candidate } else { floor },
            floor,
            flash_path: true,
            flash_used,
            flash_rate: Some(candidate),
            flash_base: Some(base),
            bias_pct: Some(bias),
            bias_step: Some(self.bias.step() + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lending::domain::policy::ActiveLimit;
    use rust_decimal_macros::dec;

    fn btc() -> Currency {
        Currency::new("BTC").unwrap()
    }

    fn flash_policy() -> CoinPolicy {
        CoinPolicy {
            strategy: LendingStrategy::FlashRate,
            min_daily_rate: dec!(0.0001),
            bias: BiasRange::new(dec!(0), dec!(10)),
            ..CoinPolicy::default()
        }
    }

    fn decided(outcome: RateOutcome) -> RateDecision {
        match outcome {
            RateOutcome::Decided(d) => d,
            RateOutcome::Disabled => panic!("expected a decision"),
        }
    }

    #[test]
    fn test_spread_uses_min_rate() {
        let mut decider = RateDecider::new();
        let policy = CoinPolicy {
            min_daily_rate: dec!(0.0003),
            ..CoinPolicy::default()
        };
        let d = decided(decider.decide(&btc(), &policy, None, None));
        assert_eq!(d.rate, dec!(0.0003));
        assert!(!d.flash_path);
    }

    #[test]
    fn test_disabled_currency() {
        let mut decider = RateDecider::new();
        let policy = CoinPolicy {
            max_active: ActiveLimit::Disabled,
            ..flash_policy()
        };
        assert!(!decider.wants_flash_rate(&policy, true));
        assert_eq!(decider.decide(&btc(), &policy, None, None), RateOutcome::Disabled);
    }

    #[test]
    fn test_bias_steps_cycle_through_range() {
        let mut decider = RateDecider::new();
        let policy = flash_policy();
        let mut biases = Vec::new();
        for _ in 0..7 {
            let d = decided(decider.decide(&btc(), &policy, Some(dec!(0.001)), None));
            biases.push((d.bias_step.unwrap(), d.bias_pct.unwrap()));
        }
        assert_eq!(
            biases,
            vec![
                (1, dec!(0)),
                (2, dec!(2)),
                (3, dec!(4)),
                (4, dec!(6)),
                (5, dec!(8)),
                (6, dec!(10)),
                (1, dec!(0)),
            ]
        );
    }

    #[test]
    fn test_flash_candidate_above_floor_is_used() {
        let mut decider = RateDecider::new();
        let d = decided(decider.decide(&btc(), &flash_policy(), Some(dec!(0.0002)), None));
        assert!(d.flash_used);
        assert_eq!(d.rate, dec!(0.0002));
        assert_eq!(d.floor, dec!(0.0001));
    }

    #[test]
    fn test_flash_candidate_below_floor_falls_back() {
        let mut decider = RateDecider::new();
        let d = decided(decider.decide(&btc(), &flash_policy(), Some(dec!(0.00005)), None));
        assert!(d.flash_path);
        assert!(!d.flash_used);
        assert_eq!(d.rate, dec!(0.0001));
    }

    #[test]
    fn test_override_takes_precedence() {
        let mut decider = RateDecider::new();
        let range = BiasRange::new(dec!(50), dec!(100));
        let d = decided(decider.decide(&btc(), &flash_policy(), Some(dec!(0.0002)), Some(range)));
        assert_eq!(d.bias_pct, Some(dec!(50)));
        assert_eq!(d.rate, dec!(0.0003));
    }

    #[test]
    fn test_missing_flash_rate_falls_back_to_floor() {
        let mut decider = RateDecider::new();
        assert!(!decider.wants_flash_rate(&flash_policy(), false));
        let d = decided(decider.decide(&btc(), &flash_policy(), None, None));
        assert_eq!(d.rate, dec!(0.0001));
        assert!(!d.flash_path);
    }
}
