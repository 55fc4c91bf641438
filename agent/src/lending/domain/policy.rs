//! Per-currency lending policy
//!
//! Policies are resolved once at startup (global defaults merged with the
//! currency's own section) and stay immutable for the life of the process.

use lending_core::Currency;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

pub const MIN_SPREAD: u32 = 1;
pub const MAX_SPREAD: u32 = 20;

/// How the lending rate of a currency is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LendingStrategy {
    /// Spread the balance over the order book, floored at the minimum rate
    Spread,
    /// Single order priced off the exchange's flash rate
    #[serde(rename = "FRR", alias = "FlashRate")]
    FlashRate,
}

/// Unit of the gap bottom/top depth targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GapMode {
    /// Absolute amount of the lent currency
    Raw,
    /// Absolute amount of the reference currency, converted through the ticker
    #[serde(rename = "RawBTC", alias = "RawReference")]
    RawReference,
    /// Percent of the currency's total balance
    Relative,
}

/// Cap on the total amount that may be lent out at once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveLimit {
    Unlimited,
    /// Currency is not lent and its offers are left alone
    Disabled,
    Cap(Decimal),
}

impl ActiveLimit {
    /// -1 is unlimited, 0 disables the currency, anything else is a cap
    pub fn from_amount(amount: Decimal) -> Self {
        if amount.is_zero() {
            ActiveLimit::Disabled
        } else if amount.is_sign_negative() {
            ActiveLimit::Unlimited
        } else {
            ActiveLimit::Cap(amount)
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, ActiveLimit::Disabled)
    }
}

/// Flash-rate markup range, in percent of the flash rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiasRange {
    pub min: Decimal,
    pub max: Decimal,
}

impl BiasRange {
    pub fn new(min: Decimal, max: Decimal) -> Self {
        BiasRange { min, max }.normalized()
    }

    /// Swap the bounds if they were given the wrong way round
    pub fn normalized(self) -> Self {
        if self.min > self.max {
            BiasRange {
                min: self.max,
                max: self.min,
            }
        } else {
            self
        }
    }
}

impl Default for BiasRange {
    fn default() -> Self {
        BiasRange {
            min: Decimal::new(-10, 0),
            max: Decimal::new(10, 0),
        }
    }
}

/// Lend for `days` when the rate reaches `rate`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationThreshold {
    pub rate: Decimal,
    pub days: u32,
}

/// Fully resolved policy of one currency. All rates are daily fractions.
#[derive(Debug, Clone, PartialEq)]
pub struct CoinPolicy {
    pub min_daily_rate: Decimal,
    pub max_daily_rate: Decimal,
    pub min_loan_size: Decimal,
    pub max_active: ActiveLimit,
    pub max_to_lend: Decimal,
    /// Fraction of the total balance, zero when unset
    pub max_percent_to_lend: Decimal,
    pub max_to_lend_rate: Decimal,
    pub strategy: LendingStrategy,
    pub spread: u32,
    pub gap_mode: GapMode,
    pub gap_bottom: Decimal,
    pub gap_top: Decimal,
    pub bias: BiasRange,
    /// Sorted by ascending rate
    pub duration_thresholds: Vec<DurationThreshold>,
}

impl CoinPolicy {
    pub fn is_disabled(&self) -> bool {
        self.max_active.is_disabled()
    }

    /// Days granted at the highest threshold, if any thresholds are set
    pub fn top_threshold_days(&self) -> Option<u32> {
        self.duration_thresholds.last().map(|t| t.days)
    }
}

impl Default for CoinPolicy {
    fn default() -> Self {
        CoinPolicy {
            min_daily_rate: Decimal::new(5, 5),
            max_daily_rate: Decimal::new(5, 2),
            min_loan_size: Decimal::new(1, 2),
            max_active: ActiveLimit::Unlimited,
            max_to_lend: Decimal::ZERO,
            max_percent_to_lend: Decimal::ZERO,
            max_to_lend_rate: Decimal::ZERO,
            strategy: LendingStrategy::Spread,
            spread: 3,
            gap_mode: GapMode::Relative,
            gap_bottom: Decimal::new(10, 0),
            gap_top: Decimal::new(200, 0),
            bias: BiasRange::default(),
            duration_thresholds: Vec::new(),
        }
    }
}

/// Policies of every currency the bot knows about
#[derive(Debug, Clone, Default)]
pub struct PolicyStore {
    default: CoinPolicy,
    coins: HashMap<Currency, CoinPolicy>,
    tracked: BTreeSet<Currency>,
}

impl PolicyStore {
    /// `tracked` lists the currencies lent with the default policy; currencies
    /// with their own policy are always tracked.
    pub fn new(
        default: CoinPolicy,
        coins: HashMap<Currency, CoinPolicy>,
        tracked: impl IntoIterator<Item = Currency>,
    ) -> Self {
        let mut tracked: BTreeSet<Currency> = tracked.into_iter().collect();
        tracked.extend(coins.keys().cloned());
        PolicyStore {
            default,
            coins,
            tracked,
        }
    }

    pub fn policy(&self, currency: &Currency) -> &CoinPolicy {
        self.coins.get(currency).unwrap_or(&self.default)
    }

    pub fn default_policy(&self) -> &CoinPolicy {
        &self.default
    }

    pub fn tracks(&self, currency: &Currency) -> bool {
        self.tracked.contains(currency)
    }

    /// Tracked currencies in alphabetical order
    pub fn currencies(&self) -> impl Iterator<Item = &Currency> {
        self.tracked.iter()
    }
}
