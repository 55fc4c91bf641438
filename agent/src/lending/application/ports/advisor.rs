use lending_core::Currency;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Statistic the advisor derives its suggestion from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryMethod {
    #[default]
    Percentile,
    MovingAverage,
}

/// Market analysis that suggests lending rates. Suggestions are hints only.
pub trait RateAdvisor: Send + Sync {
    fn suggest_rate(&self, currency: &Currency, method: AdvisoryMethod) -> Option<Decimal>;
}
