use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single level of a loan order book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    /// Daily rate as a fraction (0.0001 = 0.01%/day)
    pub rate: Decimal,
    /// Volume offered or demanded at this rate
    pub amount: Decimal,
    /// Longest loan duration accepted at this level, in days
    pub max_duration: u32,
}

impl BookLevel {
    pub fn new(rate: Decimal, amount: Decimal, max_duration: u32) -> Self {
        BookLevel {
            rate,
            amount,
            max_duration,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.amount.is_zero()
    }
}

impl From<(Decimal, Decimal, u32)> for BookLevel {
    fn from((rate, amount, max_duration): (Decimal, Decimal, u32)) -> Self {
        BookLevel::new(rate, amount, max_duration)
    }
}
