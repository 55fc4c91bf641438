use crate::value_objects::{Currency, OfferId, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One of our own loan offers still waiting on the book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOffer {
    pub id: OfferId,
    pub currency: Currency,
    pub amount: Decimal,
    pub rate: Decimal,
    pub duration: u32,
    pub created_at: Timestamp,
}

/// A loan we provided that a borrower has taken
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveLoan {
    pub id: OfferId,
    pub currency: Currency,
    pub amount: Decimal,
    pub rate: Decimal,
    pub duration: u32,
}
