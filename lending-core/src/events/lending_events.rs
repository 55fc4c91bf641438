use crate::value_objects::{Currency, OfferId, Timestamp, Wallet};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanOfferPlaced {
    /// Exchange id, `None` when the offer was only simulated (dry run)
    pub offer_id: Option<OfferId>,
    pub currency: Currency,
    pub amount: Decimal,
    pub rate: Decimal,
    pub duration: u32,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanOfferCanceled {
    pub offer_id: OfferId,
    pub currency: Currency,
    pub amount: Decimal,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferExecuted {
    pub currency: Currency,
    pub amount: Decimal,
    pub from: Wallet,
    pub to: Wallet,
    pub timestamp: Timestamp,
}
