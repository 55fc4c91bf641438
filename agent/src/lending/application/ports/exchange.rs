use crate::error::ExchangeError;
use async_trait::async_trait;
use lending_core::{ActiveLoan, Currency, LoanBook, OfferId, OpenOffer, Ticker, Wallet};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Margin-lending exchange as seen by the lending session
///
/// Minimum-size rejections of [`create_loan_offer`](Self::create_loan_offer)
/// are reported as [`ExchangeError::Api`] with the exchange's message, which
/// names the minimum ("Amount must be at least 0.01").
#[async_trait]
pub trait LendingExchange: Send + Sync {
    /// Up to `limit` levels of each side of the currency's loan book
    async fn loan_orders(&self, currency: &Currency, limit: usize)
    -> Result<LoanBook, ExchangeError>;

    /// Loans we provided that are currently taken
    async fn active_loans(&self) -> Result<Vec<ActiveLoan>, ExchangeError>;

    /// Available balances of one wallet
    async fn account_balances(
        &self,
        wallet: Wallet,
    ) -> Result<HashMap<Currency, Decimal>, ExchangeError>;

    /// Available balances of the exchange (trading) wallet, listing every
    /// currency the exchange knows, including empty ones
    async fn exchange_balances(&self) -> Result<HashMap<Currency, Decimal>, ExchangeError> {
        self.account_balances(Wallet::Exchange).await
    }

    async fn ticker(&self) -> Result<Ticker, ExchangeError>;

    async fn create_loan_offer(
        &self,
        currency: &Currency,
        amount: Decimal,
        duration_days: u32,
        auto_renew: bool,
        rate: Decimal,
    ) -> Result<OfferId, ExchangeError>;

    async fn cancel_loan_offer(
        &self,
        currency: &Currency,
        offer_id: OfferId,
    ) -> Result<(), ExchangeError>;

    async fn transfer_balance(
        &self,
        currency: &Currency,
        amount: Decimal,
        from: Wallet,
        to: Wallet,
    ) -> Result<(), ExchangeError>;

    /// Floating reference rate published by the exchange
    async fn flash_rate(&self, currency: &Currency) -> Result<Decimal, ExchangeError>;

    /// Our offers still waiting on the books, by currency
    async fn open_loan_offers(&self) -> Result<HashMap<Currency, Vec<OpenOffer>>, ExchangeError>;

    fn supports_flash_rate(&self) -> bool;

    /// Back off after the exchange throttled us
    fn increase_request_spacing(&self);

    fn name(&self) -> &str;
}
