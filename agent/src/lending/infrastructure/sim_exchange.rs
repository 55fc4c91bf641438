//! In-memory lending exchange
//!
//! Holds wallets, loan books, our open offers and active loans behind one
//! mutex. Offers below the configured per-currency minimum are rejected with
//! the same message a real exchange sends ("Amount must be at least X"), and
//! failures can be queued to exercise error handling.

use crate::error::ExchangeError;
use crate::lending::application::ports::LendingExchange;
use async_trait::async_trait;
use chrono::Utc;
use lending_core::{
    ActiveLoan, Currency, LoanBook, OfferId, OpenOffer, Ticker, TickerEntry, Wallet,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Extra delay added to every request each time the exchange throttles us
const SPACING_STEP: Duration = Duration::from_millis(100);
const MAX_SPACING: Duration = Duration::from_secs(2);

#[derive(Debug, Default)]
struct SimState {
    balances: HashMap<Wallet, HashMap<Currency, Decimal>>,
    known: BTreeSet<Currency>,
    books: HashMap<Currency, LoanBook>,
    flash_rates: HashMap<Currency, Decimal>,
    min_offer_sizes: HashMap<Currency, Decimal>,
    ticker: Ticker,
    open_offers: Vec<OpenOffer>,
    active_loans: Vec<ActiveLoan>,
    next_id: OfferId,
    failures: VecDeque<ExchangeError>,
    book_requests: Vec<(Currency, usize)>,
    request_spacing: Duration,
}

impl SimState {
    fn balance_mut(&mut self, wallet: Wallet, currency: &Currency) -> &mut Decimal {
        self.known.insert(currency.clone());
        self.balances
            .entry(wallet)
            .or_default()
            .entry(currency.clone())
            .or_insert(Decimal::ZERO)
    }

    fn balance(&self, wallet: Wallet, currency: &Currency) -> Decimal {
        self.balances
            .get(&wallet)
            .and_then(|b| b.get(currency))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    fn next_id(&mut self) -> OfferId {
        self.next_id += 1;
        self.next_id
    }
}

pub struct SimulatedExchange {
    state: Mutex<SimState>,
    flash_supported: bool,
}

impl Default for SimulatedExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedExchange {
    pub fn new() -> Self {
        SimulatedExchange {
            state: Mutex::new(SimState::default()),
            flash_supported: true,
        }
    }

    pub fn without_flash_rate(mut self) -> Self {
        self.flash_supported = false;
        self
    }

    pub fn with_balance(self, wallet: Wallet, currency: &Currency, amount: Decimal) -> Self {
        *self.state.lock().balance_mut(wallet, currency) = amount;
        self
    }

    /// Register a currency without giving it a balance
    pub fn with_currency(self, currency: &Currency) -> Self {
        self.state.lock().known.insert(currency.clone());
        self
    }

    pub fn with_book(self, currency: &Currency, book: LoanBook) -> Self {
        self.set_book(currency, book);
        self
    }

    pub fn with_flash_rate(self, currency: &Currency, rate: Decimal) -> Self {
        self.state
            .lock()
            .flash_rates
            .insert(currency.clone(), rate);
        self
    }

    pub fn with_min_offer_size(self, currency: &Currency, amount: Decimal) -> Self {
        self.state
            .lock()
            .min_offer_sizes
            .insert(currency.clone(), amount);
        self
    }

    /// Price of one `currency` in `quote`
    pub fn with_price(self, quote: &Currency, currency: &Currency, last: Decimal) -> Self {
        self.state.lock().ticker.pairs.insert(
            Ticker::pair_name(quote, currency),
            TickerEntry {
                last,
                highest_bid: last,
            },
        );
        self
    }

    pub fn with_open_offer(
        self,
        currency: &Currency,
        amount: Decimal,
        rate: Decimal,
        duration: u32,
    ) -> Self {
        {
            let mut state = self.state.lock();
            let id = state.next_id();
            state.known.insert(currency.clone());
            state.open_offers.push(OpenOffer {
                id,
                currency: currency.clone(),
                amount,
                rate,
                duration,
                created_at: Utc::now(),
            });
        }
        self
    }

    pub fn set_book(&self, currency: &Currency, book: LoanBook) {
        let mut state = self.state.lock();
        state.known.insert(currency.clone());
        state.books.insert(currency.clone(), book.normalized());
    }

    /// The next request fails with `error`
    pub fn queue_failure(&self, error: ExchangeError) {
        self.state.lock().failures.push_back(error);
    }

    /// A borrower takes one of our open offers
    pub fn fill_offer(&self, offer_id: OfferId) -> Option<ActiveLoan> {
        let mut state = self.state.lock();
        let index = state.open_offers.iter().position(|o| o.id == offer_id)?;
        let offer = state.open_offers.remove(index);
        let loan = ActiveLoan {
            id: offer.id,
            currency: offer.currency,
            amount: offer.amount,
            rate: offer.rate,
            duration: offer.duration,
        };
        state.active_loans.push(loan.clone());
        Some(loan)
    }

    pub fn balance(&self, wallet: Wallet, currency: &Currency) -> Decimal {
        self.state.lock().balance(wallet, currency)
    }

    pub fn offers(&self) -> Vec<OpenOffer> {
        self.state.lock().open_offers.clone()
    }

    /// Every `(currency, limit)` loan book request, oldest first
    pub fn book_requests(&self) -> Vec<(Currency, usize)> {
        self.state.lock().book_requests.clone()
    }

    pub fn request_spacing(&self) -> Duration {
        self.state.lock().request_spacing
    }

    pub fn from_seed(seed: SimSeed) -> Self {
        let mut exchange = SimulatedExchange::new();
        exchange.flash_supported = seed.flash_rate_supported;
        for (wallet, balances) in seed.balances {
            for (currency, amount) in balances {
                exchange = exchange.with_balance(wallet, &currency, amount);
            }
        }
        for (currency, book) in seed.books {
            exchange.set_book(&currency, book);
        }
        for (currency, rate) in seed.flash_rates {
            exchange = exchange.with_flash_rate(&currency, rate);
        }
        for (currency, amount) in seed.min_offer_sizes {
            exchange = exchange.with_min_offer_size(&currency, amount);
        }
        for (currency, price) in seed.prices {
            exchange = exchange.with_price(&Currency::reference(), &currency, price);
        }
        exchange
    }

    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let content = std::fs::read_to_string(path)?;
        let seed: SimSeed = serde_json::from_str(&content)?;
        Ok(Self::from_seed(seed))
    }

    /// Apply throttling delay and any queued failure
    async fn begin_request(&self) -> Result<(), ExchangeError> {
        let (spacing, failure) = {
            let mut state = self.state.lock();
            (state.request_spacing, state.failures.pop_front())
        };
        if !spacing.is_zero() {
            tokio::time::sleep(spacing).await;
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Failed to read seed file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse seed: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Initial state of a simulated exchange, read from JSON
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimSeed {
    #[serde(default = "default_true")]
    pub flash_rate_supported: bool,
    #[serde(default)]
    pub balances: HashMap<Wallet, HashMap<Currency, Decimal>>,
    #[serde(default)]
    pub books: HashMap<Currency, LoanBook>,
    #[serde(default)]
    pub flash_rates: HashMap<Currency, Decimal>,
    #[serde(default)]
    pub min_offer_sizes: HashMap<Currency, Decimal>,
    /// Price of each currency in the reference currency
    #[serde(default)]
    pub prices: HashMap<Currency, Decimal>,
}

fn default_true() -> bool {
    true
}

#[async_trait]
impl LendingExchange for SimulatedExchange {
    async fn loan_orders(
        &self,
        currency: &Currency,
        limit: usize,
    ) -> Result<LoanBook, ExchangeError> {
        self.begin_request().await?;
        let mut state = self.state.lock();
        state.book_requests.push((currency.clone(), limit));
        let book = state.books.get(currency).cloned().unwrap_or_default();
        Ok(book.truncated(limit))
    }

    async fn active_loans(&self) -> Result<Vec<ActiveLoan>, ExchangeError> {
        self.begin_request().await?;
        Ok(self.state.lock().active_loans.clone())
    }

    async fn account_balances(
        &self,
        wallet: Wallet,
    ) -> Result<HashMap<Currency, Decimal>, ExchangeError> {
        self.begin_request().await?;
        let state = self.state.lock();
        let mut balances = state.balances.get(&wallet).cloned().unwrap_or_default();
        for currency in &state.known {
            balances.entry(currency.clone()).or_insert(Decimal::ZERO);
        }
        Ok(balances)
    }

    async fn ticker(&self) -> Result<Ticker, ExchangeError> {
        self.begin_request().await?;
        Ok(self.state.lock().ticker.clone())
    }

    async fn create_loan_offer(
        &self,
        currency: &Currency,
        amount: Decimal,
        duration_days: u32,
        _auto_renew: bool,
        rate: Decimal,
    ) -> Result<OfferId, ExchangeError> {
        self.begin_request().await?;
        let mut state = self.state.lock();
        if !state.known.contains(currency) {
            return Err(ExchangeError::UnknownCurrency(currency.clone()));
        }
        if let Some(min) = state.min_offer_sizes.get(currency).copied() {
            if amount < min {
                return Err(ExchangeError::Api(format!(
                    "Amount must be at least {} {}.",
                    min, currency
                )));
            }
        }
        if amount <= Decimal::ZERO || rate <= Decimal::ZERO {
            return Err(ExchangeError::Api("Invalid amount or rate.".to_string()));
        }
        let available = state.balance(Wallet::Lending, currency);
        if amount > available {
            return Err(ExchangeError::Api(format!("Not enough {} available.", currency)));
        }

        *state.balance_mut(Wallet::Lending, currency) -= amount;
        let id = state.next_id();
        state.open_offers.push(OpenOffer {
            id,
            currency: currency.clone(),
            amount,
            rate,
            duration: duration_days,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn cancel_loan_offer(
        &self,
        currency: &Currency,
        offer_id: OfferId,
    ) -> Result<(), ExchangeError> {
        self.begin_request().await?;
        let mut state = self.state.lock();
        let index = state
            .open_offers
            .iter()
            .position(|o| o.id == offer_id && &o.currency == currency)
            .ok_or_else(|| ExchangeError::Api(format!("Loan offer {} not found.", offer_id)))?;
        let offer = state.open_offers.remove(index);
        *state.balance_mut(Wallet::Lending, currency) += offer.amount;
        Ok(())
    }

    async fn transfer_balance(
        &self,
        currency: &Currency,
        amount: Decimal,
        from: Wallet,
        to: Wallet,
    ) -> Result<(), ExchangeError> {
        self.begin_request().await?;
        let mut state = self.state.lock();
        if !state.known.contains(currency) {
            return Err(ExchangeError::UnknownCurrency(currency.clone()));
        }
        if amount <= Decimal::ZERO || amount > state.balance(from, currency) {
            return Err(ExchangeError::Api(format!(
                "Not enough {} in {} wallet.",
                currency, from
            )));
        }
        *state.balance_mut(from, currency) -= amount;
        *state.balance_mut(to, currency) += amount;
        Ok(())
    }

    async fn flash_rate(&self, currency: &Currency) -> Result<Decimal, ExchangeError> {
        self.begin_request().await?;
        if !self.flash_supported {
            return Err(ExchangeError::FlashRateUnavailable(currency.clone()));
        }
        self.state
            .lock()
            .flash_rates
            .get(currency)
            .copied()
            .ok_or_else(|| ExchangeError::FlashRateUnavailable(currency.clone()))
    }

    async fn open_loan_offers(&self) -> Result<HashMap<Currency, Vec<OpenOffer>>, ExchangeError> {
        self.begin_request().await?;
        let mut offers: HashMap<Currency, Vec<OpenOffer>> = HashMap::new();
        for offer in &self.state.lock().open_offers {
            offers
                .entry(offer.currency.clone())
                .or_default()
                .push(offer.clone());
        }
        Ok(offers)
    }

    fn supports_flash_rate(&self) -> bool {
        self.flash_supported
    }

    fn increase_request_spacing(&self) {
        let mut state = self.state.lock();
        state.request_spacing = (state.request_spacing + SPACING_STEP).min(MAX_SPACING);
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lending_core::BookLevel;
    use rust_decimal_macros::dec;

    fn btc() -> Currency {
        Currency::new("BTC").unwrap()
    }

    #[tokio::test]
    async fn test_offer_moves_balance_and_cancel_restores_it() {
        let exchange = SimulatedExchange::new().with_balance(Wallet::Lending, &btc(), dec!(2));
        let id = exchange
            .create_loan_offer(&btc(), dec!(1.5), 2, false, dec!(0.0002))
            .await
            .unwrap();
        assert_eq!(exchange.balance(Wallet::Lending, &btc()), dec!(0.5));

        exchange.cancel_loan_offer(&btc(), id).await.unwrap();
        assert_eq!(exchange.balance(Wallet::Lending, &btc()), dec!(2));
        assert!(exchange.offers().is_empty());
    }

    #[tokio::test]
    async fn test_min_size_rejection_message() {
        let exchange = SimulatedExchange::new()
            .with_balance(Wallet::Lending, &btc(), dec!(1))
            .with_min_offer_size(&btc(), dec!(0.1));
        let err = exchange
            .create_loan_offer(&btc(), dec!(0.05), 2, false, dec!(0.0002))
            .await
            .unwrap_err();
        assert_eq!(err, ExchangeError::Api("Amount must be at least 0.1 BTC.".into()));
    }

    #[tokio::test]
    async fn test_book_truncated_to_limit() {
        let levels = (1..=8)
            .map(|i| BookLevel::new(Decimal::new(i, 4), dec!(1), 2))
            .collect();
        let exchange = SimulatedExchange::new().with_book(&btc(), LoanBook::new(levels, vec![]));
        let book = exchange.loan_orders(&btc(), 5).await.unwrap();
        assert_eq!(book.offers.len(), 5);
        assert_eq!(exchange.book_requests(), vec![(btc(), 5)]);
    }

    #[tokio::test]
    async fn test_unknown_currency_transfer() {
        let exchange = SimulatedExchange::new();
        let xyz = Currency::new("XYZ").unwrap();
        let err = exchange
            .transfer_balance(&xyz, dec!(1), Wallet::Exchange, Wallet::Lending)
            .await
            .unwrap_err();
        assert_eq!(err, ExchangeError::UnknownCurrency(xyz));
    }

    #[tokio::test]
    async fn test_queued_failure_and_spacing() {
        let exchange = SimulatedExchange::new();
        exchange.queue_failure(ExchangeError::Timeout);
        assert_eq!(exchange.active_loans().await, Err(ExchangeError::Timeout));
        assert!(exchange.active_loans().await.is_ok());

        exchange.increase_request_spacing();
        assert_eq!(exchange.request_spacing(), SPACING_STEP);
    }

    #[test]
    fn test_seed_from_json() {
        let seed: SimSeed = serde_json::from_str(
            r#"{
                "balances": {"lending": {"BTC": "1.5"}},
                "books": {"BTC": {"offers": [{"rate": "0.0002", "amount": "3", "max_duration": 2}], "demands": []}},
                "min_offer_sizes": {"BTC": "0.01"}
            }"#,
        )
        .unwrap();
        let exchange = SimulatedExchange::from_seed(seed);
        assert_eq!(exchange.balance(Wallet::Lending, &btc()), dec!(1.5));
        assert!(exchange.supports_flash_rate());
    }
}
