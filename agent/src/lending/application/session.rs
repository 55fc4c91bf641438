//! One lending tick: transfer, cancel, lend
//!
//! [`LendingSession`] owns every piece of mutable runtime state of the bot
//! (request depths, learned minimum sizes, bias cycle, sleep interval). The
//! only state it shares is the operator's [`ControlHandle`], which it reads
//! once per tick.

use super::ports::{AdvisoryMethod, Clock, LendingExchange, Notifier, RateAdvisor, StatusSink};
use crate::control::ControlHandle;
use crate::error::{ExchangeError, LendingError};
use crate::lending::domain::{
    BiasRange, CoinPolicy, DepthOutcome, DurationPlanner, GapMode, MinSizeLearner, OrderBuilder, PolicyStore,
    RateDecider, RateDecision, RateOutcome, RequestDepthTable, amount_to_lend,
};
use chrono::NaiveDate;
use lending_core::{
    ActiveLoan, Currency, LentSummary, LoanOfferCanceled, LoanOfferPlaced, OfferId, Timestamp,
    TransferExecuted, Wallet, format_amount, format_rate_pct, truncate_amount,
};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A borrower bid above this daily rate is matched directly
pub const COMPETE_RATE: Decimal = Decimal::from_parts(64, 0, 0, false, 5);
/// Offers priced above this rate are undercut by [`UNDERCUT_STEP`]
pub const UNDERCUT_THRESHOLD: Decimal = Decimal::from_parts(1, 0, 0, false, 4);
pub const UNDERCUT_STEP: Decimal = Decimal::from_parts(1, 0, 0, false, 6);

/// Rate an offer is submitted at: one step below `rate` once above
/// [`UNDERCUT_THRESHOLD`]
pub fn undercut(rate: Decimal) -> Decimal {
    if rate > UNDERCUT_THRESHOLD {
        rate - UNDERCUT_STEP
    } else {
        rate
    }
}

/// Which operator notifications are enabled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifySettings {
    pub tx_coins: bool,
    pub xday_threshold: bool,
    pub new_loans: bool,
    pub caught_exception: bool,
}

/// Session behaviour taken from the configuration
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Sleep after a tick that found something to lend
    pub sleep_active: Duration,
    /// Sleep after an idle or paused tick
    pub sleep_inactive: Duration,
    /// Currencies moved from the exchange wallet to the lending wallet
    pub transfer_currencies: Vec<Currency>,
    pub keep_stuck_orders: bool,
    /// Skip a currency rather than lend below its minimum rate
    pub hide_coins: bool,
    pub auto_renew: bool,
    pub dry_run: bool,
    pub end_date: Option<NaiveDate>,
    pub reference_currency: Currency,
    pub advisory_method: AdvisoryMethod,
    pub notify: NotifySettings,
    /// Limit on each exchange request
    pub request_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            sleep_active: Duration::from_secs(60),
            sleep_inactive: Duration::from_secs(300),
            transfer_currencies: Vec::new(),
            keep_stuck_orders: true,
            hide_coins: true,
            auto_renew: false,
            dry_run: false,
            end_date: None,
            reference_currency: Currency::reference(),
            advisory_method: AdvisoryMethod::default(),
            notify: NotifySettings::default(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// What a tick did
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub paused: bool,
    pub transferred: Vec<TransferExecuted>,
    pub canceled: Vec<LoanOfferCanceled>,
    pub placed: Vec<LoanOfferPlaced>,
    /// Currencies that had something to lend
    pub lendable: BTreeSet<Currency>,
    pub depth_restarts: u32,
    pub new_loans: usize,
    pub sleep: Duration,
}

impl TickReport {
    /// Total amount placed for `currency` during this tick
    pub fn placed_amount(&self, currency: &Currency) -> Decimal {
        self.placed
            .iter()
            .filter(|p| &p.currency == currency)
            .map(|p| p.amount)
            .sum()
    }
}

enum PassOutcome {
    Completed,
    NeedMoreDepth(Currency),
}

pub struct LendingSession {
    exchange: Arc<dyn LendingExchange>,
    policies: PolicyStore,
    settings: SessionSettings,
    control: ControlHandle,
    status: Arc<dyn StatusSink>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    advisor: Option<Arc<dyn RateAdvisor>>,
    depths: RequestDepthTable,
    rates: RateDecider,
    min_sizes: MinSizeLearner,
    durations: DurationPlanner,
    transfer_list: Vec<Currency>,
    sleep_interval: Duration,
    last_paused: Option<bool>,
    known_loans: Option<HashSet<OfferId>>,
    last_summary: Option<Timestamp>,
}

impl LendingSession {
    pub fn new(
        exchange: Arc<dyn LendingExchange>,
        policies: PolicyStore,
        settings: SessionSettings,
        control: ControlHandle,
        status: Arc<dyn StatusSink>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        LendingSession {
            exchange,
            policies,
            control,
            status,
            notifier,
            clock,
            advisor: None,
            depths: RequestDepthTable::new(),
            rates: RateDecider::new(),
            min_sizes: MinSizeLearner::new(),
            durations: DurationPlanner::new(settings.end_date),
            transfer_list: settings.transfer_currencies.clone(),
            sleep_interval: settings.sleep_active,
            last_paused: None,
            known_loans: None,
            last_summary: None,
            settings,
        }
    }

    pub fn with_advisor(mut self, advisor: Arc<dyn RateAdvisor>) -> Self {
        self.advisor = Some(advisor);
        self
    }

    pub fn exchange(&self) -> &Arc<dyn LendingExchange> {
        &self.exchange
    }

    pub fn status(&self) -> &Arc<dyn StatusSink> {
        &self.status
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn sleep_interval(&self) -> Duration {
        self.sleep_interval
    }

    pub fn request_depth(&self, currency: &Currency) -> usize {
        self.depths.get(currency)
    }

    pub fn learned_min_size(&self, currency: &Currency) -> Option<Decimal> {
        self.min_sizes.learned(currency)
    }

    pub fn transfer_list(&self) -> &[Currency] {
        &self.transfer_list
    }

    /// Run one tick against the exchange
    pub async fn tick(&mut self) -> Result<TickReport, LendingError> {
        let control = self.control.load();
        self.log_pause_transition(control.paused);

        let mut report = TickReport {
            paused: control.paused,
            ..TickReport::default()
        };
        if control.paused {
            self.sleep_interval = self.settings.sleep_inactive;
            report.sleep = self.sleep_interval;
            return Ok(report);
        }

        self.transfer_balances(&mut report).await?;
        self.cancel_all(&mut report).await?;

        let loans = self.request(self.exchange.active_loans()).await?;
        let lent = LentSummary::from_loans(&loans);

        let mut restarted = false;
        loop {
            match self
                .lend_all(&lent, control.bias_override, &mut report)
                .await?
            {
                PassOutcome::Completed => break,
                PassOutcome::NeedMoreDepth(currency) => {
                    let depth = self.depths.grow(&currency);
                    if restarted {
                        warn!(currency = %currency, depth, "Order book still too shallow, retrying next tick");
                        break;
                    }
                    info!(currency = %currency, depth, "Order book too shallow, restarting lend pass");
                    restarted = true;
                    report.depth_restarts += 1;
                }
            }
        }

        self.sleep_interval = if report.lendable.is_empty() {
            self.settings.sleep_inactive
        } else {
            self.settings.sleep_active
        };
        report.sleep = self.sleep_interval;

        report.new_loans = self.notify_new_loans(&loans);
        self.summarize(&lent);
        if let Err(e) = self.status.persist() {
            warn!("Failed to persist status: {}", e);
        }
        Ok(report)
    }

    fn log_pause_transition(&mut self, paused: bool) {
        if self.last_paused == Some(paused) {
            return;
        }
        let line = if paused {
            "Lending paused"
        } else {
            "Lending running"
        };
        info!("{}", line);
        self.status.log_line(line);
        self.last_paused = Some(paused);
    }

    async fn transfer_balances(&mut self, report: &mut TickReport) -> Result<(), LendingError> {
        if self.transfer_list.is_empty() {
            return Ok(());
        }
        let balances = self.request(self.exchange.exchange_balances()).await?;
        let mut unknown = Vec::new();

        for currency in &self.transfer_list {
            let Some(&amount) = balances.get(currency) else {
                unknown.push(currency.clone());
                continue;
            };
            if amount <= Decimal::ZERO {
                continue;
            }
            if self.settings.dry_run {
                info!("[dry run] Would transfer {} to lending", format_amount(amount, currency));
                continue;
            }
            match self
                .request(self.exchange.transfer_balance(
                    currency,
                    amount,
                    Wallet::Exchange,
                    Wallet::Lending,
                ))
                .await
            {
                Ok(()) => {
                    let line = format!("Transferred {} to lending", format_amount(amount, currency));
                    info!("{}", line);
                    self.status.log_line(&line);
                    if self.settings.notify.tx_coins {
                        self.notifier.notify(&line);
                    }
                    report.transferred.push(TransferExecuted {
                        currency: currency.clone(),
                        amount,
                        from: Wallet::Exchange,
                        to: Wallet::Lending,
                        timestamp: self.clock.now(),
                    });
                }
                Err(ExchangeError::UnknownCurrency(_)) => unknown.push(currency.clone()),
                Err(e) => return Err(e.into()),
            }
        }

        for currency in &unknown {
            warn!(currency = %currency, "Unknown to the exchange, removed from transfer list");
        }
        self.transfer_list.retain(|c| !unknown.contains(c));
        Ok(())
    }

    async fn cancel_all(&mut self, report: &mut TickReport) -> Result<(), LendingError> {
        let offers: BTreeMap<Currency, _> = self
            .request(self.exchange.open_loan_offers())
            .await?
            .into_iter()
            .collect();
        if offers.is_empty() {
            return Ok(());
        }
        let balances = self
            .request(self.exchange.account_balances(Wallet::Lending))
            .await?;

        for (currency, open) in &offers {
            if !self.policies.tracks(currency) {
                continue;
            }
            let policy = self.policies.policy(currency);
            if policy.is_disabled() {
                continue;
            }

            let min_size = self.min_sizes.effective(currency, policy.min_loan_size);
            let available = if self.settings.keep_stuck_orders {
                let free = balances.get(currency).copied().unwrap_or_default();
                free + open.iter().map(|o| o.amount).sum::<Decimal>()
            } else {
                min_size + Decimal::ONE
            };
            if available < min_size {
                debug!(currency = %currency, %available, %min_size, "Leaving stuck offers in place");
                continue;
            }

            for offer in open {
                if self.settings.dry_run {
                    info!("[dry run] Would cancel {} loan offer {}", currency, offer.id);
                    continue;
                }
                match self
                    .request(self.exchange.cancel_loan_offer(currency, offer.id))
                    .await
                {
                    Ok(()) => {
                        self.status.log_line(&format!(
                            "Canceled {} loan offer {} ({} at {})",
                            currency,
                            offer.id,
                            format_amount(offer.amount, currency),
                            format_rate_pct(offer.rate)
                        ));
                        report.canceled.push(LoanOfferCanceled {
                            offer_id: offer.id,
                            currency: currency.clone(),
                            amount: offer.amount,
                            timestamp: self.clock.now(),
                        });
                    }
                    Err(e) => warn!(currency = %currency, offer_id = offer.id, "Failed to cancel offer: {}", e),
                }
            }
        }
        Ok(())
    }

    async fn lend_all(
        &mut self,
        lent: &LentSummary,
        bias_override: Option<BiasRange>,
        report: &mut TickReport,
    ) -> Result<PassOutcome, LendingError> {
        let balances = if self.settings.dry_run {
            self.on_order_balances().await?
        } else {
            self.request(self.exchange.account_balances(Wallet::Lending))
                .await?
        };
        let balances: BTreeMap<Currency, Decimal> = balances
            .into_iter()
            .filter(|(currency, balance)| *balance > Decimal::ZERO && self.policies.tracks(currency))
            .collect();

        for (currency, balance) in balances {
            let outcome = self
                .lend_currency(&currency, balance, lent, bias_override, report)
                .await?;
            if outcome == DepthOutcome::NeedMoreDepth {
                return Ok(PassOutcome::NeedMoreDepth(currency));
            }
        }
        Ok(PassOutcome::Completed)
    }

    /// Decide the currency's rate, then lend it, retrying once at the same
    /// rate if the exchange rejects an offer as too small
    async fn lend_currency(
        &mut self,
        currency: &Currency,
        lending_balance: Decimal,
        lent: &LentSummary,
        bias_override: Option<BiasRange>,
        report: &mut TickReport,
    ) -> Result<DepthOutcome<()>, LendingError> {
        let policy = self.policies.policy(currency).clone();

        let flash_base = if self
            .rates
            .wants_flash_rate(&policy, self.exchange.supports_flash_rate())
        {
            Some(self.request(self.exchange.flash_rate(currency)).await?)
        } else {
            None
        };
        let decision = match self.rates.decide(currency, &policy, flash_base, bias_override) {
            RateOutcome::Disabled => return Ok(DepthOutcome::Found(())),
            RateOutcome::Decided(decision) => decision,
        };
        self.record_decision(currency, &decision);

        let placed_before = report.placed_amount(currency);
        let mut balance = lending_balance;
        let mut retried = false;

        loop {
            let err = match self
                .lend_once(currency, &policy, &decision, balance, lent, report)
                .await
            {
                Ok(outcome) => return Ok(outcome),
                Err(err) => err,
            };

            let message = match &err {
                LendingError::Exchange(e) => e.api_message().map(str::to_owned),
                _ => None,
            };
            let Some(message) =
                message.filter(|m| !retried && MinSizeLearner::is_min_size_rejection(m))
            else {
                return Err(err);
            };
            let Some(min_size) = self.min_sizes.on_rejection(currency, &message) else {
                return Err(err);
            };

            warn!(currency = %currency, %min_size, "Offer below exchange minimum, retrying");
            self.status
                .update_value(currency, "minLoanSize", min_size.to_string());
            retried = true;
            balance = lending_balance - (report.placed_amount(currency) - placed_before);
            if balance <= Decimal::ZERO {
                return Ok(DepthOutcome::Found(()));
            }
        }
    }

    async fn lend_once(
        &mut self,
        currency: &Currency,
        policy: &CoinPolicy,
        decision: &RateDecision,
        lending_balance: Decimal,
        lent: &LentSummary,
        report: &mut TickReport,
    ) -> Result<DepthOutcome<()>, LendingError> {
        let request_depth = self.depths.get(currency);
        let book = self
            .request(self.exchange.loan_orders(currency, request_depth))
            .await?;
        if book.is_empty() {
            debug!(currency = %currency, "Empty loan book");
            return Ok(DepthOutcome::Found(()));
        }

        let min_size = self.min_sizes.effective(currency, policy.min_loan_size);
        let total_lent = lent.total_lent(currency);
        let total_balance = lending_balance + total_lent;
        let amount = amount_to_lend(
            policy,
            min_size,
            total_balance,
            lending_balance,
            book.lowest_offer_rate(),
            total_lent,
        );
        self.status
            .update_value(currency, "maxToLend", amount.to_string());
        if amount <= Decimal::ZERO || amount < min_size {
            debug!(currency = %currency, %amount, %min_size, "Nothing to lend");
            return Ok(DepthOutcome::Found(()));
        }
        report.lendable.insert(currency.clone());

        let today = self.clock.today();
        if let Some(demand) = book.best_demand().filter(|d| d.rate > COMPETE_RATE) {
            let rate = undercut(demand.rate);
            let days = self.durations.clamp(demand.max_duration, today)?;
            info!(
                currency = %currency,
                demand_rate = %format_rate_pct(demand.rate),
                "Matching competing demand"
            );
            self.place(currency, amount, rate, days, report).await?;
            return Ok(DepthOutcome::Found(()));
        }

        let reference_price = if policy.gap_mode == GapMode::RawReference {
            self.request(self.exchange.ticker())
                .await?
                .price_in(currency, &self.settings.reference_currency)
        } else {
            None
        };
        let builder = OrderBuilder::new(policy, min_size, request_depth);
        let orders = match builder.build(amount, total_balance, &book.offers, reference_price) {
            DepthOutcome::Found(orders) => orders,
            DepthOutcome::NeedMoreDepth => return Ok(DepthOutcome::NeedMoreDepth),
        };

        for order in orders {
            let rate = match order.rate {
                None => decision.rate,
                Some(rate) if rate >= decision.rate => rate,
                Some(rate) if self.settings.hide_coins => {
                    let line = format!(
                        "Not lending {} due to rate below {} (actual: {})",
                        currency,
                        format_rate_pct(decision.rate),
                        format_rate_pct(rate)
                    );
                    info!("{}", line);
                    self.status.log_line(&line);
                    return Ok(DepthOutcome::Found(()));
                }
                Some(_) => decision.rate,
            };
            let rate = undercut(rate);

            let days = self
                .durations
                .plan(&policy.duration_thresholds, rate, today)?;
            if self.settings.notify.xday_threshold && policy.top_threshold_days() == Some(days) {
                self.notifier.notify(&format!(
                    "{} lent at {} for the maximum of {} days",
                    format_amount(order.amount, currency),
                    format_rate_pct(rate),
                    days
                ));
            }
            self.place(currency, order.amount, rate, days, report).await?;
        }
        Ok(DepthOutcome::Found(()))
    }

    async fn place(
        &self,
        currency: &Currency,
        amount: Decimal,
        rate: Decimal,
        days: u32,
        report: &mut TickReport,
    ) -> Result<(), LendingError> {
        let amount = truncate_amount(amount);
        let offer_id = if self.settings.dry_run {
            None
        } else {
            Some(
                self.request(self.exchange.create_loan_offer(
                    currency,
                    amount,
                    days,
                    self.settings.auto_renew,
                    rate,
                ))
                .await?,
            )
        };

        let line = format!(
            "{}Placing {} at {} for {} days",
            if self.settings.dry_run { "[dry run] " } else { "" },
            format_amount(amount, currency),
            format_rate_pct(rate),
            days
        );
        info!("{}", line);
        self.status.log_line(&line);

        report.placed.push(LoanOfferPlaced {
            offer_id,
            currency: currency.clone(),
            amount,
            rate,
            duration: days,
            timestamp: self.clock.now(),
        });
        Ok(())
    }

    /// Await one exchange call, failing with [`ExchangeError::Timeout`] once
    /// it exceeds the request timeout
    async fn request<T>(
        &self,
        call: impl Future<Output = Result<T, ExchangeError>>,
    ) -> Result<T, ExchangeError> {
        tokio::time::timeout(self.settings.request_timeout, call)
            .await
            .unwrap_or(Err(ExchangeError::Timeout))
    }

    fn record_decision(&self, currency: &Currency, decision: &RateDecision) {
        self.status
            .update_value(currency, "minDailyRate", format_rate_pct(decision.rate));
        if decision.flash_path {
            debug!(
                currency = %currency,
                base = ?decision.flash_base,
                bias = ?decision.bias_pct,
                step = ?decision.bias_step,
                used = decision.flash_used,
                "Flash rate decision"
            );
            if let (Some(step), Some(bias)) = (decision.bias_step, decision.bias_pct) {
                self.status
                    .update_value(currency, "frrDelta", format!("step {} ({}%)", step, bias));
            }
        }

        let Some(advisor) = &self.advisor else {
            return;
        };
        if let Some(suggested) = advisor.suggest_rate(currency, self.settings.advisory_method) {
            if decision.rate < suggested {
                info!(
                    currency = %currency,
                    "Advisor suggests {}, lending at {}",
                    format_rate_pct(suggested),
                    format_rate_pct(decision.rate)
                );
            }
        }
    }

    /// Balances tied up in open offers, lent in dry-run mode as if the
    /// offers had been canceled
    async fn on_order_balances(&self) -> Result<HashMap<Currency, Decimal>, LendingError> {
        let offers = self.request(self.exchange.open_loan_offers()).await?;
        Ok(offers
            .into_iter()
            .map(|(currency, open)| (currency, open.iter().map(|o| o.amount).sum()))
            .collect())
    }

    fn notify_new_loans(&mut self, loans: &[ActiveLoan]) -> usize {
        let current: HashSet<OfferId> = loans.iter().map(|l| l.id).collect();
        let new_count = match &self.known_loans {
            None => 0,
            Some(known) => {
                let mut grouped: BTreeMap<(Currency, Decimal, u32), Decimal> = BTreeMap::new();
                for loan in loans.iter().filter(|l| !known.contains(&l.id)) {
                    *grouped
                        .entry((loan.currency.clone(), loan.rate, loan.duration))
                        .or_default() += loan.amount;
                }
                if self.settings.notify.new_loans {
                    for ((currency, rate, days), amount) in &grouped {
                        self.notifier.notify(&format!(
                            "New loan: {} at {} for {} days",
                            format_amount(*amount, currency),
                            format_rate_pct(*rate),
                            days
                        ));
                    }
                }
                loans.iter().filter(|l| !known.contains(&l.id)).count()
            }
        };
        self.known_loans = Some(current);
        new_count
    }

    /// Log what is lent, at most once per inactive period
    fn summarize(&mut self, lent: &LentSummary) {
        if lent.is_empty() {
            return;
        }
        let now = self.clock.now();
        let due = match self.last_summary {
            None => true,
            Some(last) => (now - last)
                .to_std()
                .is_ok_and(|elapsed| elapsed >= self.settings.sleep_inactive),
        };
        if !due {
            return;
        }

        let line = lent.describe();
        info!("{}", line);
        self.status.log_line(&line);
        for currency in lent.currencies() {
            self.status
                .update_value(currency, "totalLent", lent.total_lent(currency).to_string());
            if let Some(average) = lent.average_rate(currency) {
                self.status
                    .update_value(currency, "averageLendingRate", format_rate_pct(average));
            }
        }
        self.last_summary = Some(now);
    }
}
