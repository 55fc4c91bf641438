use crate::lending::application::ports::AdvisoryMethod;
use crate::lending::domain::{GapMode, LendingStrategy};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration of the lending agent
///
/// Rates in this file are daily percentages ("0.005" is 0.005 %/day);
/// they are converted to fractions when policies are resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub bot: LoopConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub status: StatusConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    /// Per-currency policies; the `default` entry applies to every currency
    #[serde(default)]
    pub coin: BTreeMap<String, CoinPolicyConfig>,
}

/// Exchange connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_exchange")]
    pub exchange: String,
    /// JSON file describing the simulated exchange's initial state
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
    /// Currencies lent with the default policy
    #[serde(default)]
    pub all_currencies: Vec<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            exchange: default_exchange(),
            seed_file: None,
            all_currencies: Vec::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Lending loop behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    #[serde(default = "default_sleep_active")]
    pub sleep_time_active_secs: u64,
    #[serde(default = "default_sleep_inactive")]
    pub sleep_time_inactive_secs: u64,
    /// Currencies moved from the exchange wallet before lending; "ALL" means
    /// every currency in `api.all_currencies`
    #[serde(default)]
    pub transfer_currencies: Vec<String>,
    #[serde(default = "default_true")]
    pub keep_stuck_orders: bool,
    #[serde(default = "default_true")]
    pub hide_coins: bool,
    #[serde(default)]
    pub auto_renew: bool,
    #[serde(default)]
    pub dry_run: bool,
    /// Stop lending shortly before this date
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub advisory_method: AdvisoryMethod,
}

impl Default for LoopConfig {
    fn default() -> Self {
        LoopConfig {
            sleep_time_active_secs: default_sleep_active(),
            sleep_time_inactive_secs: default_sleep_inactive(),
            transfer_currencies: Vec::new(),
            keep_stuck_orders: true,
            hide_coins: true,
            auto_renew: false,
            dry_run: false,
            end_date: None,
            advisory_method: AdvisoryMethod::default(),
        }
    }
}

/// Operator settings file shared with the control surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    #[serde(default = "default_settings_file")]
    pub settings_file: PathBuf,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        ControlConfig {
            settings_file: default_settings_file(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl ControlConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
}

impl Default for StatusConfig {
    fn default() -> Self {
        StatusConfig {
            file: None,
            max_lines: default_max_lines(),
        }
    }
}

/// Notification channels and triggers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub notify_tx_coins: bool,
    #[serde(default)]
    pub notify_xday_threshold: bool,
    #[serde(default)]
    pub notify_new_loans: bool,
    #[serde(default)]
    pub notify_caught_exception: bool,
}

/// Policy section of one currency. Unset fields inherit from `coin.default`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinPolicyConfig {
    pub min_daily_rate: Option<Decimal>,
    pub max_daily_rate: Option<Decimal>,
    pub min_loan_size: Option<Decimal>,
    /// -1 unlimited, 0 disabled, otherwise a cap
    pub max_active_amount: Option<Decimal>,
    pub max_to_lend: Option<Decimal>,
    pub max_percent_to_lend: Option<Decimal>,
    pub max_to_lend_rate: Option<Decimal>,
    pub strategy: Option<LendingStrategy>,
    pub spread_lend: Option<u32>,
    pub gap_mode: Option<GapMode>,
    pub gap_bottom: Option<Decimal>,
    pub gap_top: Option<Decimal>,
    pub frrdelta_min: Option<Decimal>,
    pub frrdelta_max: Option<Decimal>,
    pub xday_thresholds: Option<Vec<XdayThresholdConfig>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XdayThresholdConfig {
    /// Daily rate in percent
    pub rate: Decimal,
    pub days: u32,
}

// Default value functions
fn default_exchange() -> String {
    "simulated".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_sleep_active() -> u64 {
    60
}

fn default_sleep_inactive() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

fn default_settings_file() -> PathBuf {
    PathBuf::from("settings.json")
}

fn default_poll_interval() -> u64 {
    5
}

fn default_max_lines() -> usize {
    200
}
