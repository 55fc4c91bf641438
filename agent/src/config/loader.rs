use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::types::{BotConfig, CoinPolicyConfig};
use crate::lending::application::{NotifySettings, SessionSettings};
use crate::lending::domain::{
    ActiveLimit, BiasRange, CoinPolicy, DurationThreshold, MAX_SPREAD, MIN_SPREAD, PolicyStore,
};
use lending_core::{Currency, CurrencyError};
use rust_decimal::Decimal;

/// Name of the policy section every currency inherits from
pub const DEFAULT_SECTION: &str = "default";
const ALL_CURRENCIES: &str = "ALL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Invalid currency in config: {0}")]
    InvalidCurrency(#[from] CurrencyError),
    #[error("Invalid policy for {section}: {reason}")]
    InvalidPolicy { section: String, reason: String },
    #[error("Invalid setting {field}: {reason}")]
    InvalidSetting { field: &'static str, reason: String },
    #[error("Unsupported exchange: {0}")]
    UnsupportedExchange(String),
}

/// Load bot configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<BotConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: BotConfig = serde_json::from_str(&content)?;
    Ok(config)
}

/// Load configuration from a JSON string
pub fn load_config_from_str(json: &str) -> Result<BotConfig, ConfigError> {
    let config: BotConfig = serde_json::from_str(json)?;
    Ok(config)
}

/// Load the default embedded configuration
pub fn load_default_config() -> Result<BotConfig, ConfigError> {
    let default_config = include_str!("default_config.json");
    load_config_from_str(default_config)
}

impl CoinPolicyConfig {
    /// Fields set in `specific` replace ours
    pub fn override_with(&self, specific: &CoinPolicyConfig) -> CoinPolicyConfig {
        CoinPolicyConfig {
            min_daily_rate: specific.min_daily_rate.or(self.min_daily_rate),
            max_daily_rate: specific.max_daily_rate.or(self.max_daily_rate),
            min_loan_size: specific.min_loan_size.or(self.min_loan_size),
            max_active_amount: specific.max_active_amount.or(self.max_active_amount),
            max_to_lend: specific.max_to_lend.or(self.max_to_lend),
            max_percent_to_lend: specific.max_percent_to_lend.or(self.max_percent_to_lend),
            max_to_lend_rate: specific.max_to_lend_rate.or(self.max_to_lend_rate),
            strategy: specific.strategy.or(self.strategy),
            spread_lend: specific.spread_lend.or(self.spread_lend),
            gap_mode: specific.gap_mode.or(self.gap_mode),
            gap_bottom: specific.gap_bottom.or(self.gap_bottom),
            gap_top: specific.gap_top.or(self.gap_top),
            frrdelta_min: specific.frrdelta_min.or(self.frrdelta_min),
            frrdelta_max: specific.frrdelta_max.or(self.frrdelta_max),
            xday_thresholds: specific
                .xday_thresholds
                .clone()
                .or_else(|| self.xday_thresholds.clone()),
        }
    }

    /// Build the in-memory policy: percent rates become fractions, unset
    /// fields take built-in defaults and the result is validated
    pub fn resolve(&self, section: &str) -> Result<CoinPolicy, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidPolicy {
            section: section.to_string(),
            reason,
        };
        let base = CoinPolicy::default();
        let fraction = |pct: Decimal| pct / Decimal::ONE_HUNDRED;

        let gap_bottom = self.gap_bottom.unwrap_or(base.gap_bottom);
        let mut duration_thresholds: Vec<DurationThreshold> = self
            .xday_thresholds
            .iter()
            .flatten()
            .map(|t| DurationThreshold {
                rate: fraction(t.rate),
                days: t.days,
            })
            .collect();
        duration_thresholds.sort_by(|a, b| a.rate.cmp(&b.rate));

        let policy = CoinPolicy {
            min_daily_rate: self.min_daily_rate.map(fraction).unwrap_or(base.min_daily_rate),
            max_daily_rate: self.max_daily_rate.map(fraction).unwrap_or(base.max_daily_rate),
            min_loan_size: self.min_loan_size.unwrap_or(base.min_loan_size),
            max_active: self
                .max_active_amount
                .map(ActiveLimit::from_amount)
                .unwrap_or(base.max_active),
            max_to_lend: self.max_to_lend.unwrap_or(base.max_to_lend),
            max_percent_to_lend: self
                .max_percent_to_lend
                .map(fraction)
                .unwrap_or(base.max_percent_to_lend),
            max_to_lend_rate: self
                .max_to_lend_rate
                .map(fraction)
                .unwrap_or(base.max_to_lend_rate),
            strategy: self.strategy.unwrap_or(base.strategy),
            spread: self.spread_lend.unwrap_or(base.spread),
            gap_mode: self.gap_mode.unwrap_or(base.gap_mode),
            gap_bottom,
            gap_top: self.gap_top.unwrap_or(gap_bottom),
            bias: BiasRange::new(
                self.frrdelta_min.unwrap_or(base.bias.min),
                self.frrdelta_max.unwrap_or(base.bias.max),
            ),
            duration_thresholds,
        };

        if policy.min_daily_rate > policy.max_daily_rate {
            return Err(invalid(format!(
                "min_daily_rate {} is above max_daily_rate {}",
                policy.min_daily_rate, policy.max_daily_rate
            )));
        }
        if policy.min_daily_rate.is_sign_negative() {
            return Err(invalid("min_daily_rate must not be negative".to_string()));
        }
        if !(MIN_SPREAD..=MAX_SPREAD).contains(&policy.spread) {
            return Err(invalid(format!(
                "spread_lend {} outside {}..={}",
                policy.spread, MIN_SPREAD, MAX_SPREAD
            )));
        }
        if policy.min_loan_size.is_sign_negative() {
            return Err(invalid("min_loan_size must not be negative".to_string()));
        }
        if policy.max_percent_to_lend < Decimal::ZERO || policy.max_percent_to_lend > Decimal::ONE
        {
            return Err(invalid("max_percent_to_lend must be within 0..=100".to_string()));
        }
        if policy.gap_bottom.is_sign_negative() || policy.gap_top.is_sign_negative() {
            return Err(invalid("gap targets must not be negative".to_string()));
        }
        Ok(policy)
    }
}

impl BotConfig {
    /// Currencies named in `api.all_currencies`
    pub fn all_currencies(&self) -> Result<Vec<Currency>, ConfigError> {
        self.api
            .all_currencies
            .iter()
            .map(|c| Currency::new(c).map_err(ConfigError::from))
            .collect()
    }

    /// Merge `coin.default` into every currency section and resolve them
    pub fn policy_store(&self) -> Result<PolicyStore, ConfigError> {
        let default_config = self.coin.get(DEFAULT_SECTION).cloned().unwrap_or_default();
        let default_policy = default_config.resolve(DEFAULT_SECTION)?;

        let mut coins = HashMap::new();
        for (section, specific) in &self.coin {
            if section == DEFAULT_SECTION {
                continue;
            }
            let currency = Currency::new(section)?;
            let policy = default_config.override_with(specific).resolve(section)?;
            coins.insert(currency, policy);
        }

        Ok(PolicyStore::new(default_policy, coins, self.all_currencies()?))
    }

    pub fn transfer_currencies(&self) -> Result<Vec<Currency>, ConfigError> {
        let mut currencies = Vec::new();
        for entry in &self.bot.transfer_currencies {
            if entry.eq_ignore_ascii_case(ALL_CURRENCIES) {
                currencies.extend(self.all_currencies()?);
            } else {
                currencies.push(Currency::new(entry)?);
            }
        }
        currencies.sort();
        currencies.dedup();
        Ok(currencies)
    }

    pub fn session_settings(&self) -> Result<SessionSettings, ConfigError> {
        Ok(SessionSettings {
            sleep_active: Duration::from_secs(self.bot.sleep_time_active_secs),
            sleep_inactive: Duration::from_secs(self.bot.sleep_time_inactive_secs),
            transfer_currencies: self.transfer_currencies()?,
            keep_stuck_orders: self.bot.keep_stuck_orders,
            hide_coins: self.bot.hide_coins,
            auto_renew: self.bot.auto_renew,
            dry_run: self.bot.dry_run,
            end_date: self.bot.end_date,
            reference_currency: Currency::reference(),
            advisory_method: self.bot.advisory_method,
            notify: NotifySettings {
                tx_coins: self.notify.notify_tx_coins,
                xday_threshold: self.notify.notify_xday_threshold,
                new_loans: self.notify.notify_new_loans,
                caught_exception: self.notify.notify_caught_exception,
            },
            request_timeout: self.api.request_timeout(),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.exchange != "simulated" {
            return Err(ConfigError::UnsupportedExchange(self.api.exchange.clone()));
        }
        if self.api.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "api.request_timeout_secs",
                reason: "must be positive".to_string(),
            });
        }
        if self.bot.sleep_time_active_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "bot.sleep_time_active_secs",
                reason: "must be positive".to_string(),
            });
        }
        if self.bot.sleep_time_inactive_secs < self.bot.sleep_time_active_secs {
            return Err(ConfigError::InvalidSetting {
                field: "bot.sleep_time_inactive_secs",
                reason: "must not be shorter than the active sleep time".to_string(),
            });
        }
        self.policy_store()?;
        self.transfer_currencies()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lending::domain::{GapMode, LendingStrategy};
    use rust_decimal_macros::dec;

    fn cur(code: &str) -> Currency {
        Currency::new(code).unwrap()
    }

    #[test]
    fn test_load_default_config() {
        let config = load_default_config().unwrap();
        config.validate().unwrap();
        assert_eq!(config.api.exchange, "simulated");
        assert!(!config.api.all_currencies.is_empty());
    }

    #[test]
    fn test_default_policies_are_fractions() {
        let store = load_default_config().unwrap().policy_store().unwrap();
        let eth = store.policy(&cur("ETH"));
        assert_eq!(eth.min_daily_rate, dec!(0.00005));
        assert_eq!(eth.max_daily_rate, dec!(0.05));
        assert_eq!(eth.duration_thresholds[0].rate, dec!(0.0005));
        assert_eq!(eth.duration_thresholds[0].days, 20);
        assert!(store.policy(&cur("XMR")).is_disabled());
    }

    #[test]
    fn test_override_replaces_only_set_fields() {
        let store = load_default_config().unwrap().policy_store().unwrap();
        let btc = store.policy(&cur("BTC"));
        assert_eq!(btc.min_daily_rate, dec!(0.00008));
        assert_eq!(btc.spread, 4);
        assert_eq!(btc.gap_mode, GapMode::RawReference);
        assert_eq!(btc.max_daily_rate, dec!(0.05));
        assert_eq!(btc.strategy, LendingStrategy::Spread);
        assert_eq!(btc.duration_thresholds.len(), 5);
    }

    #[test]
    fn test_gap_top_defaults_to_gap_bottom() {
        let config = CoinPolicyConfig {
            gap_bottom: Some(dec!(40)),
            ..CoinPolicyConfig::default()
        };
        let policy = config.resolve("ETH").unwrap();
        assert_eq!(policy.gap_top, dec!(40));
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        let config = CoinPolicyConfig {
            min_daily_rate: Some(dec!(2)),
            max_daily_rate: Some(dec!(1)),
            ..CoinPolicyConfig::default()
        };
        assert!(matches!(
            config.resolve("BTC"),
            Err(ConfigError::InvalidPolicy { .. })
        ));

        let config = CoinPolicyConfig {
            spread_lend: Some(21),
            ..CoinPolicyConfig::default()
        };
        assert!(config.resolve("BTC").is_err());
        let config = CoinPolicyConfig {
            spread_lend: Some(0),
            ..CoinPolicyConfig::default()
        };
        assert!(config.resolve("BTC").is_err());
    }

    #[test]
    fn test_tracked_currencies() {
        let json = r#"{
            "api": {"all_currencies": ["ETH"]},
            "coin": {"default": {}, "ltc": {"spread_lend": 2}}
        }"#;
        let store = load_config_from_str(json).unwrap().policy_store().unwrap();
        assert!(store.tracks(&cur("ETH")));
        assert!(store.tracks(&cur("LTC")));
        assert!(!store.tracks(&cur("BTC")));
        assert_eq!(store.policy(&cur("LTC")).spread, 2);
    }

    #[test]
    fn test_transfer_all_expands() {
        let json = r#"{
            "api": {"all_currencies": ["ETH", "BTC"]},
            "bot": {"transfer_currencies": ["all", "btc"]}
        }"#;
        let config = load_config_from_str(json).unwrap();
        assert_eq!(config.transfer_currencies().unwrap(), vec![cur("BTC"), cur("ETH")]);
    }

    #[test]
    fn test_unsupported_exchange() {
        let config = load_config_from_str(r#"{"api": {"exchange": "poloniex"}}"#).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnsupportedExchange(_))
        ));
    }

    #[test]
    fn test_end_date_parsed() {
        let config = load_config_from_str(r#"{"bot": {"end_date": "2026-12-31"}}"#).unwrap();
        let settings = config.session_settings().unwrap();
        assert_eq!(
            settings.end_date,
            chrono::NaiveDate::from_ymd_opt(2026, 12, 31)
        );
    }
}
