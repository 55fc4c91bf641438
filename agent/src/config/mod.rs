//! JSON configuration of the lending agent
//!
//! ```json
//! {
//!   "api": { "exchange": "simulated", "all_currencies": ["BTC", "ETH"] },
//!   "bot": { "sleep_time_active_secs": 60, "sleep_time_inactive_secs": 300 },
//!   "coin": {
//!     "default": { "min_daily_rate": "0.005", "spread_lend": 3 },
//!     "BTC": { "strategy": "FRR", "frrdelta_min": "-5", "frrdelta_max": "5" }
//!   }
//! }
//! ```

pub mod loader;
pub mod types;

pub use loader::{
    ConfigError, DEFAULT_SECTION, load_config, load_config_from_str, load_default_config,
};
pub use types::{
    ApiConfig, BotConfig, CoinPolicyConfig, ControlConfig, LoopConfig, NotifyConfig,
    StatusConfig, XdayThresholdConfig,
};
