mod amount;
mod currency;
mod wallet;

pub use amount::{AMOUNT_DECIMALS, format_amount, format_rate_pct, truncate_amount};
pub use currency::{Currency, CurrencyError, REFERENCE_CODE};
pub use wallet::Wallet;

pub type OfferId = u64;
pub type Timestamp = chrono::DateTime<chrono::Utc>;
