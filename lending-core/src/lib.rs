pub mod entities;
pub mod events;
pub mod value_objects;

// Re-export value objects at crate root for convenience
pub use value_objects::{
    AMOUNT_DECIMALS, Currency, CurrencyError, OfferId, REFERENCE_CODE, Timestamp, Wallet,
    format_amount, format_rate_pct, truncate_amount,
};

// Re-export entities at crate root
pub use entities::{ActiveLoan, BookLevel, LentSummary, LoanBook, OpenOffer, Ticker, TickerEntry};

// Re-export events at crate root
pub use events::{LoanOfferCanceled, LoanOfferPlaced, TransferExecuted};
