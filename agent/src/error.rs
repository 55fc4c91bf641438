use chrono::NaiveDate;
use lending_core::Currency;
use thiserror::Error;

/// Errors reported by a lending exchange
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited: {0}")]
    RateLimited(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Unknown currency: {0}")]
    UnknownCurrency(Currency),
    #[error("Flash rate unavailable for {0}")]
    FlashRateUnavailable(Currency),
}

/// Errors that end a lending tick
#[derive(Error, Debug)]
pub enum LendingError {
    #[error(transparent)]
    Exchange(#[from] ExchangeError),
    #[error("End of service {end_date} reached ({days_left} day(s) left)")]
    EndOfService { end_date: NaiveDate, days_left: i64 },
    #[error("Failed to persist status: {0}")]
    Status(#[from] std::io::Error),
}

/// How the runner reacts to a failed tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Log, flush status and stop
    Fatal,
    /// Back off the exchange and sleep the inactive period
    RateLimited,
    /// Log and sleep normally
    Transient,
    /// Log full diagnostics, optionally notify, sleep normally
    Unclassified,
}

const FATAL_MARKERS: [&str; 3] = [
    "Invalid API key",
    "Nonce must be greater",
    "Permission denied",
];

impl LendingError {
    pub fn class(&self) -> ErrorClass {
        match self {
            LendingError::EndOfService { .. } => ErrorClass::Fatal,
            LendingError::Status(_) => ErrorClass::Unclassified,
            LendingError::Exchange(err) => err.class(),
        }
    }
}

impl ExchangeError {
    pub fn class(&self) -> ErrorClass {
        let message = self.to_string();
        if FATAL_MARKERS.iter().any(|m| message.contains(m)) {
            return ErrorClass::Fatal;
        }
        match self {
            ExchangeError::RateLimited(_) => ErrorClass::RateLimited,
            _ if message.contains("429") => ErrorClass::RateLimited,
            ExchangeError::Network(_) | ExchangeError::Timeout => ErrorClass::Transient,
            _ if message.contains("timed out") => ErrorClass::Transient,
            ExchangeError::Api(_) => ErrorClass::Transient,
            ExchangeError::UnknownCurrency(_) | ExchangeError::FlashRateUnavailable(_) => {
                ErrorClass::Unclassified
            }
        }
    }

    /// Message carried by an API rejection, if any
    pub fn api_message(&self) -> Option<&str> {
        match self {
            ExchangeError::Api(message) => Some(message),
            _ => None,
        }
    }
}
