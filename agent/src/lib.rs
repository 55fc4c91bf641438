pub mod config;
pub mod control;
pub mod error;
pub mod lending;

pub use error::{ErrorClass, ExchangeError, LendingError};
