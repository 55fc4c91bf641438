//! Ports the lending session depends on

mod advisor;
mod clock;
mod exchange;
mod status;

pub use advisor::{AdvisoryMethod, RateAdvisor};
pub use clock::Clock;
pub use exchange::LendingExchange;
pub use status::{Notifier, StatusSink};
