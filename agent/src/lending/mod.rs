//! Lending decision engine
//!
//! - **Domain**: pure decision logic (policies, depth discovery, order
//!   construction, rate decisions, minimum sizes, caps, durations)
//! - **Application**: the per-tick session, the outer runner and the ports
//!   they depend on
//! - **Infrastructure**: simulated exchange, status log, clocks, notifier

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::ports::{
    AdvisoryMethod, Clock, LendingExchange, Notifier, RateAdvisor, StatusSink,
};
pub use application::{
    LendingRunner, LendingSession, NotifySettings, SessionSettings, TickReport, TickVerdict,
};
pub use domain::{CoinPolicy, PolicyStore};
pub use infrastructure::{
    FixedClock, JsonStatusLog, SeedError, SimSeed, SimulatedExchange, SystemClock,
    TracingNotifier,
};
