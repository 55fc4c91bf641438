mod clock;
mod notifier;
mod sim_exchange;
mod status_log;

pub use clock::{FixedClock, SystemClock};
pub use notifier::TracingNotifier;
pub use sim_exchange::{SeedError, SimSeed, SimulatedExchange};
pub use status_log::JsonStatusLog;
