pub mod ports;
pub mod runner;
pub mod session;

pub use runner::{LendingRunner, TickVerdict};
pub use session::{
    COMPETE_RATE, LendingSession, NotifySettings, SessionSettings, TickReport, UNDERCUT_STEP,
    UNDERCUT_THRESHOLD, undercut,
};
