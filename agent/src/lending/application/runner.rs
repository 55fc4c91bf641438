//! Outer lending loop
//!
//! Runs one [`LendingSession`] tick at a time, turns failures into a sleep
//! (or a stop for fatal errors) and honours shutdown between ticks and
//! during sleeps. A tick always runs to completion; only the individual
//! exchange requests inside it time out.

use super::session::{LendingSession, TickReport};
use crate::error::{ErrorClass, LendingError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};

/// What the loop does after a tick
#[derive(Debug)]
pub enum TickVerdict {
    /// Sleep this long, then run the next tick
    Continue(Duration),
    /// Stop with this error
    Stop(LendingError),
}

pub struct LendingRunner {
    session: LendingSession,
    shutdown: Arc<AtomicBool>,
}

impl LendingRunner {
    pub fn new(session: LendingSession) -> Self {
        LendingRunner {
            session,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Setting the flag stops the loop before its next tick
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn session(&self) -> &LendingSession {
        &self.session
    }

    /// Run one tick and decide what happens next
    pub async fn run_once(&mut self) -> TickVerdict {
        match self.session.tick().await {
            Ok(report) => {
                log_report(&report);
                TickVerdict::Continue(report.sleep)
            }
            Err(e) => self.handle_error(e),
        }
    }

    fn handle_error(&self, err: LendingError) -> TickVerdict {
        let sleep = self.session.sleep_interval();
        match err.class() {
            ErrorClass::Fatal => {
                error!("Fatal error, stopping: {}", err);
                self.session.status().log_line(&format!("Stopping: {}", err));
                TickVerdict::Stop(err)
            }
            ErrorClass::RateLimited => {
                let backoff = self.session.settings().sleep_inactive;
                warn!("Rate limited by exchange, backing off for {:?}: {}", backoff, err);
                self.session.exchange().increase_request_spacing();
                TickVerdict::Continue(backoff)
            }
            ErrorClass::Transient => {
                warn!("Tick failed, retrying in {:?}: {}", sleep, err);
                self.session.status().log_line(&format!("Error: {}", err));
                TickVerdict::Continue(sleep)
            }
            ErrorClass::Unclassified => {
                error!(error = ?err, "Unexpected error during tick: {}", err);
                self.session.status().log_line(&format!("Unexpected error: {}", err));
                if self.session.settings().notify.caught_exception {
                    self.session
                        .notifier()
                        .notify(&format!("Lending bot caught an error: {}", err));
                }
                TickVerdict::Continue(sleep)
            }
        }
    }

    /// Loop until shutdown (Ctrl-C or the shutdown flag) or a fatal error
    pub async fn run(mut self) -> Result<(), LendingError> {
        info!(exchange = self.session.exchange().name(), "Lending loop started");
        let outcome = loop {
            if self.shutdown.load(Ordering::Relaxed) {
                break Ok(());
            }
            let sleep = match self.run_once().await {
                TickVerdict::Continue(sleep) => sleep,
                TickVerdict::Stop(err) => break Err(err),
            };
            tokio::select! {
                _ = tokio::time::sleep(sleep) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown requested");
                    break Ok(());
                }
            }
        };

        if let Err(e) = self.session.status().persist() {
            warn!("Failed to persist status on exit: {}", e);
        }
        info!("Lending loop stopped");
        outcome
    }
}

fn log_report(report: &TickReport) {
    if report.paused {
        return;
    }
    info!(
        transferred = report.transferred.len(),
        canceled = report.canceled.len(),
        placed = report.placed.len(),
        lendable = report.lendable.len(),
        restarts = report.depth_restarts,
        new_loans = report.new_loans,
        "Tick complete, next in {:?}",
        report.sleep
    );
}
