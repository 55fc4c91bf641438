use super::settings::{SettingsError, SettingsRecord, SettingsStore};
use super::state::{ControlHandle, ControlState};
use crate::lending::domain::BiasRange;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Connects the operator's persisted settings with the lending loop's
/// control snapshot
#[derive(Debug, Clone)]
pub struct ControlSurfaceBridge {
    handle: ControlHandle,
    store: SettingsStore,
}

impl ControlSurfaceBridge {
    /// Load the persisted settings and publish them as the initial snapshot
    pub fn open(store: SettingsStore) -> Result<Self, SettingsError> {
        let record = store.load()?;
        Ok(ControlSurfaceBridge {
            handle: ControlHandle::new(record.to_state()),
            store,
        })
    }

    /// Handle the lending loop reads from
    pub fn handle(&self) -> ControlHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> ControlState {
        self.handle.load()
    }

    pub fn pause(&self) -> Result<ControlState, SettingsError> {
        self.apply(|s| s.paused = true)
    }

    pub fn resume(&self) -> Result<ControlState, SettingsError> {
        self.apply(|s| s.paused = false)
    }

    /// Set (or clear with `None`) the flash-rate bias override
    pub fn set_bias_override(
        &self,
        range: Option<BiasRange>,
    ) -> Result<ControlState, SettingsError> {
        let range = range.map(BiasRange::normalized);
        self.apply(|s| s.bias_override = range)
    }

    /// Re-read the settings file and publish it if it changed
    pub fn refresh(&self) -> Result<bool, SettingsError> {
        let next = self.store.load()?.to_state();
        if next == self.handle.load() {
            return Ok(false);
        }
        info!(
            path = %self.store.path().display(),
            paused = next.paused,
            bias = ?next.bias_override,
            "Control settings changed"
        );
        self.handle.store(next);
        Ok(true)
    }

    /// Poll the settings file every `interval` until the task is aborted
    pub fn spawn_watcher(&self, interval: Duration) -> JoinHandle<()> {
        let bridge = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = bridge.refresh() {
                    warn!(path = %bridge.store.path().display(), "Failed to reload control settings: {}", e);
                }
            }
        })
    }

    fn apply(&self, f: impl Fn(&mut ControlState)) -> Result<ControlState, SettingsError> {
        let next = self.handle.update(f);
        self.store.save(&SettingsRecord::from_state(&next))?;
        Ok(next)
    }
}
