use super::state::ControlState;
use crate::lending::domain::BiasRange;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to access settings file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse settings: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Persisted form of the control state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsRecord {
    #[serde(default)]
    pub lending_paused: bool,
    /// Bias override bounds in percent; the override applies only when both are set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frrdelta_min: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frrdelta_max: Option<Decimal>,
}

impl SettingsRecord {
    pub fn to_state(&self) -> ControlState {
        let bias_override = match (self.frrdelta_min, self.frrdelta_max) {
            (Some(min), Some(max)) => Some(BiasRange::new(min, max)),
            _ => None,
        };
        ControlState {
            paused: self.lending_paused,
            bias_override,
        }
    }

    pub fn from_state(state: &ControlState) -> Self {
        SettingsRecord {
            lending_paused: state.paused,
            frrdelta_min: state.bias_override.map(|b| b.min),
            frrdelta_max: state.bias_override.map(|b| b.max),
        }
    }
}

/// JSON file holding the [`SettingsRecord`]
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SettingsStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record; a missing file means default settings
    pub fn load(&self) -> Result<SettingsRecord, SettingsError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SettingsRecord::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, record: &SettingsRecord) -> Result<(), SettingsError> {
        let content = serde_json::to_string_pretty(record)?;
        // Readers of the file never see a partial write
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("lending-settings-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let store = SettingsStore::new(temp_path("missing"));
        let record = store.load().unwrap();
        assert_eq!(record, SettingsRecord::default());
        assert_eq!(record.to_state(), ControlState::default());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = temp_path("roundtrip");
        let store = SettingsStore::new(&path);
        let record = SettingsRecord {
            lending_paused: true,
            frrdelta_min: Some(dec!(-5)),
            frrdelta_max: Some(dec!(15)),
        };
        store.save(&record).unwrap();
        assert_eq!(store.load().unwrap(), record);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_half_set_override_is_ignored() {
        let record: SettingsRecord =
            serde_json::from_str(r#"{"lending_paused": false, "frrdelta_min": "2"}"#).unwrap();
        assert_eq!(record.to_state().bias_override, None);
    }
}
