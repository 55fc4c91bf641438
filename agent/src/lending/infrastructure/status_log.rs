use crate::lending::application::ports::{Clock, StatusSink};
use lending_core::Currency;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Default, Serialize)]
struct StatusState {
    last_update: String,
    log: VecDeque<String>,
    values: BTreeMap<String, BTreeMap<String, String>>,
}

/// Status lines and per-currency values, persisted as a JSON document
///
/// Keeps the newest `max_lines` lines; `persist` is a no-op without a path.
pub struct JsonStatusLog {
    state: Mutex<StatusState>,
    max_lines: usize,
    path: Option<PathBuf>,
    clock: Arc<dyn Clock>,
}

impl JsonStatusLog {
    pub fn new(max_lines: usize, path: Option<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        JsonStatusLog {
            state: Mutex::new(StatusState::default()),
            max_lines: max_lines.max(1),
            path,
            clock,
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.state.lock().log.iter().cloned().collect()
    }

    pub fn value(&self, currency: &Currency, key: &str) -> Option<String> {
        self.state
            .lock()
            .values
            .get(currency.as_str())
            .and_then(|values| values.get(key))
            .cloned()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&*self.state.lock())
    }
}

impl StatusSink for JsonStatusLog {
    fn log_line(&self, line: &str) {
        let stamp = self.clock.now().format("%Y-%m-%d %H:%M:%S");
        let mut state = self.state.lock();
        state.log.push_back(format!("{} {}", stamp, line));
        while state.log.len() > self.max_lines {
            state.log.pop_front();
        }
    }

    fn update_value(&self, currency: &Currency, key: &str, value: String) {
        self.state
            .lock()
            .values
            .entry(currency.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    fn persist(&self) -> std::io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = {
            let mut state = self.state.lock();
            state.last_update = self.clock.now().to_rfc3339();
            serde_json::to_string_pretty(&*state)?
        };
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lending::infrastructure::FixedClock;
    use chrono::{TimeZone, Utc};

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap(),
        ))
    }

    #[test]
    fn test_ring_buffer_keeps_newest_lines() {
        let log = JsonStatusLog::new(2, None, clock());
        log.log_line("one");
        log.log_line("two");
        log.log_line("three");
        assert_eq!(
            log.lines(),
            vec!["2026-03-01 08:30:00 two", "2026-03-01 08:30:00 three"]
        );
    }

    #[test]
    fn test_values_and_persist() {
        let path = std::env::temp_dir().join(format!("lending-status-{}.json", std::process::id()));
        let log = JsonStatusLog::new(10, Some(path.clone()), clock());
        let btc = Currency::new("BTC").unwrap();
        log.update_value(&btc, "maxToLend", "1.5".to_string());
        assert_eq!(log.value(&btc, "maxToLend").as_deref(), Some("1.5"));

        log.persist().unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["values"]["BTC"]["maxToLend"], "1.5");
        assert_eq!(written["last_update"], "2026-03-01T08:30:00+00:00");
        std::fs::remove_file(path).unwrap();
    }
}
