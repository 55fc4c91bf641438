use crate::lending::application::ports::Notifier;
use tracing::info;

/// Sends notifications to the log when at least one channel is configured
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier {
    channels: Vec<String>,
}

impl TracingNotifier {
    pub fn new(channels: Vec<String>) -> Self {
        TracingNotifier { channels }
    }

    pub fn is_enabled(&self) -> bool {
        !self.channels.is_empty()
    }
}

impl Notifier for TracingNotifier {
    fn notify(&self, text: &str) {
        if !self.is_enabled() {
            return;
        }
        for channel in &self.channels {
            info!(target: "lending_agent::notify", channel = %channel, "{}", text);
        }
    }
}
