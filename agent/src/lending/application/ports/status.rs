use lending_core::Currency;

/// Operator-facing status: a line log plus per-currency values
pub trait StatusSink: Send + Sync {
    fn log_line(&self, line: &str);

    fn update_value(&self, currency: &Currency, key: &str, value: String);

    /// Write the current status wherever it is kept
    fn persist(&self) -> std::io::Result<()>;
}

/// Operator notifications (new loans, transfers, caught errors)
pub trait Notifier: Send + Sync {
    fn notify(&self, text: &str);
}
