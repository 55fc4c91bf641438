use chrono::NaiveDate;
use lending_core::Timestamp;

/// Time source of the lending session
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    fn name(&self) -> &'static str;
}
