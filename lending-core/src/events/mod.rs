mod lending_events;

pub use lending_events::{LoanOfferCanceled, LoanOfferPlaced, TransferExecuted};
