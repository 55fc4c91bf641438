mod book_level;
mod lent_summary;
mod loan_book;
mod offer;
mod ticker;

pub use book_level::BookLevel;
pub use lent_summary::LentSummary;
pub use loan_book::LoanBook;
pub use offer::{ActiveLoan, OpenOffer};
pub use ticker::{Ticker, TickerEntry};
