//! Reports summarise the transactions in a period and can be downloaded as CSV.
//!
//! Reports are a paid feature, see [crate::subscription::subscription_guard].

mod core;
mod export;
mod reports_page;

pub use export::get_report_export;
pub use reports_page::get_reports_page;
