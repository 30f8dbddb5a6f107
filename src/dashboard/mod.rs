//! The dashboard: this month's totals, what is due soon, goal progress and
//! a month by month summary.

mod aggregation;
mod handlers;
mod tables;

pub use handlers::get_dashboard_page;
