//! Scheduled transactions: bills and paychecks that are due on a date and
//! may repeat.
//!
//! A scheduled transaction is pending until it is paid with [mark_paid],
//! which records a real transaction and, for repeating ones, schedules the
//! next occurrence. Whether a pending one is overdue or due soon is derived
//! from the current date by [derive_display_status] and never stored.

mod core;
mod create;
mod delete;
mod edit;
mod engine;
mod form;
mod pay;
mod recurrence;
mod schedule_page;
mod status;
mod store;
mod view;

pub use core::{
    ObligationStatus, ScheduledObligation, create_scheduled_transaction_table,
    get_upcoming_obligations,
};
pub use create::{create_scheduled_endpoint, get_new_scheduled_page};
pub use delete::delete_scheduled_endpoint;
pub use edit::{get_edit_scheduled_page, update_scheduled_endpoint};
pub use engine::{PaymentOutcome, ScheduleError, mark_paid};
pub use pay::pay_scheduled_endpoint;
pub use recurrence::{Recurrence, RecurrenceError};
pub use schedule_page::get_schedule_page;
pub use status::{DUE_SOON_DAYS, DisplayStatus, derive_display_status};
pub use store::LedgerStore;
pub use view::obligations_table;

#[cfg(test)]
pub use core::{NewObligation, create_obligation};
