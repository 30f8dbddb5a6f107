//! Income and expense transactions.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Database functions that keep goal totals in step with linked income
//! - Time range filtering, totals and per-category summaries
//! - View handlers for transaction-related web pages

mod core;
mod create_endpoint;
mod create_page;
mod delete_endpoint;
mod edit_endpoint;
mod edit_page;
mod form;
mod query;
mod range;
mod summary;
mod transactions_page;
mod view;

pub use core::{
    Transaction, TransactionBuilder, TransactionType, TransactionTypeError,
    create_transaction_table, get_transaction, insert_transaction, validate_amount,
};
pub use create_endpoint::create_transaction_endpoint;
pub use create_page::get_new_transaction_page;
pub use delete_endpoint::delete_transaction_endpoint;
pub use edit_endpoint::edit_transaction_endpoint;
pub use edit_page::get_edit_transaction_page;
pub use query::{TransactionFilter, TransactionRow, query_transactions};
pub use range::{DateBounds, RangeQuery, TimeRange};
pub use summary::{Totals, calculate_totals, category_summaries};
pub use transactions_page::get_transactions_page;
pub use view::{category_breakdown, totals_cards, transactions_table};

#[cfg(test)]
pub use core::create_transaction;
