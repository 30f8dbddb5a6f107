//! Queries for listing transactions alongside their category.

use rusqlite::Connection;

use crate::{Error, auth::UserID};

use super::{
    core::{Transaction, TransactionType, map_transaction_row},
    range::DateBounds,
};

/// A transaction with the details of its category for display.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRow {
    pub transaction: Transaction,
    pub category_name: String,
    pub category_color: String,
}

/// Which transactions to return. The default returns all of them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransactionFilter {
    pub bounds: Option<DateBounds>,
    pub transaction_type: Option<TransactionType>,
}

/// Get the user's transactions matching `filter`, newest first.
///
/// Transactions on the same day are ordered by when they were recorded so the
/// order stays stable after edits.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails or a row cannot be mapped.
pub fn query_transactions(
    user_id: UserID,
    filter: TransactionFilter,
    connection: &Connection,
) -> Result<Vec<TransactionRow>, Error> {
    let (start, end) = match filter.bounds {
        Some(DateBounds { start, end }) => (Some(start), Some(end)),
        None => (None, None),
    };

    connection
        .prepare(
            "SELECT t.id, t.user_id, t.type, t.amount, t.category_id, t.description, t.date,
                t.goal_id, t.created_at, category.name, category.color
             FROM \"transaction\" t
             INNER JOIN category ON t.category_id = category.id
             WHERE t.user_id = ?1
                AND (?2 IS NULL OR t.date >= ?2)
                AND (?3 IS NULL OR t.date <= ?3)
                AND (?4 IS NULL OR t.type = ?4)
             ORDER BY t.date DESC, t.id DESC",
        )?
        .query_map((user_id, start, end, filter.transaction_type), |row| {
            Ok(TransactionRow {
                transaction: map_transaction_row(row)?,
                category_name: row.get(9)?,
                category_color: row.get(10)?,
            })
        })?
        .map(|maybe_row| maybe_row.map_err(Error::from))
        .collect()
}
