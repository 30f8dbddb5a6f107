//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    auth::UserID,
    category::resolve_category,
    database_id::{CategoryId, GoalId, TransactionId},
    db::with_transaction,
    goal::{adjust_goal_amount, get_goal},
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether money was earned or spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Income => "Income",
            Self::Expense => "Expense",
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A string that is neither `income` nor `expense`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionTypeError(pub String);

impl Display for TransactionTypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unrecognized transaction type \"{}\"", self.0)
    }
}

impl std::error::Error for TransactionTypeError {}

impl FromStr for TransactionType {
    type Err = TransactionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(TransactionTypeError(s.to_owned())),
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// Check that `amount` can be recorded as a sum of money.
///
/// # Errors
/// Returns [Error::InvalidAmount] if `amount` is not a finite number greater than zero.
pub fn validate_amount(amount: f64) -> Result<f64, Error> {
    if amount.is_finite() && amount > 0.0 {
        Ok(amount)
    } else {
        Err(Error::InvalidAmount(amount.to_string()))
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The user that recorded the transaction.
    pub user_id: UserID,
    pub transaction_type: TransactionType,
    /// The amount of money spent or earned, always greater than zero.
    pub amount: f64,
    /// The ID of the category the transaction belongs to.
    pub category_id: CategoryId,
    /// A text description of what the transaction was for.
    pub description: String,
    /// When the transaction happened.
    pub date: Date,
    /// The savings goal that income from this transaction counts towards.
    pub goal_id: Option<GoalId>,
    /// When the transaction was recorded.
    pub created_at: OffsetDateTime,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(transaction_type: TransactionType, amount: f64, date: Date) -> TransactionBuilder {
        TransactionBuilder {
            transaction_type,
            amount,
            date,
            description: String::new(),
            category_id: None,
            goal_id: None,
        }
    }

    /// How much this transaction adds to its goal, if it has one.
    ///
    /// Only income counts towards a goal.
    pub fn goal_contribution(&self) -> Option<(GoalId, f64)> {
        match (self.transaction_type, self.goal_id) {
            (TransactionType::Income, Some(goal_id)) => Some((goal_id, self.amount)),
            _ => None,
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// ```ignore
/// use time::macros::date;
///
/// use crate::transaction::{Transaction, TransactionType};
///
/// let builder = Transaction::build(TransactionType::Income, 2500.0, date!(2025-01-15))
///     .description("Salary")
///     .goal(Some(3));
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub date: Date,
    pub description: String,
    /// `None` files the transaction under the default "Other" category of its type.
    pub category_id: Option<CategoryId>,
    pub goal_id: Option<GoalId>,
}

impl TransactionBuilder {
    /// Set the description for the transaction.
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.trim().to_owned();
        self
    }

    /// Set the category for the transaction.
    pub fn category(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Set the goal for the transaction.
    pub fn goal(mut self, goal_id: Option<GoalId>) -> Self {
        self.goal_id = goal_id;
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const TRANSACTION_COLUMNS: &str =
    "id, user_id, type, amount, category_id, description, date, goal_id, created_at";

/// Insert a transaction row exactly as given.
///
/// This does not touch goal totals and does not validate the amount, see
/// [create_transaction] for the full operation.
///
/// # Errors
/// Returns [Error::InvalidCategory] if `category_id` does not exist and
/// [Error::SqlError] for any other SQL error.
pub fn insert_transaction(
    user_id: UserID,
    builder: &TransactionBuilder,
    category_id: CategoryId,
    created_at: OffsetDateTime,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(&format!(
            "INSERT INTO \"transaction\"
                (user_id, type, amount, category_id, description, date, goal_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                user_id,
                builder.transaction_type,
                builder.amount,
                category_id,
                &builder.description,
                builder.date,
                builder.goal_id,
                created_at,
            ),
            map_transaction_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidCategory(Some(category_id)),
            error => error.into(),
        })
}

/// Check the amount, category and goal of `builder` against the user's data.
///
/// Returns the category the transaction should be filed under.
fn validate_builder(
    user_id: UserID,
    builder: &TransactionBuilder,
    connection: &Connection,
) -> Result<CategoryId, Error> {
    validate_amount(builder.amount)?;

    if let Some(goal_id) = builder.goal_id {
        get_goal(goal_id, user_id, connection).map_err(|error| match error {
            Error::NotFound => Error::InvalidGoal(Some(goal_id)),
            error => error,
        })?;
    }

    resolve_category(
        user_id,
        builder.category_id,
        builder.transaction_type,
        connection,
    )
}

/// Record a new transaction for `user_id`.
///
/// Income linked to a goal adds its amount to the goal in the same SQL
/// transaction as the insert.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if the amount is not greater than zero,
/// - [Error::InvalidCategory] or [Error::InvalidGoal] if a reference does not belong to the user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    user_id: UserID,
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    with_transaction(connection, |connection| {
        let category_id = validate_builder(user_id, &builder, connection)?;
        let transaction = insert_transaction(
            user_id,
            &builder,
            category_id,
            OffsetDateTime::now_utc(),
            connection,
        )?;

        if let Some((goal_id, amount)) = transaction.goal_contribution() {
            adjust_goal_amount(goal_id, amount, connection)?;
        }

        Ok(transaction)
    })
}

/// Retrieve one of the user's transactions by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction owned by `user_id`,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = ?1 AND user_id = ?2"
        ))?
        .query_row((id, user_id), map_transaction_row)?;

    Ok(transaction)
}

/// Replace the details of one of the user's transactions.
///
/// The old goal contribution is taken back before the new one is added, so
/// moving income between goals or changing its amount keeps both goals right.
///
/// # Errors
/// Returns [Error::UpdateMissingTransaction] if the transaction does not exist,
/// otherwise the same errors as [create_transaction].
pub fn update_transaction(
    id: TransactionId,
    user_id: UserID,
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    with_transaction(connection, |connection| {
        let old = get_transaction(id, user_id, connection).map_err(|error| match error {
            Error::NotFound => Error::UpdateMissingTransaction,
            error => error,
        })?;
        let category_id = validate_builder(user_id, &builder, connection)?;

        if let Some((goal_id, amount)) = old.goal_contribution() {
            adjust_goal_amount(goal_id, -amount, connection)?;
        }

        let updated = connection
            .prepare(&format!(
                "UPDATE \"transaction\"
                 SET type = ?1, amount = ?2, category_id = ?3, description = ?4, date = ?5,
                    goal_id = ?6
                 WHERE id = ?7 AND user_id = ?8
                 RETURNING {TRANSACTION_COLUMNS}"
            ))?
            .query_row(
                (
                    builder.transaction_type,
                    builder.amount,
                    category_id,
                    &builder.description,
                    builder.date,
                    builder.goal_id,
                    id,
                    user_id,
                ),
                map_transaction_row,
            )?;

        if let Some((goal_id, amount)) = updated.goal_contribution() {
            adjust_goal_amount(goal_id, amount, connection)?;
        }

        Ok(updated)
    })
}

/// Delete one of the user's transactions, taking back its goal contribution.
///
/// # Errors
/// Returns [Error::DeleteMissingTransaction] if the transaction does not exist
/// and [Error::SqlError] for any other SQL error.
pub fn delete_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    with_transaction(connection, |connection| {
        let transaction =
            get_transaction(id, user_id, connection).map_err(|error| match error {
                Error::NotFound => Error::DeleteMissingTransaction,
                error => error,
            })?;

        if let Some((goal_id, amount)) = transaction.goal_contribution() {
            adjust_goal_amount(goal_id, -amount, connection)?;
        }

        connection.execute(
            "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
            (id, user_id),
        )?;

        Ok(())
    })
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            type TEXT NOT NULL CHECK (type IN ('income', 'expense')),
            amount REAL NOT NULL,
            category_id INTEGER NOT NULL,
            description TEXT NOT NULL,
            date TEXT NOT NULL,
            goal_id INTEGER,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES category(id),
            FOREIGN KEY(goal_id) REFERENCES goal(id) ON DELETE SET NULL
        );

        CREATE INDEX IF NOT EXISTS idx_transaction_user_date ON \"transaction\"(user_id, date);",
    )
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        transaction_type: row.get(2)?,
        amount: row.get(3)?,
        category_id: row.get(4)?,
        description: row.get(5)?,
        date: row.get(6)?,
        goal_id: row.get(7)?,
        created_at: row.get(8)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod transaction_type_tests {
    use super::{TransactionType, TransactionTypeError};

    #[test]
    fn parses_known_types() {
        assert_eq!("income".parse(), Ok(TransactionType::Income));
        assert_eq!(" Expense ".parse(), Ok(TransactionType::Expense));
    }

    #[test]
    fn rejects_unknown_types() {
        assert_eq!(
            "transfer".parse::<TransactionType>(),
            Err(TransactionTypeError("transfer".to_owned()))
        );
    }
}
