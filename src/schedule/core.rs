//! Scheduled transactions and the SQL that stores them.

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    auth::UserID,
    category::resolve_category,
    database_id::{CategoryId, GoalId, ObligationId},
    goal::get_goal,
    transaction::{TransactionType, validate_amount},
};

use super::recurrence::Recurrence;

/// Whether a scheduled transaction has been paid. Paid is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObligationStatus {
    Pending,
    Paid,
}

impl ObligationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }
}

impl ToSql for ObligationStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ObligationStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            other => Err(FromSqlError::Other(
                format!("unrecognized scheduled transaction status \"{other}\"").into(),
            )),
        }
    }
}

/// A promise to record an income or expense on or after a given date.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledObligation {
    pub id: ObligationId,
    /// The user the obligation belongs to.
    pub user_id: UserID,
    pub transaction_type: TransactionType,
    /// The expected amount, always greater than zero.
    pub amount: f64,
    /// `None` means the default "Other" category of the transaction type.
    pub category_id: Option<CategoryId>,
    pub description: String,
    /// The date originally chosen for this occurrence.
    pub scheduled_date: Date,
    pub recurrence: Recurrence,
    /// The savings goal that paid income counts towards.
    pub goal_id: Option<GoalId>,
    pub status: ObligationStatus,
    /// When the obligation was paid.
    pub paid_date: Option<OffsetDateTime>,
    /// The amount actually paid, which may differ from `amount`.
    pub paid_amount: Option<f64>,
    pub last_execution_date: Option<OffsetDateTime>,
    /// The date the obligation is due, set to the scheduled date on creation.
    pub next_execution_date: Option<Date>,
}

impl ScheduledObligation {
    /// The date the obligation is due, which the next rollover is counted from.
    pub fn due_date(&self) -> Date {
        self.next_execution_date.unwrap_or(self.scheduled_date)
    }
}

/// A scheduled transaction that has not been saved yet.
///
/// Use [NewObligation::new] to validate user input.
#[derive(Debug, Clone, PartialEq)]
pub struct NewObligation {
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub category_id: Option<CategoryId>,
    pub description: String,
    pub scheduled_date: Date,
    pub recurrence: Recurrence,
    pub goal_id: Option<GoalId>,
}

impl NewObligation {
    /// # Errors
    /// Returns [Error::InvalidAmount] if `amount` is not a finite number greater than zero.
    pub fn new(
        transaction_type: TransactionType,
        amount: f64,
        scheduled_date: Date,
        recurrence: Recurrence,
    ) -> Result<Self, Error> {
        Ok(Self {
            transaction_type,
            amount: validate_amount(amount)?,
            category_id: None,
            description: String::new(),
            scheduled_date,
            recurrence,
            goal_id: None,
        })
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.trim().to_owned();
        self
    }

    pub fn category(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    pub fn goal(mut self, goal_id: Option<GoalId>) -> Self {
        self.goal_id = goal_id;
        self
    }

    /// The occurrence that follows `obligation`, due on `next_date`.
    pub fn next_occurrence(obligation: &ScheduledObligation, next_date: Date) -> Self {
        Self {
            transaction_type: obligation.transaction_type,
            amount: obligation.amount,
            category_id: obligation.category_id,
            description: obligation.description.clone(),
            scheduled_date: next_date,
            recurrence: obligation.recurrence,
            goal_id: obligation.goal_id,
        }
    }
}

const OBLIGATION_COLUMNS: &str = "id, user_id, type, amount, category_id, description, \
    scheduled_date, recurrence, goal_id, status, paid_date, paid_amount, last_execution_date, \
    next_execution_date";

/// Check that the category and goal of `obligation` are available to the user.
fn validate_references(
    user_id: UserID,
    obligation: &NewObligation,
    connection: &Connection,
) -> Result<(), Error> {
    if obligation.category_id.is_some() {
        resolve_category(
            user_id,
            obligation.category_id,
            obligation.transaction_type,
            connection,
        )?;
    }

    if let Some(goal_id) = obligation.goal_id {
        get_goal(goal_id, user_id, connection).map_err(|error| match error {
            Error::NotFound => Error::InvalidGoal(Some(goal_id)),
            error => error,
        })?;
    }

    Ok(())
}

/// Save a new pending obligation as given, due on its scheduled date.
pub fn insert_obligation(
    user_id: UserID,
    obligation: &NewObligation,
    connection: &Connection,
) -> Result<ScheduledObligation, Error> {
    connection
        .prepare(&format!(
            "INSERT INTO scheduled_transaction
                (user_id, type, amount, category_id, description, scheduled_date, recurrence,
                 goal_id, status, next_execution_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'pending', ?6)
             RETURNING {OBLIGATION_COLUMNS}"
        ))?
        .query_row(
            (
                user_id,
                obligation.transaction_type,
                obligation.amount,
                obligation.category_id,
                &obligation.description,
                obligation.scheduled_date,
                obligation.recurrence,
                obligation.goal_id,
            ),
            map_obligation_row,
        )
        .map_err(|error| error.into())
}

/// Schedule a transaction for `user_id`.
///
/// # Errors
/// Returns [Error::InvalidCategory] or [Error::InvalidGoal] if a reference is
/// not available to the user, or [Error::SqlError] for any other SQL error.
pub fn create_obligation(
    user_id: UserID,
    obligation: NewObligation,
    connection: &Connection,
) -> Result<ScheduledObligation, Error> {
    validate_references(user_id, &obligation, connection)?;

    insert_obligation(user_id, &obligation, connection)
}

/// Retrieve one of the user's scheduled transactions.
///
/// # Errors
/// Returns [Error::NotFound] if it does not exist or belongs to someone else.
pub fn get_obligation(
    id: ObligationId,
    user_id: UserID,
    connection: &Connection,
) -> Result<ScheduledObligation, Error> {
    connection
        .prepare(&format!(
            "SELECT {OBLIGATION_COLUMNS} FROM scheduled_transaction WHERE id = ?1 AND user_id = ?2"
        ))?
        .query_row((id, user_id), map_obligation_row)
        .map_err(|error| error.into())
}

/// Retrieve the user's scheduled transactions, unpaid ones first, then by due date.
pub fn get_obligations(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<ScheduledObligation>, Error> {
    connection
        .prepare(&format!(
            "SELECT {OBLIGATION_COLUMNS} FROM scheduled_transaction
             WHERE user_id = ?1
             ORDER BY status = 'paid' ASC,
                COALESCE(next_execution_date, scheduled_date) ASC,
                id ASC"
        ))?
        .query_map([user_id], map_obligation_row)?
        .map(|maybe_obligation| maybe_obligation.map_err(Error::from))
        .collect()
}

/// Retrieve up to `limit` unpaid scheduled transactions, the soonest due first.
pub fn get_upcoming_obligations(
    user_id: UserID,
    limit: u32,
    connection: &Connection,
) -> Result<Vec<ScheduledObligation>, Error> {
    connection
        .prepare(&format!(
            "SELECT {OBLIGATION_COLUMNS} FROM scheduled_transaction
             WHERE user_id = ?1 AND status != 'paid'
             ORDER BY COALESCE(next_execution_date, scheduled_date) ASC, id ASC
             LIMIT ?2"
        ))?
        .query_map((user_id, limit), map_obligation_row)?
        .map(|maybe_obligation| maybe_obligation.map_err(Error::from))
        .collect()
}

/// Replace the details of a pending scheduled transaction.
///
/// The new scheduled date also becomes the due date.
///
/// # Errors
/// Returns [Error::UpdateMissingObligation] if it does not exist,
/// [Error::EditPaidObligation] if it has been paid, or the reference errors of
/// [create_obligation].
pub fn update_obligation(
    id: ObligationId,
    user_id: UserID,
    obligation: NewObligation,
    connection: &Connection,
) -> Result<ScheduledObligation, Error> {
    let existing = get_obligation(id, user_id, connection).map_err(|error| match error {
        Error::NotFound => Error::UpdateMissingObligation,
        error => error,
    })?;

    if existing.status == ObligationStatus::Paid {
        return Err(Error::EditPaidObligation(id));
    }

    validate_references(user_id, &obligation, connection)?;

    connection
        .prepare(&format!(
            "UPDATE scheduled_transaction
             SET type = ?1, amount = ?2, category_id = ?3, description = ?4,
                scheduled_date = ?5, recurrence = ?6, goal_id = ?7, next_execution_date = ?5
             WHERE id = ?8 AND user_id = ?9 AND status != 'paid'
             RETURNING {OBLIGATION_COLUMNS}"
        ))?
        .query_row(
            (
                obligation.transaction_type,
                obligation.amount,
                obligation.category_id,
                &obligation.description,
                obligation.scheduled_date,
                obligation.recurrence,
                obligation.goal_id,
                id,
                user_id,
            ),
            map_obligation_row,
        )
        .map_err(|error| match error {
            // Paid between the read above and this update.
            rusqlite::Error::QueryReturnedNoRows => Error::EditPaidObligation(id),
            error => error.into(),
        })
}

/// Mark a scheduled transaction as paid, unless it already is.
///
/// Returns whether the row changed, `false` meaning it was missing or already paid.
pub fn settle_obligation(
    id: ObligationId,
    user_id: UserID,
    paid_amount: f64,
    paid_at: OffsetDateTime,
    connection: &Connection,
) -> Result<bool, Error> {
    let rows_affected = connection.execute(
        "UPDATE scheduled_transaction
         SET status = 'paid', paid_date = ?1, paid_amount = ?2, last_execution_date = ?1
         WHERE id = ?3 AND user_id = ?4 AND status != 'paid'",
        (paid_at, paid_amount, id, user_id),
    )?;

    Ok(rows_affected == 1)
}

/// Delete one of the user's scheduled transactions. Realized transactions are kept.
pub fn delete_obligation(
    id: ObligationId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM scheduled_transaction WHERE id = ?1 AND user_id = ?2",
        (id, user_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingObligation);
    }

    Ok(())
}

pub fn create_scheduled_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS scheduled_transaction (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            type TEXT NOT NULL CHECK (type IN ('income', 'expense')),
            amount REAL NOT NULL,
            category_id INTEGER,
            description TEXT NOT NULL DEFAULT '',
            scheduled_date TEXT NOT NULL,
            recurrence TEXT NOT NULL DEFAULT 'once'
                CHECK (recurrence IN ('once', 'daily', 'weekly', 'monthly', 'yearly')),
            goal_id INTEGER,
            status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'paid')),
            paid_date TEXT,
            paid_amount REAL,
            last_execution_date TEXT,
            next_execution_date TEXT,
            FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES category(id) ON DELETE SET NULL,
            FOREIGN KEY(goal_id) REFERENCES goal(id) ON DELETE SET NULL
        );

        CREATE INDEX IF NOT EXISTS idx_scheduled_transaction_user
            ON scheduled_transaction(user_id, status);",
    )
}

pub fn map_obligation_row(row: &Row) -> Result<ScheduledObligation, rusqlite::Error> {
    Ok(ScheduledObligation {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        transaction_type: row.get(2)?,
        amount: row.get(3)?,
        category_id: row.get(4)?,
        description: row.get(5)?,
        scheduled_date: row.get(6)?,
        recurrence: row.get(7)?,
        goal_id: row.get(8)?,
        status: row.get(9)?,
        paid_date: row.get(10)?,
        paid_amount: row.get(11)?,
        last_execution_date: row.get(12)?,
        next_execution_date: row.get(13)?,
    })
}

#[cfg(test)]
mod obligation_query_tests {
    use time::macros::{date, datetime};

    use crate::{
        Error,
        category::{CategoryName, create_category},
        test_utils::{create_test_user, get_test_connection},
        transaction::TransactionType,
    };

    use super::{
        NewObligation, ObligationStatus, Recurrence, create_obligation, delete_obligation,
        get_obligation, get_obligations, get_upcoming_obligations, settle_obligation,
        update_obligation,
    };

    fn rent() -> NewObligation {
        NewObligation::new(
            TransactionType::Expense,
            1200.0,
            date!(2025 - 01 - 05),
            Recurrence::Monthly,
        )
        .unwrap()
        .description(" Rent ")
    }

    #[test]
    fn new_obligation_rejects_non_positive_amount() {
        let result = NewObligation::new(
            TransactionType::Expense,
            0.0,
            date!(2025 - 01 - 05),
            Recurrence::Once,
        );

        assert!(matches!(result, Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn create_starts_pending_and_due_on_scheduled_date() {
        let connection = get_test_connection();
        let user = create_test_user("test@example.com", &connection);

        let obligation = create_obligation(user.id, rent(), &connection).unwrap();

        assert_eq!(obligation.status, ObligationStatus::Pending);
        assert_eq!(obligation.description, "Rent");
        assert_eq!(obligation.next_execution_date, Some(date!(2025 - 01 - 05)));
        assert_eq!(obligation.paid_date, None);
        assert_eq!(
            get_obligation(obligation.id, user.id, &connection),
            Ok(obligation)
        );
    }

    #[test]
    fn create_rejects_category_of_another_user() {
        let connection = get_test_connection();
        let user = create_test_user("a@example.com", &connection);
        let other = create_test_user("b@example.com", &connection);
        let category = create_category(
            other.id,
            CategoryName::new_unchecked("Private"),
            TransactionType::Expense,
            "",
            &connection,
        )
        .unwrap();

        let result = create_obligation(user.id, rent().category(Some(category.id)), &connection);

        assert_eq!(result, Err(Error::InvalidCategory(Some(category.id))));
    }

    #[test]
    fn list_orders_unpaid_by_due_date() {
        let connection = get_test_connection();
        let user = create_test_user("test@example.com", &connection);
        let later = create_obligation(user.id, rent(), &connection).unwrap();
        let sooner = create_obligation(
            user.id,
            NewObligation::new(
                TransactionType::Income,
                10.0,
                date!(2025 - 01 - 01),
                Recurrence::Once,
            )
            .unwrap(),
            &connection,
        )
        .unwrap();
        let paid = create_obligation(
            user.id,
            NewObligation::new(
                TransactionType::Expense,
                10.0,
                date!(2024 - 12 - 01),
                Recurrence::Once,
            )
            .unwrap(),
            &connection,
        )
        .unwrap();
        settle_obligation(paid.id, user.id, 10.0, datetime!(2024-12-01 10:00 UTC), &connection)
            .unwrap();

        let ids: Vec<_> = get_obligations(user.id, &connection)
            .unwrap()
            .iter()
            .map(|obligation| obligation.id)
            .collect();
        assert_eq!(ids, vec![sooner.id, later.id, paid.id]);

        let upcoming: Vec<_> = get_upcoming_obligations(user.id, 1, &connection)
            .unwrap()
            .iter()
            .map(|obligation| obligation.id)
            .collect();
        assert_eq!(upcoming, vec![sooner.id]);
    }

    #[test]
    fn settle_only_changes_unpaid_rows() {
        let connection = get_test_connection();
        let user = create_test_user("test@example.com", &connection);
        let obligation = create_obligation(user.id, rent(), &connection).unwrap();
        let paid_at = datetime!(2025-01-05 09:30 UTC);

        assert_eq!(
            settle_obligation(obligation.id, user.id, 1100.0, paid_at, &connection),
            Ok(true)
        );
        assert_eq!(
            settle_obligation(obligation.id, user.id, 1100.0, paid_at, &connection),
            Ok(false)
        );

        let paid = get_obligation(obligation.id, user.id, &connection).unwrap();
        assert_eq!(paid.status, ObligationStatus::Paid);
        assert_eq!(paid.paid_amount, Some(1100.0));
        assert_eq!(paid.paid_date, Some(paid_at));
        assert_eq!(paid.last_execution_date, Some(paid_at));
    }

    #[test]
    fn update_changes_pending_obligation() {
        let connection = get_test_connection();
        let user = create_test_user("test@example.com", &connection);
        let obligation = create_obligation(user.id, rent(), &connection).unwrap();

        let updated = update_obligation(
            obligation.id,
            user.id,
            NewObligation::new(
                TransactionType::Expense,
                1300.0,
                date!(2025 - 02 - 10),
                Recurrence::Yearly,
            )
            .unwrap(),
            &connection,
        )
        .unwrap();

        assert_eq!(updated.amount, 1300.0);
        assert_eq!(updated.recurrence, Recurrence::Yearly);
        assert_eq!(updated.due_date(), date!(2025 - 02 - 10));
    }

    #[test]
    fn update_rejects_paid_obligation() {
        let connection = get_test_connection();
        let user = create_test_user("test@example.com", &connection);
        let obligation = create_obligation(user.id, rent(), &connection).unwrap();
        settle_obligation(
            obligation.id,
            user.id,
            1200.0,
            datetime!(2025-01-05 09:30 UTC),
            &connection,
        )
        .unwrap();

        let result = update_obligation(obligation.id, user.id, rent(), &connection);

        assert_eq!(result, Err(Error::EditPaidObligation(obligation.id)));
    }

    #[test]
    fn update_and_delete_missing_obligation() {
        let connection = get_test_connection();
        let user = create_test_user("test@example.com", &connection);

        assert_eq!(
            update_obligation(3, user.id, rent(), &connection),
            Err(Error::UpdateMissingObligation)
        );
        assert_eq!(
            delete_obligation(3, user.id, &connection),
            Err(Error::DeleteMissingObligation)
        );
    }

    #[test]
    fn unknown_recurrence_is_rejected_by_the_table() {
        let connection = get_test_connection();
        let user = create_test_user("test@example.com", &connection);
        let obligation = create_obligation(user.id, rent(), &connection).unwrap();

        let result = connection.execute(
            "UPDATE scheduled_transaction SET recurrence = 'fortnightly' WHERE id = ?1",
            [obligation.id],
        );

        assert!(
            matches!(
                result,
                Err(rusqlite::Error::SqliteFailure(ref error, _))
                    if error.code == rusqlite::ErrorCode::ConstraintViolation
            ),
            "want a constraint violation, got {result:?}"
        );
        let stored = get_obligation(obligation.id, user.id, &connection).unwrap();
        assert_eq!(stored.recurrence, Recurrence::Monthly);
    }
}
