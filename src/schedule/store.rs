//! The storage operations needed to pay a scheduled transaction.

use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    Error,
    auth::UserID,
    category,
    database_id::{CategoryId, GoalId, ObligationId},
    db::with_transaction,
    goal,
    transaction::{self, Transaction, TransactionBuilder, TransactionType},
};

use super::{
    ScheduleError,
    core::{self, NewObligation, ScheduledObligation},
};

/// The ledger that [mark_paid](super::mark_paid) reads from and writes to.
///
/// Every write made inside [LedgerStore::atomically] must either all be
/// visible to readers or none of them.
pub trait LedgerStore {
    /// Run `f` as a single unit. If `f` returns an error, every write it made is undone.
    fn atomically<T>(
        &self,
        f: impl FnOnce(&Self) -> Result<T, ScheduleError>,
    ) -> Result<T, ScheduleError>;

    fn get_obligation(
        &self,
        id: ObligationId,
        user_id: UserID,
    ) -> Result<ScheduledObligation, Error>;

    /// Mark an obligation as paid if it is not already.
    ///
    /// Returns `false` without changing anything if the obligation is already paid.
    fn settle_obligation(
        &self,
        id: ObligationId,
        user_id: UserID,
        paid_amount: f64,
        paid_at: OffsetDateTime,
    ) -> Result<bool, Error>;

    /// The shared "Other" category for `transaction_type`.
    fn default_category_id(&self, transaction_type: TransactionType) -> Result<CategoryId, Error>;

    fn insert_transaction(
        &self,
        user_id: UserID,
        builder: &TransactionBuilder,
        category_id: CategoryId,
        created_at: OffsetDateTime,
    ) -> Result<Transaction, Error>;

    fn insert_obligation(
        &self,
        user_id: UserID,
        obligation: &NewObligation,
    ) -> Result<ScheduledObligation, Error>;

    /// Add `delta` to a goal's current amount in one step.
    fn adjust_goal_amount(&self, goal_id: GoalId, delta: f64) -> Result<(), Error>;
}

impl LedgerStore for Connection {
    fn atomically<T>(
        &self,
        f: impl FnOnce(&Self) -> Result<T, ScheduleError>,
    ) -> Result<T, ScheduleError> {
        with_transaction(self, |connection| f(connection))
    }

    fn get_obligation(
        &self,
        id: ObligationId,
        user_id: UserID,
    ) -> Result<ScheduledObligation, Error> {
        core::get_obligation(id, user_id, self)
    }

    fn settle_obligation(
        &self,
        id: ObligationId,
        user_id: UserID,
        paid_amount: f64,
        paid_at: OffsetDateTime,
    ) -> Result<bool, Error> {
        core::settle_obligation(id, user_id, paid_amount, paid_at, self)
    }

    fn default_category_id(&self, transaction_type: TransactionType) -> Result<CategoryId, Error> {
        category::default_category_id(transaction_type, self)
    }

    fn insert_transaction(
        &self,
        user_id: UserID,
        builder: &TransactionBuilder,
        category_id: CategoryId,
        created_at: OffsetDateTime,
    ) -> Result<Transaction, Error> {
        transaction::insert_transaction(user_id, builder, category_id, created_at, self)
    }

    fn insert_obligation(
        &self,
        user_id: UserID,
        obligation: &NewObligation,
    ) -> Result<ScheduledObligation, Error> {
        core::insert_obligation(user_id, obligation, self)
    }

    fn adjust_goal_amount(&self, goal_id: GoalId, delta: f64) -> Result<(), Error> {
        goal::adjust_goal_amount(goal_id, delta, self)
    }
}
