//! Paying scheduled transactions.

use time::OffsetDateTime;

use crate::{
    Error,
    auth::UserID,
    database_id::ObligationId,
    transaction::{Transaction, validate_amount},
};

use super::{
    core::{NewObligation, ObligationStatus, ScheduledObligation},
    store::LedgerStore,
};

/// The ways that paying a scheduled transaction can fail.
///
/// The ledger is left as it was before the call for every variant.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ScheduleError {
    /// The scheduled transaction was already paid, possibly by a concurrent request.
    #[error("the scheduled transaction {0} has already been paid")]
    AlreadyPaid(ObligationId),

    /// The payment was rejected before anything was written.
    #[error("invalid payment: {0}")]
    Validation(Error),

    /// A read or write to the ledger failed.
    #[error("could not record the payment: {0}")]
    Persistence(Error),
}

impl From<Error> for ScheduleError {
    fn from(error: Error) -> Self {
        match error {
            Error::AlreadyPaid(id) => ScheduleError::AlreadyPaid(id),
            error @ (Error::InvalidAmount(_)
            | Error::InvalidRecurrence(_)
            | Error::InvalidTransactionType(_)
            | Error::InvalidCategory(_)
            | Error::InvalidGoal(_)) => ScheduleError::Validation(error),
            error => ScheduleError::Persistence(error),
        }
    }
}

impl From<rusqlite::Error> for ScheduleError {
    fn from(error: rusqlite::Error) -> Self {
        Error::from(error).into()
    }
}

impl From<ScheduleError> for Error {
    fn from(error: ScheduleError) -> Self {
        match error {
            ScheduleError::AlreadyPaid(id) => Error::AlreadyPaid(id),
            ScheduleError::Validation(error) | ScheduleError::Persistence(error) => error,
        }
    }
}

/// Everything [mark_paid] wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOutcome {
    /// The transaction that records the money that was spent or earned.
    pub realized_transaction: Transaction,
    /// The scheduled transaction, now paid.
    pub updated_obligation: ScheduledObligation,
    /// The next occurrence of a recurring scheduled transaction.
    pub next_obligation: Option<ScheduledObligation>,
}

/// Pay a scheduled transaction.
///
/// Records a transaction for `paid_amount`, or the scheduled amount if `None`,
/// dated on the calendar day of `now`. Income linked to a goal is added to the
/// goal. A recurring scheduled transaction spawns a pending copy due one
/// interval after the paid one.
///
/// All of the writes happen as one unit of `store`.
///
/// # Errors
/// - [ScheduleError::Validation] if `paid_amount` is not a finite number
///   greater than zero. Nothing is read or written in this case.
/// - [ScheduleError::AlreadyPaid] if the scheduled transaction is paid,
///   including when another payment wins a race for it.
/// - [ScheduleError::Persistence] if the scheduled transaction does not exist
///   ([Error::NotFound]) or a write fails.
pub fn mark_paid<S: LedgerStore>(
    store: &S,
    user_id: UserID,
    obligation_id: ObligationId,
    paid_amount: Option<f64>,
    now: OffsetDateTime,
) -> Result<PaymentOutcome, ScheduleError> {
    let paid_amount = paid_amount
        .map(validate_amount)
        .transpose()
        .map_err(ScheduleError::Validation)?;

    let outcome = store.atomically(|store| {
        let obligation = store.get_obligation(obligation_id, user_id)?;

        if obligation.status == ObligationStatus::Paid {
            return Err(ScheduleError::AlreadyPaid(obligation_id));
        }

        let amount = paid_amount.unwrap_or(obligation.amount);
        let category_id = match obligation.category_id {
            Some(category_id) => category_id,
            None => store.default_category_id(obligation.transaction_type)?,
        };

        // Guarded on the status, so only one of two concurrent payments gets past here.
        if !store.settle_obligation(obligation_id, user_id, amount, now)? {
            return Err(ScheduleError::AlreadyPaid(obligation_id));
        }

        let builder = Transaction::build(obligation.transaction_type, amount, now.date())
            .description(&format!("{} (Scheduled)", obligation.description))
            .category(Some(category_id))
            .goal(obligation.goal_id);
        let realized_transaction = store.insert_transaction(user_id, &builder, category_id, now)?;

        if let Some((goal_id, contribution)) = realized_transaction.goal_contribution() {
            store.adjust_goal_amount(goal_id, contribution)?;
        }

        let next_obligation = match obligation.recurrence.advance(obligation.due_date()) {
            Some(next_date) => Some(store.insert_obligation(
                user_id,
                &NewObligation::next_occurrence(&obligation, next_date),
            )?),
            None => None,
        };

        let updated_obligation = store.get_obligation(obligation_id, user_id)?;

        Ok(PaymentOutcome {
            realized_transaction,
            updated_obligation,
            next_obligation,
        })
    })?;

    tracing::info!(
        "obligation {obligation_id} paid by user {user_id}, recorded as transaction {}",
        outcome.realized_transaction.id
    );
    if let Some(next) = &outcome.next_obligation {
        tracing::info!(
            "obligation {obligation_id} rolled over to obligation {} due {}",
            next.id,
            next.due_date()
        );
    }

    Ok(outcome)
}
