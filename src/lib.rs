//! PoupeJá is a web app for tracking personal finances.
//!
//! Users record income and expense transactions, save towards goals,
//! schedule recurring bills and paychecks, and view dashboards and reports.
//!
//! This library provides a REST API that directly serves HTML pages.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod alert;
mod app_state;
mod auth;
mod category;
mod dashboard;
mod database_id;
mod db;
mod endpoints;
mod goal;
mod html;
mod internal_server_error;
mod logging;
mod navigation;
mod not_found;
mod report;
mod routing;
mod schedule;
mod subscription;
mod timezone;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use auth::{
    PasswordHash, User, UserID, ValidatedPassword, count_users, get_user_by_email, update_password,
};
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;
pub use schedule::{
    DUE_SOON_DAYS, DisplayStatus, LedgerStore, ObligationStatus, PaymentOutcome, Recurrence,
    ScheduleError, ScheduledObligation, derive_display_status, mark_paid,
};
pub use timezone::get_local_offset;

use crate::{
    alert::Alert,
    database_id::{CategoryId, GoalId, ObligationId},
    internal_server_error::InternalServerError,
    not_found::get_404_not_found_response,
    schedule::RecurrenceError,
    transaction::TransactionTypeError,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install terminate signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an invalid combination of email and password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The auth token cookie is missing from the cookie jar in the request.
    #[error("no cookies in the cookie jar :(")]
    CookieMissing,

    /// The auth token in the cookie could not be parsed or has expired.
    #[error("the auth token is invalid or has expired")]
    InvalidToken,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The string used to register a user is not a valid email address.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// The email address is already registered to another user.
    #[error("the email address is already in use")]
    DuplicateEmail,

    /// The user tried to do something that only an admin may do.
    #[error("only an admin can do that")]
    Forbidden,

    /// An amount of money was not a finite number greater than zero.
    #[error("{0} is not a valid amount, amounts must be greater than zero")]
    InvalidAmount(String),

    /// A recurrence string did not match any known recurrence.
    #[error("unrecognized recurrence \"{0}\"")]
    InvalidRecurrence(String),

    /// A transaction type string was neither income nor expense.
    #[error("unrecognized transaction type \"{0}\"")]
    InvalidTransactionType(String),

    /// The scheduled transaction has already been paid.
    #[error("the scheduled transaction {0} has already been paid")]
    AlreadyPaid(ObligationId),

    /// A paid scheduled transaction is a closed record and cannot be edited.
    #[error("the scheduled transaction {0} has been paid and can no longer be edited")]
    EditPaidObligation(ObligationId),

    /// The category ID did not match a category available to the user.
    #[error("the category ID does not refer to a valid category")]
    InvalidCategory(Option<CategoryId>),

    /// An empty string was used to create a category name.
    #[error("category name cannot be empty")]
    EmptyCategoryName,

    /// Default categories are shared by every user and cannot be deleted.
    #[error("default categories cannot be deleted")]
    DeleteDefaultCategory,

    /// The goal ID did not match a goal owned by the user.
    #[error("the goal ID does not refer to a valid goal")]
    InvalidGoal(Option<GoalId>),

    /// An empty string was used to create a goal name.
    #[error("goal name cannot be empty")]
    EmptyGoalName,

    /// The start of a date range is after its end.
    #[error("the start date must not be after the end date")]
    InvalidDateRange,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// Could not write the CSV report.
    #[error("could not write CSV: {0}")]
    CsvError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Tried to delete a transaction that does not exist
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// Tried to update a transaction that does not exist
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to delete a scheduled transaction that does not exist
    #[error("tried to delete a scheduled transaction that is not in the database")]
    DeleteMissingObligation,

    /// Tried to update a scheduled transaction that does not exist
    #[error("tried to update a scheduled transaction that is not in the database")]
    UpdateMissingObligation,

    /// Tried to delete a goal that does not exist
    #[error("tried to delete a goal that is not in the database")]
    DeleteMissingGoal,

    /// Tried to delete a category that does not exist
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// The billing webhook secret has not been configured on the server.
    #[error("billing webhook secret is not configured")]
    BillingNotConfigured,

    /// The billing event signature header is missing or does not match the payload.
    #[error("invalid billing event signature")]
    InvalidSignature,

    /// The billing event body could not be understood.
    #[error("malformed billing event: {0}")]
    MalformedBillingEvent(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            rusqlite::Error::FromSqlConversionFailure(index, data_type, inner) => {
                if let Some(RecurrenceError(raw)) = inner.downcast_ref::<RecurrenceError>() {
                    return Error::InvalidRecurrence(raw.clone());
                }

                if let Some(TransactionTypeError(raw)) = inner.downcast_ref::<TransactionTypeError>()
                {
                    return Error::InvalidTransactionType(raw.clone());
                }

                let error = rusqlite::Error::FromSqlConversionFailure(index, data_type, inner);
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::Forbidden => (
                StatusCode::FORBIDDEN,
                html::error_view(
                    "Forbidden",
                    "403",
                    "You do not have access to this page.",
                    "Ask an admin for help.",
                ),
            )
                .into_response(),
            Error::EditPaidObligation(_) => (
                StatusCode::CONFLICT,
                html::error_view(
                    "Already Paid",
                    "409",
                    "This scheduled transaction has been paid and can no longer be edited.",
                    "Go back to the schedule page and schedule a new transaction instead.",
                ),
            )
                .into_response(),
            Error::InvalidDateRange => (
                StatusCode::BAD_REQUEST,
                html::error_view(
                    "Invalid Date Range",
                    "400",
                    "The start date must not be after the end date.",
                    "Go back and pick a start date on or before the end date.",
                ),
            )
                .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    fn into_alert_response(self) -> Response {
        let (status_code, alert) = match &self {
            Error::InvalidTimezoneError(timezone) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::error(
                    "Invalid Timezone Settings",
                    &format!(
                        "Could not get local timezone \"{timezone}\". Check your server settings and \
                        ensure the timezone has been set to valid, canonical timezone string"
                    ),
                ),
            ),
            Error::InvalidAmount(_)
            | Error::InvalidRecurrence(_)
            | Error::InvalidTransactionType(_)
            | Error::InvalidDateRange
            | Error::EmptyCategoryName
            | Error::EmptyGoalName
            | Error::InvalidEmail(_)
            | Error::TooWeak(_) => (
                StatusCode::BAD_REQUEST,
                Alert::error("Invalid input", &capitalise_first_char(&self.to_string())),
            ),
            Error::InvalidCategory(category_id) => (
                StatusCode::BAD_REQUEST,
                Alert::error(
                    "Invalid category",
                    &format!("Could not find a category with the ID {category_id:?}"),
                ),
            ),
            Error::InvalidGoal(goal_id) => (
                StatusCode::BAD_REQUEST,
                Alert::error(
                    "Invalid goal",
                    &format!("Could not find a goal with the ID {goal_id:?}"),
                ),
            ),
            Error::AlreadyPaid(_) => (
                StatusCode::CONFLICT,
                Alert::error(
                    "Already paid",
                    "This scheduled transaction has already been paid. \
                    Try refreshing the page to see the latest changes.",
                ),
            ),
            Error::EditPaidObligation(_) => (
                StatusCode::CONFLICT,
                Alert::error(
                    "Could not update scheduled transaction",
                    "Paid scheduled transactions can no longer be edited.",
                ),
            ),
            Error::DeleteDefaultCategory => (
                StatusCode::BAD_REQUEST,
                Alert::error(
                    "Could not delete category",
                    "Default categories are shared and cannot be deleted.",
                ),
            ),
            Error::Forbidden => (
                StatusCode::FORBIDDEN,
                Alert::error("Forbidden", "Only an admin can do that."),
            ),
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                Alert::error(
                    "Not found",
                    "The requested item could not be found. \
                    Try refreshing the page to see the latest changes.",
                ),
            ),
            Error::UpdateMissingTransaction => (
                StatusCode::NOT_FOUND,
                Alert::error(
                    "Could not update transaction",
                    "The transaction could not be found.",
                ),
            ),
            Error::DeleteMissingTransaction => (
                StatusCode::NOT_FOUND,
                Alert::error(
                    "Could not delete transaction",
                    "The transaction could not be found. \
                    Try refreshing the page to see if the transaction has already been deleted.",
                ),
            ),
            Error::UpdateMissingObligation => (
                StatusCode::NOT_FOUND,
                Alert::error(
                    "Could not update scheduled transaction",
                    "The scheduled transaction could not be found.",
                ),
            ),
            Error::DeleteMissingObligation => (
                StatusCode::NOT_FOUND,
                Alert::error(
                    "Could not delete scheduled transaction",
                    "The scheduled transaction could not be found. \
                    Try refreshing the page to see if it has already been deleted.",
                ),
            ),
            Error::DeleteMissingGoal => (
                StatusCode::NOT_FOUND,
                Alert::error(
                    "Could not delete goal",
                    "The goal could not be found. \
                    Try refreshing the page to see if the goal has already been deleted.",
                ),
            ),
            Error::DeleteMissingCategory => (
                StatusCode::NOT_FOUND,
                Alert::error(
                    "Could not delete category",
                    "The category could not be found. \
                    Try refreshing the page to see if the category has already been deleted.",
                ),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::error(
                    "Something went wrong",
                    "An unexpected error occurred, check the server logs for more details.",
                ),
            ),
        };

        (status_code, alert.into_html()).into_response()
    }
}

fn capitalise_first_char(string: &str) -> String {
    let mut chars = string.chars();
    let Some(first) = chars.next() else {
        return String::with_capacity(0);
    };
    first.to_uppercase().chain(chars).collect()
}
