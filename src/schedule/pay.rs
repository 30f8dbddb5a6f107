//! The endpoint for marking a scheduled transaction as paid.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// An empty amount means "pay the scheduled amount", which axum::Form would reject.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::UserID,
    database_id::ObligationId,
    endpoints,
    schedule::{ScheduleError, mark_paid},
    timezone::local_now,
};

/// The state needed to pay a scheduled transaction.
#[derive(Debug, Clone)]
pub struct PayObligationState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "America/Sao_Paulo".
    pub local_timezone: String,
}

impl FromRef<AppState> for PayObligationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PayForm {
    /// Overrides the scheduled amount.
    #[serde(default)]
    pub amount: Option<f64>,
}

/// Record the payment of a scheduled transaction dated today in the server timezone.
pub async fn pay_scheduled_endpoint(
    Path(obligation_id): Path<ObligationId>,
    State(state): State<PayObligationState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<PayForm>,
) -> Response {
    let Some(now) = local_now(&state.local_timezone) else {
        return Error::InvalidTimezoneError(state.local_timezone).into_alert_response();
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match mark_paid(&*connection, user_id, obligation_id, form.amount, now) {
        Ok(_) => (
            HxRedirect(endpoints::SCHEDULE_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error @ ScheduleError::Persistence(_)) => {
            tracing::error!("could not pay scheduled transaction {obligation_id}: {error}");
            Error::from(error).into_alert_response()
        }
        Err(error) => {
            tracing::warn!("rejected payment of scheduled transaction {obligation_id}: {error}");
            Error::from(error).into_alert_response()
        }
    }
}

#[cfg(test)]
mod pay_scheduled_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Path, State},
        http::StatusCode,
    };
    use axum_extra::extract::Form;
    use time::{OffsetDateTime, macros::date};

    use crate::{
        endpoints,
        schedule::{
            Recurrence,
            core::{NewObligation, ObligationStatus, create_obligation, get_obligations},
        },
        test_utils::{
            assert_alert_contains, assert_hx_redirect, create_test_user, get_test_connection,
            parse_html_fragment,
        },
        transaction::{TransactionFilter, TransactionType, query_transactions},
    };

    use super::{PayForm, PayObligationState, pay_scheduled_endpoint};

    fn setup(recurrence: Recurrence) -> (PayObligationState, crate::UserID, i64) {
        let connection = get_test_connection();
        let user = create_test_user("test@example.com", &connection);
        let obligation = create_obligation(
            user.id,
            NewObligation::new(
                TransactionType::Expense,
                60.0,
                date!(2025 - 01 - 31),
                recurrence,
            )
            .unwrap()
            .description("Gym"),
            &connection,
        )
        .unwrap();

        (
            PayObligationState {
                db_connection: Arc::new(Mutex::new(connection)),
                local_timezone: "Etc/UTC".to_owned(),
            },
            user.id,
            obligation.id,
        )
    }

    #[tokio::test]
    async fn pays_and_redirects() {
        let (state, user_id, obligation_id) = setup(Recurrence::Monthly);

        let response = pay_scheduled_endpoint(
            Path(obligation_id),
            State(state.clone()),
            Extension(user_id),
            Form(PayForm { amount: Some(65.0) }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::SCHEDULE_VIEW);
        let connection = state.db_connection.lock().unwrap();
        let rows =
            query_transactions(user_id, TransactionFilter::default(), &connection).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].transaction.amount, 65.0);
        assert_eq!(rows[0].transaction.date, OffsetDateTime::now_utc().date());
        let obligations = get_obligations(user_id, &connection).unwrap();
        assert_eq!(obligations.len(), 2);
        assert_eq!(obligations[0].status, ObligationStatus::Pending);
        assert_eq!(obligations[0].scheduled_date, date!(2025 - 02 - 28));
        assert_eq!(obligations[1].status, ObligationStatus::Paid);
    }

    #[tokio::test]
    async fn second_payment_is_conflict() {
        let (state, user_id, obligation_id) = setup(Recurrence::Once);
        pay_scheduled_endpoint(
            Path(obligation_id),
            State(state.clone()),
            Extension(user_id),
            Form(PayForm::default()),
        )
        .await;

        let response = pay_scheduled_endpoint(
            Path(obligation_id),
            State(state.clone()),
            Extension(user_id),
            Form(PayForm::default()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let html = parse_html_fragment(response).await;
        assert_alert_contains(&html, "Already paid");
        let connection = state.db_connection.lock().unwrap();
        let rows =
            query_transactions(user_id, TransactionFilter::default(), &connection).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn invalid_amount_is_bad_request() {
        let (state, user_id, obligation_id) = setup(Recurrence::Once);

        let response = pay_scheduled_endpoint(
            Path(obligation_id),
            State(state),
            Extension(user_id),
            Form(PayForm {
                amount: Some(-10.0),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_obligation_is_not_found() {
        let (state, user_id, _) = setup(Recurrence::Once);

        let response = pay_scheduled_endpoint(
            Path(404),
            State(state),
            Extension(user_id),
            Form(PayForm::default()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
