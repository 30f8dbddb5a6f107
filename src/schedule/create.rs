//! The page and endpoint for scheduling a new transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::html;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::UserID,
    category::get_categories,
    endpoints,
    goal::get_goals,
    html::{BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, base, currency_input_styles},
    navigation::NavBar,
    schedule::{
        Recurrence,
        core::create_obligation,
        form::{ObligationForm, ObligationFormDefaults, obligation_form_fields},
    },
    timezone::local_now,
    transaction::TransactionType,
};

/// The state needed for the new scheduled transaction page and endpoint.
#[derive(Debug, Clone)]
pub struct CreateObligationState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "America/Sao_Paulo".
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateObligationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

pub async fn get_new_scheduled_page(
    State(state): State<CreateObligationState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let today = local_now(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?
        .date();

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let categories = get_categories(user_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;
    let goals = get_goals(user_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve goals: {error}"))?;

    let fields = obligation_form_fields(
        &ObligationFormDefaults {
            transaction_type: TransactionType::Expense,
            amount: None,
            scheduled_date: today,
            recurrence: Recurrence::Monthly,
            description: None,
            category_id: None,
            goal_id: None,
        },
        &categories,
        &goals,
    );

    let nav_bar = NavBar::new(endpoints::SCHEDULE_VIEW).into_html();
    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Schedule Transaction" }

            form
                hx-post=(endpoints::SCHEDULED_API)
                hx-target-error="#alert-container"
                class="w-full space-y-4 md:space-y-6"
            {
                (fields)

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Schedule" }
            }
        }
    };

    Ok(base("Schedule Transaction", &[currency_input_styles()], &content).into_response())
}

/// Schedule a transaction, redirecting to the schedule page on success.
pub async fn create_scheduled_endpoint(
    State(state): State<CreateObligationState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<ObligationForm>,
) -> Response {
    let new_obligation = match form.into_new_obligation() {
        Ok(new_obligation) => new_obligation,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_obligation(user_id, new_obligation, &connection) {
        Ok(obligation) => {
            tracing::info!("user {user_id} scheduled obligation {}", obligation.id);

            (
                HxRedirect(endpoints::SCHEDULE_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error @ (Error::InvalidCategory(_) | Error::InvalidGoal(_))) => {
            error.into_alert_response()
        }
        Err(error) => {
            tracing::error!("could not schedule transaction: {error}");
            error.into_alert_response()
        }
    }
}
