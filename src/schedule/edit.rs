//! The page and endpoint for editing a pending scheduled transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::html;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::UserID,
    category::get_categories,
    database_id::ObligationId,
    endpoints::{self, format_endpoint},
    goal::get_goals,
    html::{BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, base, currency_input_styles},
    navigation::NavBar,
    schedule::{
        core::{ObligationStatus, get_obligation, update_obligation},
        form::{ObligationForm, ObligationFormDefaults, obligation_form_fields},
    },
};

/// The state needed to edit a scheduled transaction.
#[derive(Debug, Clone)]
pub struct EditObligationState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditObligationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

pub async fn get_edit_scheduled_page(
    State(state): State<EditObligationState>,
    Extension(user_id): Extension<UserID>,
    Path(obligation_id): Path<ObligationId>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let obligation = get_obligation(obligation_id, user_id, &connection)?;

    if obligation.status == ObligationStatus::Paid {
        return Err(Error::EditPaidObligation(obligation_id));
    }

    let categories = get_categories(user_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;
    let goals = get_goals(user_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve goals: {error}"))?;

    let fields = obligation_form_fields(
        &ObligationFormDefaults {
            transaction_type: obligation.transaction_type,
            amount: Some(obligation.amount),
            scheduled_date: obligation.due_date(),
            recurrence: obligation.recurrence,
            description: Some(&obligation.description),
            category_id: obligation.category_id,
            goal_id: obligation.goal_id,
        },
        &categories,
        &goals,
    );

    let nav_bar = NavBar::new(endpoints::SCHEDULE_VIEW).into_html();
    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Edit Scheduled Transaction" }

            form
                hx-put=(format_endpoint(endpoints::SCHEDULED, obligation_id))
                hx-target-error="#alert-container"
                class="w-full space-y-4 md:space-y-6"
            {
                (fields)

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Update" }
            }
        }
    };

    Ok(base(
        "Edit Scheduled Transaction",
        &[currency_input_styles()],
        &content,
    )
    .into_response())
}

pub async fn update_scheduled_endpoint(
    Path(obligation_id): Path<ObligationId>,
    State(state): State<EditObligationState>,
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

    match update_obligation(obligation_id, user_id, new_obligation, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::SCHEDULE_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(
            error @ (Error::UpdateMissingObligation
            | Error::EditPaidObligation(_)
            | Error::InvalidCategory(_)
            | Error::InvalidGoal(_)),
        ) => error.into_alert_response(),
        Err(error) => {
            tracing::error!("could not update scheduled transaction {obligation_id}: {error}");
            error.into_alert_response()
        }
    }
}
