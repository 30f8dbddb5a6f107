//! The page and endpoint for creating a savings goal.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// axum_extra's Form turns an empty deadline into None instead of rejecting the request.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    auth::UserID,
    endpoints,
    goal::{NewGoal, create_goal},
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
        currency_input_styles,
    },
    navigation::NavBar,
    timezone::local_now,
};

const DEFAULT_GOAL_COLOR: &str = "#3B82F6";

/// The state needed for creating a goal.
#[derive(Debug, Clone)]
pub struct CreateGoalState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "America/Sao_Paulo".
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateGoalState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GoalForm {
    pub name: String,
    pub target_amount: f64,
    pub start_date: Date,
    #[serde(default)]
    pub deadline: Option<Date>,
    #[serde(default)]
    pub color: String,
}

pub async fn get_new_goal_page(State(state): State<CreateGoalState>) -> Result<Response, Error> {
    let today = local_now(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?
        .date();

    let nav_bar = NavBar::new(endpoints::GOALS_VIEW).into_html();
    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE) { (new_goal_form(today)) }
    };

    Ok(base("Create Goal", &[currency_input_styles()], &content).into_response())
}

pub async fn create_goal_endpoint(
    State(state): State<CreateGoalState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<GoalForm>,
) -> Response {
    let new_goal = match NewGoal::new(
        &form.name,
        form.target_amount,
        form.start_date,
        form.deadline,
        &form.color,
    ) {
        Ok(new_goal) => new_goal,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_goal(user_id, new_goal, &connection) {
        Ok(goal) => {
            tracing::info!("user {user_id} created goal {}", goal.id);

            (
                HxRedirect(endpoints::GOALS_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!("could not create goal: {error}");
            error.into_alert_response()
        }
    }
}

fn new_goal_form(today: Date) -> Markup {
    html! {
        form
            hx-post=(endpoints::GOALS_API)
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="name" class=(FORM_LABEL_STYLE) { "Name" }

                input
                    id="name"
                    type="text"
                    name="name"
                    placeholder="Emergency fund"
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="target_amount" class=(FORM_LABEL_STYLE) { "Target amount" }

                div class="input-wrapper w-full"
                {
                    input
                        id="target_amount"
                        type="number"
                        name="target_amount"
                        step="0.01"
                        min="0.01"
                        placeholder="0.00"
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }
            }

            div class="grid grid-cols-2 gap-4"
            {
                div
                {
                    label for="start_date" class=(FORM_LABEL_STYLE) { "Start date" }

                    input
                        id="start_date"
                        type="date"
                        name="start_date"
                        value=(today)
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="deadline" class=(FORM_LABEL_STYLE) { "Deadline (optional)" }

                    input
                        id="deadline"
                        type="date"
                        name="deadline"
                        min=(today)
                        class=(FORM_TEXT_INPUT_STYLE);
                }
            }

            div
            {
                label for="color" class=(FORM_LABEL_STYLE) { "Colour" }

                input
                    id="color"
                    type="color"
                    name="color"
                    value=(DEFAULT_GOAL_COLOR)
                    required
                    class="h-10 w-full";
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create Goal" }
        }
    }
}


#[cfg(test)]
mod create_goal_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};
    use axum_extra::extract::Form;
    use time::macros::date;

    use crate::{
        endpoints,
        goal::get_goals,
        test_utils::{
            assert_alert_contains, assert_hx_redirect, create_test_user, get_test_connection,
            parse_html_fragment,
        },
    };

    use super::{CreateGoalState, GoalForm, create_goal_endpoint};

    fn form(name: &str, target_amount: f64) -> GoalForm {
        GoalForm {
            name: name.to_owned(),
            target_amount,
            start_date: date!(2025 - 01 - 01),
            deadline: Some(date!(2025 - 12 - 31)),
            color: "#10b981".to_owned(),
        }
    }

    #[tokio::test]
    async fn can_create_goal() {
        let connection = get_test_connection();
        let user = create_test_user("test@example.com", &connection);
        let state = CreateGoalState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        let response = create_goal_endpoint(
            State(state.clone()),
            Extension(user.id),
            Form(form("Holiday", 3000.0)),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::GOALS_VIEW);
        let goals = get_goals(user.id, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].name, "Holiday");
        assert_eq!(goals[0].color, "#10B981");
    }

    #[tokio::test]
    async fn rejects_non_positive_target() {
        let connection = get_test_connection();
        let user = create_test_user("test@example.com", &connection);
        let state = CreateGoalState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        let response = create_goal_endpoint(
            State(state.clone()),
            Extension(user.id),
            Form(form("Holiday", -5.0)),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let html = parse_html_fragment(response).await;
        assert_alert_contains(&html, "Invalid input");
        let goals = get_goals(user.id, &state.db_connection.lock().unwrap()).unwrap();
        assert!(goals.is_empty());
    }
}
