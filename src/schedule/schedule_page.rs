//! The page listing scheduled transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::html;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::UserID,
    category::get_categories,
    endpoints,
    html::{LINK_STYLE, PAGE_CONTAINER_STYLE, base},
    navigation::NavBar,
    schedule::{core::get_obligations, view::obligations_table},
    timezone::local_now,
};

/// The state needed for the schedule page.
#[derive(Debug, Clone)]
pub struct SchedulePageState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "America/Sao_Paulo".
    pub local_timezone: String,
}

impl FromRef<AppState> for SchedulePageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

pub async fn get_schedule_page(
    State(state): State<SchedulePageState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let now = local_now(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let obligations = get_obligations(user_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve scheduled transactions: {error}"))?;
    let categories = get_categories(user_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;

    let nav_bar = NavBar::new(endpoints::SCHEDULE_VIEW).into_html();
    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 w-full lg:max-w-5xl"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Scheduled Transactions" }

                    a href=(endpoints::NEW_SCHEDULED_VIEW) class=(LINK_STYLE)
                    {
                        "Schedule Transaction"
                    }
                }

                p class="text-sm text-gray-500 dark:text-gray-400"
                {
                    "Paying a scheduled transaction records it as a transaction dated today. \
                    Repeating ones are scheduled again for their next due date."
                }

                (obligations_table(&obligations, &categories, now, true))
            }
        }
    };

    Ok(base("Schedule", &[], &content).into_response())
}

#[cfg(test)]
mod schedule_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode, response::IntoResponse};
    use time::{Duration, OffsetDateTime, macros::date};

    use crate::{
        schedule::{
            Recurrence,
            core::{NewObligation, create_obligation, settle_obligation},
        },
        test_utils::{
            assert_valid_html, create_test_user, get_test_connection, parse_html_document,
            select_text,
        },
        transaction::TransactionType,
    };

    use super::{SchedulePageState, get_schedule_page};

    #[tokio::test]
    async fn lists_obligations_with_status() {
        let connection = get_test_connection();
        let user = create_test_user("test@example.com", &connection);
        let today = OffsetDateTime::now_utc().date();
        let overdue = create_obligation(
            user.id,
            NewObligation::new(
                TransactionType::Expense,
                30.0,
                today - Duration::days(2),
                Recurrence::Once,
            )
            .unwrap()
            .description("Water"),
            &connection,
        )
        .unwrap();
        let paid = create_obligation(
            user.id,
            NewObligation::new(
                TransactionType::Income,
                3000.0,
                date!(2024 - 01 - 05),
                Recurrence::Once,
            )
            .unwrap()
            .description("Salary"),
            &connection,
        )
        .unwrap();
        settle_obligation(
            paid.id,
            user.id,
            3000.0,
            OffsetDateTime::now_utc(),
            &connection,
        )
        .unwrap();
        let state = SchedulePageState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        let response = get_schedule_page(State(state), Extension(user.id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert_eq!(
            select_text(&html, &format!("[data-obligation-row=\"{}\"] [data-status]", overdue.id)),
            vec!["Overdue"]
        );
        assert_eq!(
            select_text(&html, &format!("[data-obligation-row=\"{}\"] [data-status]", paid.id)),
            vec!["Paid"]
        );
    }

    #[tokio::test]
    async fn invalid_timezone_renders_error_page() {
        let connection = get_test_connection();
        let user = create_test_user("test@example.com", &connection);
        let state = SchedulePageState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Not/A_Timezone".to_owned(),
        };

        let response = get_schedule_page(State(state), Extension(user.id))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
