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
    goal::get_goals,
    html::{BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, base, currency_input_styles},
    navigation::NavBar,
    timezone::local_now,
    transaction::{
        TransactionType,
        form::{TransactionFormDefaults, transaction_form_fields},
    },
};

/// The state needed for the new transaction page.
#[derive(Debug, Clone)]
pub struct NewTransactionPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "America/Sao_Paulo".
    pub local_timezone: String,
}

impl FromRef<AppState> for NewTransactionPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Renders the page for creating a transaction.
pub async fn get_new_transaction_page(
    State(state): State<NewTransactionPageState>,
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

    let fields = transaction_form_fields(
        &TransactionFormDefaults {
            transaction_type: TransactionType::Expense,
            amount: None,
            date: today,
            description: None,
            category_id: None,
            goal_id: None,
            max_date: today,
        },
        &categories,
        &goals,
    );

    let nav_bar = NavBar::new(endpoints::NEW_TRANSACTION_VIEW).into_html();
    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Create Transaction" }

            form
                hx-post=(endpoints::TRANSACTIONS_API)
                hx-target-error="#alert-container"
                class="w-full space-y-4 md:space-y-6"
            {
                (fields)

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create Transaction" }
            }
        }
    };

    Ok(base("Create Transaction", &[currency_input_styles()], &content).into_response())
}

#[cfg(test)]
mod new_transaction_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};
    use scraper::Selector;
    use time::macros::date;

    use crate::{
        category::{CategoryName, create_category},
        endpoints,
        goal::{NewGoal, create_goal},
        test_utils::{
            assert_content_type, assert_form_input, assert_form_submit_button, assert_hx_endpoint,
            assert_valid_html, create_test_user, get_test_connection, must_get_form,
            parse_html_document,
        },
        transaction::TransactionType,
    };

    use super::{NewTransactionPageState, get_new_transaction_page};

    #[tokio::test]
    async fn render_page() {
        let connection = get_test_connection();
        let user = create_test_user("test@example.com", &connection);
        create_category(
            user.id,
            CategoryName::new_unchecked("Rent"),
            TransactionType::Expense,
            "",
            &connection,
        )
        .unwrap();
        create_goal(
            user.id,
            NewGoal::new("Car", 100.0, date!(2025 - 01 - 01), None, "").unwrap(),
            &connection,
        )
        .unwrap();
        let state = NewTransactionPageState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        let response = get_new_transaction_page(State(state), Extension(user.id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_content_type(&response, "text/html; charset=utf-8");
        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::TRANSACTIONS_API, "hx-post");
        assert_form_input(&form, "amount", "number");
        assert_form_input(&form, "date", "date");
        assert_form_submit_button(&form);

        let category_options: Vec<_> = form
            .select(&Selector::parse("select[name=category_id] option").unwrap())
            .map(|option| option.text().collect::<String>())
            .collect();
        assert_eq!(category_options, vec!["Other", "Rent (Expense)"]);
        let goal_options = form
            .select(&Selector::parse("select[name=goal_id] option").unwrap())
            .count();
        assert_eq!(goal_options, 2);
    }
}
