use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use maud::html;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::UserID,
    category::get_categories,
    database_id::TransactionId,
    endpoints::{self, format_endpoint},
    goal::get_goals,
    html::{BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, base, currency_input_styles},
    navigation::NavBar,
    timezone::local_now,
    transaction::{
        form::{TransactionFormDefaults, transaction_form_fields},
        get_transaction,
    },
};

/// The state needed for the edit transaction page.
#[derive(Debug, Clone)]
pub struct EditTransactionPageState {
    /// The local timezone as a canonical timezone name, e.g. "America/Sao_Paulo".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditTransactionPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Renders the page for editing a transaction.
pub async fn get_edit_transaction_page(
    State(state): State<EditTransactionPageState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Response, Error> {
    let today = local_now(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?
        .date();

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    // NotFound renders the 404 page.
    let transaction = get_transaction(transaction_id, user_id, &connection)?;
    let categories = get_categories(user_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;
    let goals = get_goals(user_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve goals: {error}"))?;

    let fields = transaction_form_fields(
        &TransactionFormDefaults {
            transaction_type: transaction.transaction_type,
            amount: Some(transaction.amount),
            date: transaction.date,
            description: Some(&transaction.description),
            category_id: Some(transaction.category_id),
            goal_id: transaction.goal_id,
            max_date: today.max(transaction.date),
        },
        &categories,
        &goals,
    );

    let nav_bar = NavBar::new(endpoints::TRANSACTIONS_VIEW).into_html();
    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Edit Transaction" }

            form
                hx-put=(format_endpoint(endpoints::TRANSACTION, transaction_id))
                hx-target-error="#alert-container"
                class="w-full space-y-4 md:space-y-6"
            {
                (fields)

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Update Transaction" }
            }
        }
    };

    Ok(base("Edit Transaction", &[currency_input_styles()], &content).into_response())
}

#[cfg(test)]
mod edit_transaction_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use time::macros::date;

    use crate::{
        endpoints::{self, format_endpoint},
        test_utils::{
            assert_form_input_with_value, assert_hx_endpoint, assert_valid_html, create_test_user,
            get_test_connection, must_get_form, parse_html_document,
        },
        transaction::{Transaction, TransactionType, create_transaction},
    };

    use super::{EditTransactionPageState, get_edit_transaction_page};

    #[tokio::test]
    async fn prefills_form() {
        let connection = get_test_connection();
        let user = create_test_user("test@example.com", &connection);
        let transaction = create_transaction(
            user.id,
            Transaction::build(TransactionType::Expense, 42.5, date!(2025 - 04 - 02))
                .description("Books"),
            &connection,
        )
        .unwrap();
        let state = EditTransactionPageState {
            local_timezone: "Etc/UTC".to_owned(),
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response =
            get_edit_transaction_page(State(state), Extension(user.id), Path(transaction.id))
                .await
                .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(
            &form,
            &format_endpoint(endpoints::TRANSACTION, transaction.id),
            "hx-put",
        );
        assert_form_input_with_value(&form, "amount", "number", "42.50");
        assert_form_input_with_value(&form, "date", "date", "2025-04-02");
    }

    #[tokio::test]
    async fn missing_transaction_is_not_found() {
        let connection = get_test_connection();
        let user = create_test_user("test@example.com", &connection);
        let state = EditTransactionPageState {
            local_timezone: "Etc/UTC".to_owned(),
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = get_edit_transaction_page(State(state), Extension(user.id), Path(99))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
