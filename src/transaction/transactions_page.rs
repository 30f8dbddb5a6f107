//! The transactions page: a filterable list with totals.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
// axum_extra's Query reads the empty custom date inputs as None.
use axum_extra::extract::Query;
use maud::{Markup, html};
use rusqlite::Connection;
use time::Date;

use crate::{
    AppState, Error,
    auth::UserID,
    endpoints,
    html::{FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, base},
    navigation::NavBar,
    timezone::local_now,
    transaction::{
        TransactionType,
        query::{TransactionFilter, TransactionRow, query_transactions},
        range::{RangeQuery, TimeRange},
        summary::{calculate_totals, category_summaries},
        view::{category_breakdown, totals_cards, transactions_table},
    },
};

/// The state needed for the transactions page.
#[derive(Debug, Clone)]
pub struct TransactionsViewState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "America/Sao_Paulo".
    pub local_timezone: String,
}

impl FromRef<AppState> for TransactionsViewState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Render the user's transactions within the requested time range.
pub async fn get_transactions_page(
    State(state): State<TransactionsViewState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<RangeQuery>,
) -> Result<Response, Error> {
    let today = local_now(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?
        .date();

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let filter = TransactionFilter {
        bounds: query.bounds(today),
        transaction_type: None,
    };
    let rows = query_transactions(user_id, filter, &connection)
        .inspect_err(|error| tracing::error!("could not get transactions: {error}"))?;

    Ok(transactions_view(&rows, &query, today).into_response())
}

fn range_filter_form(query: &RangeQuery, today: Date) -> Markup {
    let time_range = query.time_range();

    html! {
        form
            method="get"
            action=(endpoints::TRANSACTIONS_VIEW)
            class="flex flex-wrap items-end gap-4"
        {
            div
            {
                label for="range" class=(FORM_LABEL_STYLE) { "Period" }

                select id="range" name="range" class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for option in TimeRange::ALL {
                        option value=(option.as_query_value()) selected[option == time_range]
                        {
                            (option.label())
                        }
                    }
                }
            }

            div
            {
                label for="start" class=(FORM_LABEL_STYLE) { "From" }

                input
                    id="start"
                    name="start"
                    type="date"
                    max=(today)
                    value=[query.start]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="end" class=(FORM_LABEL_STYLE) { "To" }

                input
                    id="end"
                    name="end"
                    type="date"
                    max=(today)
                    value=[query.end]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            button type="submit" class="px-4 py-2 bg-emerald-600 hover:bg-emerald-700 text-white rounded"
            {
                "Filter"
            }
        }
    }
}

fn transactions_view(rows: &[TransactionRow], query: &RangeQuery, today: Date) -> Markup {
    let nav_bar = NavBar::new(endpoints::TRANSACTIONS_VIEW).into_html();
    let totals = calculate_totals(rows);
    let expense_summaries = category_summaries(rows, TransactionType::Expense);
    let income_summaries = category_summaries(rows, TransactionType::Income);

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 w-full lg:max-w-5xl"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Transactions" }

                    a href=(endpoints::NEW_TRANSACTION_VIEW) class=(LINK_STYLE)
                    {
                        "Create Transaction"
                    }
                }

                (range_filter_form(query, today))

                (totals_cards(totals))

                div class="grid gap-4 md:grid-cols-2"
                {
                    (category_breakdown("Expenses by category", &expense_summaries))
                    (category_breakdown("Income by category", &income_summaries))
                }

                (transactions_table(rows, true))
            }
        }
    };

    base("Transactions", &[], &content)
}
