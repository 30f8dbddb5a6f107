//! The reports page: totals and a breakdown of the filtered transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
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
    report::core::{ReportQuery, ReportType, get_report_rows},
    timezone::local_now,
    transaction::{
        TimeRange, TransactionRow, TransactionType, calculate_totals, category_breakdown,
        category_summaries, totals_cards, transactions_table,
    },
};

/// The state needed for the reports page and CSV export.
#[derive(Debug, Clone)]
pub struct ReportsState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "America/Sao_Paulo".
    pub local_timezone: String,
}

impl FromRef<AppState> for ReportsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

pub async fn get_reports_page(
    State(state): State<ReportsState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, Error> {
    let today = local_now(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?
        .date();

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let (rows, error_message) = match get_report_rows(user_id, &query, today, &connection) {
        Ok(rows) => (rows, None),
        Err(Error::InvalidDateRange) => (
            Vec::new(),
            Some("The start date must not be after the end date."),
        ),
        Err(error) => {
            tracing::error!("could not get report for user {user_id}: {error}");
            return Err(error);
        }
    };

    Ok(reports_view(&rows, &query, today, error_message).into_response())
}

fn report_filter_form(query: &ReportQuery, today: Date) -> Markup {
    let time_range = query.range_query().time_range();
    let report_type = query.report_type();

    html! {
        form
            method="get"
            action=(endpoints::REPORTS_VIEW)
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
                label for="type" class=(FORM_LABEL_STYLE) { "Type" }

                select id="type" name="type" class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for option in ReportType::ALL {
                        option value=(option.as_query_value()) selected[option == report_type]
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
                "Apply"
            }
        }
    }
}

fn reports_view(
    rows: &[TransactionRow],
    query: &ReportQuery,
    today: Date,
    error_message: Option<&str>,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::REPORTS_VIEW).into_html();
    let totals = calculate_totals(rows);
    let export_url = format!("{}?{}", endpoints::REPORT_EXPORT, query.to_query_string());
    let report_type = query.report_type();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 w-full lg:max-w-5xl"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Reports" }

                    a href=(export_url) class=(LINK_STYLE) download data-export-link { "Export CSV" }
                }

                (report_filter_form(query, today))

                @if let Some(error_message) = error_message {
                    p class="text-red-600 dark:text-red-400" role="alert" { (error_message) }
                }

                (totals_cards(totals))

                div class="grid gap-4 md:grid-cols-2"
                {
                    @if report_type != ReportType::Income {
                        (category_breakdown(
                            "Expenses by category",
                            &category_summaries(rows, TransactionType::Expense),
                        ))
                    }

                    @if report_type != ReportType::Expenses {
                        (category_breakdown(
                            "Income by category",
                            &category_summaries(rows, TransactionType::Income),
                        ))
                    }
                }

                (transactions_table(rows, false))
            }
        }
    };

    base("Reports", &[], &content)
}

#[cfg(test)]
mod reports_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};
    use axum_extra::extract::Query;
    use scraper::Selector;
    use time::{Duration, OffsetDateTime, macros::date};

    use crate::{
        auth::UserID,
        endpoints,
        report::core::{ReportQuery, ReportType},
        test_utils::{
            assert_alert_contains, assert_valid_html, create_test_user, get_test_connection,
            parse_html_document, select_text,
        },
        transaction::{TimeRange, Transaction, TransactionType, create_transaction},
    };

    use super::{ReportsState, get_reports_page};

    fn setup() -> (ReportsState, UserID) {
        let connection = get_test_connection();
        let user = create_test_user("test@example.com", &connection);
        let today = OffsetDateTime::now_utc().date();
        create_transaction(
            user.id,
            Transaction::build(TransactionType::Income, 1000.0, today).description("Salary"),
            &connection,
        )
        .unwrap();
        create_transaction(
            user.id,
            Transaction::build(TransactionType::Expense, 250.0, today - Duration::days(2))
                .description("Rent"),
            &connection,
        )
        .unwrap();

        (
            ReportsState {
                db_connection: Arc::new(Mutex::new(connection)),
                local_timezone: "Etc/UTC".to_owned(),
            },
            user.id,
        )
    }

    #[tokio::test]
    async fn shows_filtered_totals() {
        let (state, user_id) = setup();
        let query = ReportQuery {
            range: Some(TimeRange::Last7Days),
            report_type: Some(ReportType::Expenses),
            ..Default::default()
        };

        let response = get_reports_page(State(state), Extension(user_id), Query(query))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert_eq!(
            select_text(&html, "[data-transaction-row] td:nth-child(2)"),
            vec!["Rent"]
        );
        assert_eq!(select_text(&html, "[data-total=balance]"), vec!["-R$250.00"]);
    }

    #[tokio::test]
    async fn export_link_keeps_filters() {
        let (state, user_id) = setup();
        let query = ReportQuery {
            range: Some(TimeRange::Today),
            report_type: Some(ReportType::Income),
            ..Default::default()
        };

        let response = get_reports_page(State(state), Extension(user_id), Query(query))
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        let link = html
            .select(&Selector::parse("[data-export-link]").unwrap())
            .next()
            .unwrap();
        assert_eq!(
            link.value().attr("href"),
            Some(format!("{}?range=today&type=income", endpoints::REPORT_EXPORT).as_str())
        );
    }

    #[tokio::test]
    async fn backwards_range_shows_error() {
        let (state, user_id) = setup();
        let query = ReportQuery {
            range: Some(TimeRange::Custom),
            start: Some(date!(2025 - 02 - 01)),
            end: Some(date!(2025 - 01 - 01)),
            report_type: None,
        };

        let response = get_reports_page(State(state), Extension(user_id), Query(query))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_alert_contains(&html, "start date must not be after the end date");
        assert!(select_text(&html, "[data-transaction-row]").is_empty());
    }
}
