//! HTTP handlers for the dashboard page.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    auth::UserID,
    category::{Category, get_categories},
    dashboard::{
        aggregation::{MonthlySummary, month_bounds, month_end, recent_months, summarize_by_month},
        tables::monthly_summary_table,
    },
    endpoints,
    goal::{Goal, get_goals, goal_card},
    html::{LINK_STYLE, PAGE_CONTAINER_STYLE, base},
    navigation::NavBar,
    schedule::{ScheduledObligation, get_upcoming_obligations, obligations_table},
    timezone::local_now,
    transaction::{
        DateBounds, Totals, TransactionFilter, TransactionRow, calculate_totals,
        query_transactions, totals_cards,
    },
};

/// How many months the monthly summary table covers.
const SUMMARY_MONTHS: usize = 6;
/// How many unpaid scheduled transactions the dashboard lists.
const UPCOMING_LIMIT: u32 = 5;

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "America/Sao_Paulo".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Everything the dashboard shows, loaded under a single database lock.
struct DashboardData {
    month_totals: Totals,
    monthly_summaries: Vec<MonthlySummary>,
    upcoming: Vec<ScheduledObligation>,
    categories: Vec<Category>,
    goals: Vec<Goal>,
}

/// Display a page with an overview of the user's finances.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let now = local_now(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;

    let data = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        load_dashboard_data(user_id, now, &connection)
            .inspect_err(|error| tracing::error!("could not load dashboard for user {user_id}: {error}"))?
    };

    Ok(dashboard_view(&data, now).into_response())
}

fn load_dashboard_data(
    user_id: UserID,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<DashboardData, Error> {
    let today = now.date();
    let months = recent_months(today, SUMMARY_MONTHS);
    let start = months.first().copied().unwrap_or(today);

    let rows = query_transactions(
        user_id,
        TransactionFilter {
            bounds: Some(DateBounds {
                start,
                end: month_end(today),
            }),
            transaction_type: None,
        },
        connection,
    )?;

    let current_month = month_bounds(today);
    let current_month_rows: Vec<TransactionRow> = rows
        .iter()
        .filter(|row| {
            row.transaction.date >= current_month.start && row.transaction.date <= current_month.end
        })
        .cloned()
        .collect();

    Ok(DashboardData {
        month_totals: calculate_totals(&current_month_rows),
        monthly_summaries: summarize_by_month(&rows, &months),
        upcoming: get_upcoming_obligations(user_id, UPCOMING_LIMIT, connection)?,
        categories: get_categories(user_id, connection)?,
        goals: get_goals(user_id, connection)?,
    })
}

fn upcoming_section(data: &DashboardData, now: OffsetDateTime) -> Markup {
    html! {
        section class="space-y-2" data-upcoming="true"
        {
            header class="flex justify-between items-end"
            {
                h2 class="text-xl font-semibold" { "Upcoming" }
                a href=(endpoints::SCHEDULE_VIEW) class=(LINK_STYLE) { "View schedule" }
            }

            @if data.upcoming.is_empty() {
                p class="text-gray-500 dark:text-gray-400" { "Nothing is due." }
            } @else {
                (obligations_table(&data.upcoming, &data.categories, now, false))
            }
        }
    }
}

fn goals_section(goals: &[Goal]) -> Markup {
    html! {
        section class="space-y-2"
        {
            header class="flex justify-between items-end"
            {
                h2 class="text-xl font-semibold" { "Goals" }
                a href=(endpoints::GOALS_VIEW) class=(LINK_STYLE) { "View goals" }
            }

            @if goals.is_empty() {
                p class="text-gray-500 dark:text-gray-400"
                {
                    "No savings goals yet. "
                    a href=(endpoints::NEW_GOAL_VIEW) class=(LINK_STYLE) { "Create a goal" }
                }
            } @else {
                ul class="grid gap-4 md:grid-cols-2"
                {
                    @for goal in goals {
                        (goal_card(goal))
                    }
                }
            }
        }
    }
}

fn dashboard_view(data: &DashboardData, now: OffsetDateTime) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            div class="space-y-8 w-full lg:max-w-5xl"
            {
                section class="space-y-2"
                {
                    h1 class="text-xl font-bold" { "This Month" }
                    (totals_cards(data.month_totals))
                }

                (upcoming_section(data, now))

                (goals_section(&data.goals))

                (monthly_summary_table(&data.monthly_summaries))
            }
        }
    };

    base("Dashboard", &[], &content)
}
