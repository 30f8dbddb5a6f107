//! The page listing savings goals and their progress.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::UserID,
    endpoints,
    goal::{Goal, core::progress_color, get_goals},
    html::{
        CARD_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, base, edit_delete_action_links,
        format_currency, progress_bar,
    },
    navigation::NavBar,
};

/// The state needed for the goals page.
#[derive(Debug, Clone)]
pub struct GoalsPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for GoalsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

pub async fn get_goals_page(
    State(state): State<GoalsPageState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let goals = get_goals(user_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve goals: {error}"))?;

    let nav_bar = NavBar::new(endpoints::GOALS_VIEW).into_html();
    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 w-full lg:max-w-5xl"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Goals" }

                    a href=(endpoints::NEW_GOAL_VIEW) class=(LINK_STYLE) { "Create Goal" }
                }

                @if goals.is_empty() {
                    p class="text-gray-500 dark:text-gray-400"
                    {
                        "You have no savings goals yet. "
                        a href=(endpoints::NEW_GOAL_VIEW) class=(LINK_STYLE)
                        {
                            "Create your first goal"
                        }
                    }
                } @else {
                    ul class="grid gap-4 md:grid-cols-2 lg:grid-cols-3"
                    {
                        @for goal in &goals {
                            (goal_card(goal))
                        }
                    }
                }
            }
        }
    };

    Ok(base("Goals", &[], &content).into_response())
}

/// A card with the goal's name, saved amount and a progress bar.
pub fn goal_card(goal: &Goal) -> Markup {
    let percent = goal.progress_percent();
    let delete_url = endpoints::format_endpoint(endpoints::GOAL, goal.id);
    let confirm_message = format!(
        "Are you sure you want to delete '{}'? Linked transactions are kept.",
        goal.name
    );

    html! {
        li class=(CARD_STYLE) data-goal-card="true"
        {
            div class="flex items-center justify-between"
            {
                h3 class="font-semibold text-lg"
                {
                    span
                        class="inline-block w-3 h-3 mr-2 rounded-full"
                        style=(format!("background-color: {};", goal.color))
                    {}
                    (goal.name)
                }

                span class="text-sm font-medium" { (percent) "%" }
            }

            div class="mt-3 text-sm flex justify-between items-baseline"
            {
                span class="font-medium" { (format_currency(goal.current_amount)) }
                span class="text-xs text-gray-500" { "of " (format_currency(goal.target_amount)) }
            }

            div class="mt-2" { (progress_bar(percent as f64, progress_color(percent))) }

            div class="mt-1 flex justify-between text-xs text-gray-500"
            {
                span { (format_currency(goal.remaining_amount())) " remaining" }

                @if let Some(deadline) = goal.deadline {
                    span { "Due " (deadline) }
                }
            }

            div class="mt-2 text-sm"
            {
                (edit_delete_action_links(
                    None,
                    &delete_url,
                    &confirm_message,
                    "closest [data-goal-card='true']",
                    "delete",
                ))
            }
        }
    }
}
