//! Categories listing page.

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
    category::{Category, get_categories},
    endpoints,
    html::{
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base, edit_delete_action_links,
    },
    navigation::NavBar,
};

/// The state needed for the categories listing page.
#[derive(Debug, Clone)]
pub struct CategoriesPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoriesPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the user's categories, defaults included.
pub async fn get_categories_page(
    State(state): State<CategoriesPageState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let categories = get_categories(user_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;

    Ok(categories_view(&categories).into_response())
}

fn color_swatch(color: &str) -> Markup {
    html! {
        span
            class="inline-block w-3 h-3 mr-2 rounded-full align-middle"
            style=(format!("background-color: {color};"))
        {}
    }
}

fn categories_view(categories: &[Category]) -> Markup {
    let nav_bar = NavBar::new(endpoints::CATEGORIES_VIEW).into_html();

    let table_row = |category: &Category| {
        let delete_url = endpoints::format_endpoint(endpoints::CATEGORY, category.id);
        let confirm_message = format!(
            "Are you sure you want to delete '{}'? Its transactions will be moved to 'Other'.",
            category.name
        );

        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE)
                {
                    (color_swatch(&category.color))
                    (category.name)
                }

                td class=(TABLE_CELL_STYLE) { (category.category_type.label()) }

                td class=(TABLE_CELL_STYLE)
                {
                    @if category.is_default {
                        span class="text-gray-400" { "Default" }
                    } @else {
                        (edit_delete_action_links(
                            None,
                            &delete_url,
                            &confirm_message,
                            "closest tr",
                            "delete",
                        ))
                    }
                }
            }
        )
    };

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 w-full lg:max-w-3xl"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Categories" }

                    a href=(endpoints::NEW_CATEGORY_VIEW) class=(LINK_STYLE)
                    {
                        "Create Category"
                    }
                }

                table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                        }
                    }

                    tbody
                    {
                        @for category in categories {
                            (table_row(category))
                        }
                    }
                }
            }
        }
    );

    base("Categories", &[], &content)
}

#[cfg(test)]
mod categories_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};
    use scraper::Selector;

    use crate::{
        category::{CategoryName, create_category},
        endpoints,
        test_utils::{
            assert_valid_html, create_test_user, get_test_connection, parse_html_document,
            table_rows,
        },
        transaction::TransactionType,
    };

    use super::{CategoriesPageState, get_categories_page};

    #[tokio::test]
    async fn lists_defaults_and_user_categories() {
        let connection = get_test_connection();
        let user = create_test_user("test@example.com", &connection);
        let category = create_category(
            user.id,
            CategoryName::new_unchecked("Rent"),
            TransactionType::Expense,
            "#FF5722",
            &connection,
        )
        .unwrap();
        let state = CategoriesPageState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = get_categories_page(State(state), Extension(user.id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let rows = table_rows(&html);
        assert_eq!(rows.len(), 3, "got rows {rows:?}");
        assert!(rows.iter().any(|row| row[0] == "Rent" && row[1] == "Expense"));

        let delete_buttons: Vec<_> = html
            .select(&Selector::parse("button[hx-delete]").unwrap())
            .map(|button| button.value().attr("hx-delete").unwrap().to_owned())
            .collect();
        assert_eq!(
            delete_buttons,
            vec![endpoints::format_endpoint(endpoints::CATEGORY, category.id)],
            "only the user's own category should be deletable"
        );
    }
}
