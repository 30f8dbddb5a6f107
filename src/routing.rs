//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{delete, get, post, put},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    auth::{
        auth_guard, auth_guard_hx, get_log_in_page, get_log_out, get_register_page, post_log_in,
        register_user,
    },
    category::{
        create_category_endpoint, delete_category_endpoint, get_categories_page,
        get_new_category_page,
    },
    dashboard::get_dashboard_page,
    endpoints,
    goal::{create_goal_endpoint, delete_goal_endpoint, get_goals_page, get_new_goal_page},
    internal_server_error::get_internal_server_error_page,
    not_found::get_404_not_found,
    report::{get_report_export, get_reports_page},
    schedule::{
        create_scheduled_endpoint, delete_scheduled_endpoint, get_edit_scheduled_page,
        get_new_scheduled_page, get_schedule_page, pay_scheduled_endpoint,
        update_scheduled_endpoint,
    },
    subscription::{
        billing_webhook_endpoint, get_plans_page, subscription_guard, update_plan_config_endpoint,
    },
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, edit_transaction_endpoint,
        get_edit_transaction_page, get_new_transaction_page, get_transactions_page,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(endpoints::USERS, post(register_user))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        )
        .route(endpoints::BILLING_WEBHOOK, post(billing_webhook_endpoint));

    // Paid features. Route layers run after the auth guard below has set the user ID.
    let subscriber_routes = Router::new()
        .route(endpoints::REPORTS_VIEW, get(get_reports_page))
        .route(endpoints::REPORT_EXPORT, get(get_report_export))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            subscription_guard,
        ));

    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::TRANSACTIONS_VIEW, get(get_transactions_page))
        .route(endpoints::NEW_TRANSACTION_VIEW, get(get_new_transaction_page))
        .route(
            endpoints::EDIT_TRANSACTION_VIEW,
            get(get_edit_transaction_page),
        )
        .route(endpoints::SCHEDULE_VIEW, get(get_schedule_page))
        .route(endpoints::NEW_SCHEDULED_VIEW, get(get_new_scheduled_page))
        .route(endpoints::EDIT_SCHEDULED_VIEW, get(get_edit_scheduled_page))
        .route(endpoints::GOALS_VIEW, get(get_goals_page))
        .route(endpoints::NEW_GOAL_VIEW, get(get_new_goal_page))
        .route(endpoints::CATEGORIES_VIEW, get(get_categories_page))
        .route(endpoints::NEW_CATEGORY_VIEW, get(get_new_category_page))
        .route(endpoints::PLANS_VIEW, get(get_plans_page))
        .merge(subscriber_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These POST/PUT/DELETE routes need to use the HX-REDIRECT header for auth redirects to work properly for HTMX requests.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(
                endpoints::TRANSACTIONS_API,
                post(create_transaction_endpoint),
            )
            .route(
                endpoints::TRANSACTION,
                put(edit_transaction_endpoint).delete(delete_transaction_endpoint),
            )
            .route(endpoints::SCHEDULED_API, post(create_scheduled_endpoint))
            .route(
                endpoints::SCHEDULED,
                put(update_scheduled_endpoint).delete(delete_scheduled_endpoint),
            )
            .route(endpoints::PAY_SCHEDULED, post(pay_scheduled_endpoint))
            .route(endpoints::GOALS_API, post(create_goal_endpoint))
            .route(endpoints::GOAL, delete(delete_goal_endpoint))
            .route(endpoints::CATEGORIES_API, post(create_category_endpoint))
            .route(
                endpoints::CATEGORY,
                delete(delete_category_endpoint),
            )
            .route(endpoints::PLAN_CONFIG_API, put(update_plan_config_endpoint))
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx)),
    );

    protected_routes
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}
