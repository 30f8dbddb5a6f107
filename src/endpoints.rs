//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/goals/{goal_id}', use [format_endpoint].

/// The root route which redirects to the dashboard or log in page.
pub const ROOT: &str = "/";
/// The landing page for logged in users.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The page for displaying a user's transactions.
pub const TRANSACTIONS_VIEW: &str = "/transactions";
/// The page for creating a new transaction.
pub const NEW_TRANSACTION_VIEW: &str = "/transactions/new";
/// The page for editing an existing transaction.
pub const EDIT_TRANSACTION_VIEW: &str = "/transactions/{transaction_id}/edit";
/// The page listing scheduled transactions.
pub const SCHEDULE_VIEW: &str = "/schedule";
/// The page for scheduling a new transaction.
pub const NEW_SCHEDULED_VIEW: &str = "/schedule/new";
/// The page for editing a scheduled transaction.
pub const EDIT_SCHEDULED_VIEW: &str = "/schedule/{obligation_id}/edit";
/// The page listing savings goals.
pub const GOALS_VIEW: &str = "/goals";
/// The page for creating a new savings goal.
pub const NEW_GOAL_VIEW: &str = "/goals/new";
/// The page listing categories.
pub const CATEGORIES_VIEW: &str = "/categories";
/// The page for creating a new category.
pub const NEW_CATEGORY_VIEW: &str = "/categories/new";
/// The page showing the user's subscription and the available plans.
pub const PLANS_VIEW: &str = "/plans";
/// The page for filtering and summarising transactions.
pub const REPORTS_VIEW: &str = "/reports";
/// The CSV download of a report.
pub const REPORT_EXPORT: &str = "/reports/export.csv";
/// The route for getting the registration page.
pub const REGISTER_VIEW: &str = "/register";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to access users.
pub const USERS: &str = "/api/users";
/// The route to create a transaction.
pub const TRANSACTIONS_API: &str = "/api/transactions";
/// The route to update or delete a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route to create a scheduled transaction.
pub const SCHEDULED_API: &str = "/api/schedule";
/// The route to update or delete a scheduled transaction.
pub const SCHEDULED: &str = "/api/schedule/{obligation_id}";
/// The route to mark a scheduled transaction as paid.
pub const PAY_SCHEDULED: &str = "/api/schedule/{obligation_id}/pay";
/// The route to create a goal.
pub const GOALS_API: &str = "/api/goals";
/// The route to delete a goal.
pub const GOAL: &str = "/api/goals/{goal_id}";
/// The route to create a category.
pub const CATEGORIES_API: &str = "/api/categories";
/// The route to delete a category.
pub const CATEGORY: &str = "/api/categories/{category_id}";
/// The route for admins to update the plan configuration.
pub const PLAN_CONFIG_API: &str = "/api/plans";
/// The route the billing provider sends subscription events to.
pub const BILLING_WEBHOOK: &str = "/api/billing/webhook";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/goals/{goal_id}', '{goal_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|offset| param_start + offset + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
