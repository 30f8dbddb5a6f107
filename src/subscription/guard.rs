//! Middleware that keeps paid features behind an active subscription.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error, auth::UserID, endpoints, subscription::core::get_subscription,
};

/// The state needed for the subscription middleware.
#[derive(Debug, Clone)]
pub struct SubscriptionGuardState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SubscriptionGuardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Redirects users without an active subscription to the plans page.
///
/// Must run inside [crate::auth::auth_guard] since it reads the [UserID]
/// request extension.
pub async fn subscription_guard(
    State(state): State<SubscriptionGuardState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(user_id) = request.extensions().get::<UserID>().copied() else {
        tracing::error!("subscription guard ran without a user ID, is the auth guard missing?");
        return Redirect::to(endpoints::LOG_IN_VIEW).into_response();
    };

    let is_active = match has_active_subscription(user_id, &state) {
        Ok(is_active) => is_active,
        Err(error) => return error.into_response(),
    };

    if !is_active {
        tracing::debug!("user {user_id} has no active subscription, redirecting to plans page");
        return Redirect::to(endpoints::PLANS_VIEW).into_response();
    }

    next.run(request).await
}

// Takes the lock in its own scope so it is released before the request runs.
fn has_active_subscription(
    user_id: UserID,
    state: &SubscriptionGuardState,
) -> Result<bool, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let subscription = get_subscription(user_id, &connection)
        .inspect_err(|error| tracing::error!("could not get subscription: {error}"))?;

    Ok(subscription.is_some_and(|subscription| subscription.is_active(OffsetDateTime::now_utc())))
}

#[cfg(test)]
mod subscription_guard_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Router,
        http::StatusCode,
        middleware,
        routing::get,
    };
    use axum_test::TestServer;
    use rusqlite::Connection;
    use time::{Duration, OffsetDateTime};

    use crate::{
        auth::UserID,
        endpoints,
        test_utils::{create_test_user, get_test_connection},
    };

    use super::{SubscriptionGuardState, subscription_guard};

    fn insert_subscription(
        user_id: UserID,
        status: &str,
        period_end: OffsetDateTime,
        connection: &Connection,
    ) {
        connection
            .execute(
                "INSERT INTO subscription (user_id, customer_id, subscription_id, status,
                    plan_type, current_period_end)
                 VALUES (?1, 'cus_1', 'sub_1', ?2, 'monthly', ?3)",
                (user_id, status, period_end),
            )
            .unwrap();
    }

    fn server(connection: Connection, user_id: Option<UserID>) -> TestServer {
        let state = SubscriptionGuardState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let mut router = Router::new()
            .route("/paid", get(|| async { "paid content" }))
            .layer(middleware::from_fn_with_state(state, subscription_guard));

        if let Some(user_id) = user_id {
            router = router.layer(Extension(user_id));
        }

        TestServer::try_new(router).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn active_subscription_passes() {
        let connection = get_test_connection();
        let user = create_test_user("test@example.com", &connection);
        insert_subscription(
            user.id,
            "active",
            OffsetDateTime::now_utc() + Duration::days(10),
            &connection,
        );

        let response = server(connection, Some(user.id)).get("/paid").await;

        response.assert_status_ok();
        response.assert_text("paid content");
    }

    #[tokio::test]
    async fn no_subscription_redirects_to_plans() {
        let connection = get_test_connection();
        let user = create_test_user("test@example.com", &connection);

        let response = server(connection, Some(user.id)).get("/paid").await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), endpoints::PLANS_VIEW);
    }

    #[tokio::test]
    async fn lapsed_subscription_redirects_to_plans() {
        let connection = get_test_connection();
        let user = create_test_user("test@example.com", &connection);
        insert_subscription(
            user.id,
            "active",
            OffsetDateTime::now_utc() - Duration::days(1),
            &connection,
        );

        let response = server(connection, Some(user.id)).get("/paid").await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), endpoints::PLANS_VIEW);
    }

    #[tokio::test]
    async fn canceled_subscription_redirects_to_plans() {
        let connection = get_test_connection();
        let user = create_test_user("test@example.com", &connection);
        insert_subscription(
            user.id,
            "canceled",
            OffsetDateTime::now_utc() + Duration::days(10),
            &connection,
        );

        let response = server(connection, Some(user.id)).get("/paid").await;

        response.assert_status(StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn missing_user_redirects_to_log_in() {
        let connection = get_test_connection();

        let response = server(connection, None).get("/paid").await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), endpoints::LOG_IN_VIEW);
    }
}
