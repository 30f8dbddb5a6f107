use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error, alert::Alert, auth::UserID, database_id::GoalId, goal::core::delete_goal,
};

/// The state needed for deleting a goal.
#[derive(Debug, Clone)]
pub struct DeleteGoalState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteGoalState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Delete a goal. Transactions that counted towards it are kept.
pub async fn delete_goal_endpoint(
    Path(goal_id): Path<GoalId>,
    State(state): State<DeleteGoalState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_goal(goal_id, user_id, &connection) {
        Ok(()) => Alert::success("Goal deleted", "")
            .into_html()
            .into_response(),
        Err(Error::DeleteMissingGoal) => Error::DeleteMissingGoal.into_alert_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while deleting goal {goal_id}: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod delete_goal_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Path, State},
        http::StatusCode,
    };
    use time::macros::date;

    use crate::{
        goal::{NewGoal, create_goal, get_goals},
        test_utils::{
            assert_alert_contains, create_test_user, get_test_connection, parse_html_fragment,
        },
        transaction::{Transaction, TransactionType, create_transaction, get_transaction},
    };

    use super::{DeleteGoalState, delete_goal_endpoint};

    #[tokio::test]
    async fn delete_goal_keeps_linked_transactions() {
        let connection = get_test_connection();
        let user = create_test_user("test@example.com", &connection);
        let goal = create_goal(
            user.id,
            NewGoal::new("Car", 1000.0, date!(2025 - 01 - 01), None, "").unwrap(),
            &connection,
        )
        .unwrap();
        let transaction = create_transaction(
            user.id,
            Transaction::build(TransactionType::Income, 100.0, date!(2025 - 02 - 01))
                .goal(Some(goal.id)),
            &connection,
        )
        .unwrap();
        let state = DeleteGoalState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = delete_goal_endpoint(Path(goal.id), State(state.clone()), Extension(user.id))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        assert_alert_contains(&html, "Goal deleted");

        let connection = state.db_connection.lock().unwrap();
        assert_eq!(get_goals(user.id, &connection), Ok(vec![]));
        let transaction = get_transaction(transaction.id, user.id, &connection).unwrap();
        assert_eq!(transaction.goal_id, None);
    }

    #[tokio::test]
    async fn delete_missing_goal_is_not_found() {
        let connection = get_test_connection();
        let user = create_test_user("test@example.com", &connection);
        let state = DeleteGoalState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = delete_goal_endpoint(Path(7), State(state), Extension(user.id)).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
