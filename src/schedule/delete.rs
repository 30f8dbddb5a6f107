use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error, alert::Alert, auth::UserID, database_id::ObligationId,
    schedule::core::delete_obligation,
};

/// The state needed to delete a scheduled transaction.
#[derive(Debug, Clone)]
pub struct DeleteObligationState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteObligationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Delete a scheduled transaction. Transactions it already recorded are kept.
pub async fn delete_scheduled_endpoint(
    Path(obligation_id): Path<ObligationId>,
    State(state): State<DeleteObligationState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_obligation(obligation_id, user_id, &connection) {
        Ok(()) => Alert::success("Scheduled transaction deleted", "")
            .into_html()
            .into_response(),
        Err(Error::DeleteMissingObligation) => Error::DeleteMissingObligation.into_alert_response(),
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while deleting scheduled transaction {obligation_id}: {error}"
            );
            error.into_alert_response()
        }
    }
}
