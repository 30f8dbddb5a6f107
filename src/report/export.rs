//! Download a report as a CSV file.

use axum::{
    Extension,
    extract::State,
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use axum_extra::extract::Query;

use crate::{
    Error,
    auth::UserID,
    report::{
        core::{ReportQuery, get_report_rows, write_report_csv},
        reports_page::ReportsState,
    },
    timezone::local_now,
};

pub async fn get_report_export(
    State(state): State<ReportsState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, Error> {
    let today = local_now(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?
        .date();

    let rows = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_report_rows(user_id, &query, today, &connection)
            .inspect_err(|error| tracing::error!("could not get report for user {user_id}: {error}"))?
    };

    let csv = write_report_csv(&rows)
        .inspect_err(|error| tracing::error!("could not write report: {error}"))?;

    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"report-{today}.csv\""),
            ),
        ],
        csv,
    )
        .into_response())
}
