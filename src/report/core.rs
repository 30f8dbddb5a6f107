//! Report filters and the CSV rendering of a report.

use rusqlite::Connection;
use serde::Deserialize;
use time::Date;

use crate::{
    Error,
    auth::UserID,
    transaction::{
        RangeQuery, TimeRange, TransactionFilter, TransactionRow, TransactionType,
        query_transactions,
    },
};

/// The column headers of the CSV export.
pub const CSV_HEADERS: [&str; 5] = ["Date", "Type", "Category", "Description", "Amount"];

/// Which kind of transactions a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ReportType {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "income")]
    Income,
    #[serde(rename = "expenses")]
    Expenses,
}

impl ReportType {
    pub const ALL: [ReportType; 3] = [ReportType::All, ReportType::Income, ReportType::Expenses];

    pub fn as_query_value(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Income => "income",
            Self::Expenses => "expenses",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Income => "Income",
            Self::Expenses => "Expenses",
        }
    }

    fn transaction_type(self) -> Option<TransactionType> {
        match self {
            Self::All => None,
            Self::Income => Some(TransactionType::Income),
            Self::Expenses => Some(TransactionType::Expense),
        }
    }
}

/// The query string shared by the reports page and the CSV export.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub range: Option<TimeRange>,
    pub start: Option<Date>,
    pub end: Option<Date>,
    #[serde(rename = "type")]
    pub report_type: Option<ReportType>,
}

impl ReportQuery {
    pub fn range_query(&self) -> RangeQuery {
        RangeQuery {
            range: self.range,
            start: self.start,
            end: self.end,
        }
    }

    pub fn report_type(&self) -> ReportType {
        self.report_type.unwrap_or_default()
    }

    /// The query string that reproduces this report, without the leading '?'.
    pub fn to_query_string(&self) -> String {
        let mut pairs = vec![
            ("range", self.range_query().time_range().as_query_value().to_owned()),
            ("type", self.report_type().as_query_value().to_owned()),
        ];

        if let Some(start) = self.start {
            pairs.push(("start", start.to_string()));
        }

        if let Some(end) = self.end {
            pairs.push(("end", end.to_string()));
        }

        // Encoding string pairs cannot fail.
        serde_urlencoded::to_string(&pairs).unwrap_or_default()
    }
}

/// Get the transactions a report covers, newest first.
///
/// # Errors
/// Returns [Error::InvalidDateRange] if a custom range starts after it ends.
pub fn get_report_rows(
    user_id: UserID,
    query: &ReportQuery,
    today: Date,
    connection: &Connection,
) -> Result<Vec<TransactionRow>, Error> {
    let bounds = query.range_query().bounds(today);

    if bounds.is_some_and(|bounds| bounds.start > bounds.end) {
        return Err(Error::InvalidDateRange);
    }

    let filter = TransactionFilter {
        bounds,
        transaction_type: query.report_type().transaction_type(),
    };

    query_transactions(user_id, filter, connection)
}

/// Render `rows` as CSV with [CSV_HEADERS] as the first line.
///
/// # Errors
/// Returns [Error::CsvError] if a record cannot be written.
pub fn write_report_csv(rows: &[TransactionRow]) -> Result<String, Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let to_error = |error: csv::Error| Error::CsvError(error.to_string());

    writer.write_record(CSV_HEADERS).map_err(to_error)?;

    for row in rows {
        let transaction = &row.transaction;
        writer
            .write_record([
                transaction.date.to_string(),
                transaction.transaction_type.label().to_owned(),
                row.category_name.clone(),
                transaction.description.clone(),
                format!("{:.2}", transaction.amount),
            ])
            .map_err(to_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))?;

    String::from_utf8(bytes).map_err(|error| Error::CsvError(error.to_string()))
}
