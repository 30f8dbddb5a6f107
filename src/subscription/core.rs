//! The subscription record kept in sync with the billing provider.

use std::fmt::Display;

use rusqlite::{
    Connection, OptionalExtension, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use time::{Duration, OffsetDateTime};

use crate::{Error, auth::UserID};

/// A subscription within this many days of its period end is about to expire.
pub const EXPIRING_WITHIN: Duration = Duration::days(7);

/// The status the billing provider reports for a subscription in good standing.
pub const ACTIVE_STATUS: &str = "active";

/// How often a subscription is billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanType {
    Monthly,
    Annual,
}

impl PlanType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Annual => "annual",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Monthly => "Monthly",
            Self::Annual => "Annual",
        }
    }
}

impl Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for PlanType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for PlanType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "monthly" => Ok(Self::Monthly),
            "annual" => Ok(Self::Annual),
            other => Err(FromSqlError::Other(
                format!("unrecognized plan type \"{other}\"").into(),
            )),
        }
    }
}

/// A user's paid subscription as last reported by the billing provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub user_id: UserID,
    /// The billing provider's ID for the paying customer.
    pub customer_id: String,
    /// The billing provider's ID for the subscription.
    pub subscription_id: String,
    /// The provider's status string, e.g. "active", "past_due" or "canceled".
    pub status: String,
    pub plan_type: PlanType,
    pub current_period_start: Option<OffsetDateTime>,
    pub current_period_end: Option<OffsetDateTime>,
    pub cancel_at_period_end: bool,
    /// The creation time, in Unix seconds, of the newest billing event applied to the record.
    pub last_event_at: i64,
}

impl Subscription {
    /// Whether the user has paid for the current period.
    ///
    /// A subscription without a period end never lapses on its own.
    pub fn is_active(&self, now: OffsetDateTime) -> bool {
        self.status == ACTIVE_STATUS
            && self
                .current_period_end
                .is_none_or(|period_end| now <= period_end)
    }

    /// Whether the subscription is active but its period ends within [EXPIRING_WITHIN].
    pub fn is_expiring(&self, now: OffsetDateTime) -> bool {
        match self.current_period_end {
            Some(period_end) => self.is_active(now) && period_end <= now + EXPIRING_WITHIN,
            None => false,
        }
    }
}

const SUBSCRIPTION_COLUMNS: &str = "user_id, customer_id, subscription_id, status, plan_type, \
    current_period_start, current_period_end, cancel_at_period_end, last_event_at";

/// Get the user's subscription, or `None` if they never subscribed.
pub fn get_subscription(
    user_id: UserID,
    connection: &Connection,
) -> Result<Option<Subscription>, Error> {
    connection
        .prepare(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscription WHERE user_id = ?1"
        ))?
        .query_row([user_id], map_subscription_row)
        .optional()
        .map_err(|error| error.into())
}

pub fn create_subscription_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS subscription (
            user_id INTEGER PRIMARY KEY,
            customer_id TEXT NOT NULL,
            subscription_id TEXT NOT NULL UNIQUE,
            status TEXT NOT NULL,
            plan_type TEXT NOT NULL CHECK (plan_type IN ('monthly', 'annual')),
            current_period_start TEXT,
            current_period_end TEXT,
            cancel_at_period_end INTEGER NOT NULL DEFAULT 0,
            last_event_at INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE
        );",
    )
}

/// Create the table of billing event IDs that have already been applied.
pub fn create_billing_event_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS billing_event (
            id TEXT PRIMARY KEY,
            type TEXT NOT NULL,
            received_at TEXT NOT NULL
        );",
    )
}

fn map_subscription_row(row: &Row) -> Result<Subscription, rusqlite::Error> {
    Ok(Subscription {
        user_id: UserID::new(row.get(0)?),
        customer_id: row.get(1)?,
        subscription_id: row.get(2)?,
        status: row.get(3)?,
        plan_type: row.get(4)?,
        current_period_start: row.get(5)?,
        current_period_end: row.get(6)?,
        cancel_at_period_end: row.get(7)?,
        last_event_at: row.get(8)?,
    })
}
