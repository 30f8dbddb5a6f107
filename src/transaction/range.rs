//! Time ranges for filtering the transactions list.

use serde::Deserialize;
use time::{Date, Duration};

/// A preset window of calendar days ending today, or a custom date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "yesterday")]
    Yesterday,
    #[serde(rename = "7days")]
    Last7Days,
    #[serde(rename = "14days")]
    Last14Days,
    #[default]
    #[serde(rename = "30days")]
    Last30Days,
    #[serde(rename = "custom")]
    Custom,
}

impl TimeRange {
    pub const ALL: [TimeRange; 6] = [
        TimeRange::Today,
        TimeRange::Yesterday,
        TimeRange::Last7Days,
        TimeRange::Last14Days,
        TimeRange::Last30Days,
        TimeRange::Custom,
    ];

    pub fn as_query_value(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Yesterday => "yesterday",
            Self::Last7Days => "7days",
            Self::Last14Days => "14days",
            Self::Last30Days => "30days",
            Self::Custom => "custom",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Yesterday => "Yesterday",
            Self::Last7Days => "Last 7 days",
            Self::Last14Days => "Last 14 days",
            Self::Last30Days => "Last 30 days",
            Self::Custom => "Custom",
        }
    }
}

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateBounds {
    pub start: Date,
    pub end: Date,
}

/// The query string of the transactions page.
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub range: Option<TimeRange>,
    /// First day of a custom range.
    pub start: Option<Date>,
    /// Last day of a custom range.
    pub end: Option<Date>,
}

impl RangeQuery {
    pub fn time_range(&self) -> TimeRange {
        self.range.unwrap_or_default()
    }

    /// The days to show relative to `today`.
    ///
    /// Returns `None` when every transaction should be shown, which is the
    /// case for a custom range that is missing either bound.
    pub fn bounds(&self, today: Date) -> Option<DateBounds> {
        let days_before = |days: i64| DateBounds {
            start: today - Duration::days(days),
            end: today,
        };

        match self.time_range() {
            TimeRange::Today => Some(days_before(0)),
            TimeRange::Yesterday => {
                let yesterday = today - Duration::days(1);
                Some(DateBounds {
                    start: yesterday,
                    end: yesterday,
                })
            }
            TimeRange::Last7Days => Some(days_before(7)),
            TimeRange::Last14Days => Some(days_before(14)),
            TimeRange::Last30Days => Some(days_before(30)),
            TimeRange::Custom => match (self.start, self.end) {
                (Some(start), Some(end)) => Some(DateBounds { start, end }),
                _ => None,
            },
        }
    }
}
