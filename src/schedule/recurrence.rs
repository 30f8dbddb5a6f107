//! How often a scheduled transaction repeats.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Deserializer};
use time::{Date, Duration, Month};

/// The interval between occurrences of a scheduled transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Recurrence {
    /// Happens a single time and never rolls over.
    #[default]
    Once,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// A string that does not name a [Recurrence].
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrenceError(pub String);

impl Display for RecurrenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unrecognized recurrence \"{}\"", self.0)
    }
}

impl std::error::Error for RecurrenceError {}

impl Recurrence {
    pub const ALL: [Recurrence; 5] = [
        Recurrence::Once,
        Recurrence::Daily,
        Recurrence::Weekly,
        Recurrence::Monthly,
        Recurrence::Yearly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Once => "once",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Once => "Once",
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
            Self::Yearly => "Yearly",
        }
    }

    /// The date of the occurrence after one due on `date`.
    ///
    /// Monthly and yearly steps keep the day of the month, clamped to the
    /// last day of the target month, so Jan 31 is followed by the last day of
    /// February and Feb 29 by Feb 28 in a common year.
    ///
    /// Returns `None` for [Recurrence::Once], or if the next date would be
    /// past the largest date that can be represented.
    pub fn advance(self, date: Date) -> Option<Date> {
        match self {
            Self::Once => None,
            Self::Daily => date.next_day(),
            Self::Weekly => date.checked_add(Duration::weeks(1)),
            Self::Monthly => {
                let (year, month) = match date.month() {
                    Month::December => (date.year().checked_add(1)?, Month::January),
                    month => (date.year(), month.next()),
                };

                clamped_date(year, month, date.day())
            }
            Self::Yearly => clamped_date(date.year().checked_add(1)?, date.month(), date.day()),
        }
    }
}

/// The date `year`-`month`-`day`, or the last day of the month if `day` is past it.
fn clamped_date(year: i32, month: Month, day: u8) -> Option<Date> {
    let day = day.min(last_day_of_month(year, month)?);

    Date::from_calendar_date(year, month, day).ok()
}

fn last_day_of_month(year: i32, month: Month) -> Option<u8> {
    let first_of_next_month = match month {
        Month::December => Date::from_calendar_date(year.checked_add(1)?, Month::January, 1),
        month => Date::from_calendar_date(year, month.next(), 1),
    };

    // The last representable year has no following month to step back from.
    match first_of_next_month {
        Ok(date) => date.previous_day().map(|date| date.day()),
        Err(_) => Some(31),
    }
}

impl Display for Recurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Recurrence {
    type Err = RecurrenceError;

    /// Parse a recurrence. The empty string means [Recurrence::Once].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "once" => Ok(Self::Once),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(RecurrenceError(s.to_owned())),
        }
    }
}

impl<'de> Deserialize<'de> for Recurrence {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;

        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl ToSql for Recurrence {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Recurrence {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Self::Once),
            value => value
                .as_str()?
                .parse()
                .map_err(|error| FromSqlError::Other(Box::new(error))),
        }
    }
}

#[cfg(test)]
mod recurrence_tests {
    use time::macros::date;

    use super::{Recurrence, RecurrenceError};

    #[test]
    fn parses_known_values() {
        for recurrence in Recurrence::ALL {
            assert_eq!(recurrence.as_str().parse(), Ok(recurrence));
        }

        assert_eq!("".parse(), Ok(Recurrence::Once));
        assert_eq!(" Monthly".parse(), Ok(Recurrence::Monthly));
    }

    #[test]
    fn rejects_unknown_values() {
        assert_eq!(
            "fortnightly".parse::<Recurrence>(),
            Err(RecurrenceError("fortnightly".to_owned()))
        );
    }

    #[test]
    fn once_never_advances() {
        assert_eq!(Recurrence::Once.advance(date!(2024 - 01 - 31)), None);
    }

    #[test]
    fn daily_and_weekly_add_days() {
        assert_eq!(
            Recurrence::Daily.advance(date!(2024 - 12 - 31)),
            Some(date!(2025 - 01 - 01))
        );
        assert_eq!(
            Recurrence::Weekly.advance(date!(2024 - 02 - 26)),
            Some(date!(2024 - 03 - 04))
        );
    }

    #[test]
    fn monthly_clamps_to_month_end() {
        assert_eq!(
            Recurrence::Monthly.advance(date!(2024 - 01 - 31)),
            Some(date!(2024 - 02 - 29))
        );
        assert_eq!(
            Recurrence::Monthly.advance(date!(2023 - 01 - 31)),
            Some(date!(2023 - 02 - 28))
        );
        assert_eq!(
            Recurrence::Monthly.advance(date!(2024 - 03 - 31)),
            Some(date!(2024 - 04 - 30))
        );
        assert_eq!(
            Recurrence::Monthly.advance(date!(2024 - 12 - 15)),
            Some(date!(2025 - 01 - 15))
        );
    }

    #[test]
    fn yearly_clamps_leap_day() {
        assert_eq!(
            Recurrence::Yearly.advance(date!(2024 - 02 - 29)),
            Some(date!(2025 - 02 - 28))
        );
        assert_eq!(
            Recurrence::Yearly.advance(date!(2023 - 06 - 10)),
            Some(date!(2024 - 06 - 10))
        );
    }
}
