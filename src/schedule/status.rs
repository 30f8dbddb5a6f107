//! The status badge shown for a scheduled transaction.

use time::OffsetDateTime;

use super::core::{ObligationStatus, ScheduledObligation};

/// A scheduled transaction due within this many days is due soon.
pub const DUE_SOON_DAYS: i64 = 3;

/// How urgent a scheduled transaction is, derived from its due date.
///
/// Only [DisplayStatus::Paid] is stored, the rest depend on the current day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayStatus {
    Paid,
    Overdue,
    DueToday,
    DueSoon,
    Pending,
}

impl DisplayStatus {
    /// A key that does not depend on the display language, e.g. for CSS hooks.
    pub fn key(self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::DueToday => "due_today",
            Self::DueSoon => "due_soon",
            Self::Pending => "pending",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Paid => "Paid",
            Self::Overdue => "Overdue",
            Self::DueToday => "Due today",
            Self::DueSoon => "Due soon",
            Self::Pending => "Pending",
        }
    }

    pub fn badge_style(self) -> &'static str {
        match self {
            Self::Paid => "bg-green-100 text-green-800 border-green-200",
            Self::Overdue => "bg-red-100 text-red-800 border-red-200",
            Self::DueToday => "bg-orange-100 text-orange-800 border-orange-200",
            Self::DueSoon => "bg-yellow-100 text-yellow-800 border-yellow-200",
            Self::Pending => "bg-gray-100 text-gray-800 border-gray-200",
        }
    }
}

/// Classify `obligation` relative to `now`.
///
/// Days are counted between calendar dates in the offset of `now`, so the
/// time of day never matters: anything due on today's date is due today,
/// not overdue.
pub fn derive_display_status(obligation: &ScheduledObligation, now: OffsetDateTime) -> DisplayStatus {
    if obligation.status == ObligationStatus::Paid {
        return DisplayStatus::Paid;
    }

    let days_until_due = (obligation.due_date() - now.date()).whole_days();

    match days_until_due {
        ..0 => DisplayStatus::Overdue,
        0 => DisplayStatus::DueToday,
        1..=DUE_SOON_DAYS => DisplayStatus::DueSoon,
        _ => DisplayStatus::Pending,
    }
}

#[cfg(test)]
mod derive_display_status_tests {
    use time::{Date, Duration, OffsetDateTime, UtcOffset, macros::{date, datetime}};

    use crate::{
        auth::UserID,
        schedule::{
            Recurrence,
            core::{ObligationStatus, ScheduledObligation},
        },
        transaction::TransactionType,
    };

    use super::{DisplayStatus, derive_display_status};

    fn obligation(scheduled_date: Date, status: ObligationStatus) -> ScheduledObligation {
        ScheduledObligation {
            id: 1,
            user_id: UserID::new(1),
            transaction_type: TransactionType::Expense,
            amount: 100.0,
            category_id: None,
            description: "Rent".to_owned(),
            scheduled_date,
            recurrence: Recurrence::Monthly,
            goal_id: None,
            status,
            paid_date: None,
            paid_amount: None,
            last_execution_date: None,
            next_execution_date: None,
        }
    }

    fn pending_due_in(days: i64, now: OffsetDateTime) -> ScheduledObligation {
        obligation(now.date() + Duration::days(days), ObligationStatus::Pending)
    }

    #[test]
    fn paid_wins_regardless_of_date() {
        let now = datetime!(2025-06-15 12:00 UTC);

        for days in [-30, -1, 0, 2, 30] {
            let mut paid = pending_due_in(days, now);
            paid.status = ObligationStatus::Paid;

            assert_eq!(derive_display_status(&paid, now), DisplayStatus::Paid);
        }
    }

    #[test]
    fn boundaries() {
        let now = datetime!(2025-06-15 12:00 UTC);
        let cases = [
            (-10, DisplayStatus::Overdue),
            (-1, DisplayStatus::Overdue),
            (0, DisplayStatus::DueToday),
            (1, DisplayStatus::DueSoon),
            (2, DisplayStatus::DueSoon),
            (3, DisplayStatus::DueSoon),
            (4, DisplayStatus::Pending),
            (10, DisplayStatus::Pending),
        ];

        for (days, want) in cases {
            let got = derive_display_status(&pending_due_in(days, now), now);

            assert_eq!(got, want, "due in {days} days");
        }
    }

    #[test]
    fn time_of_day_does_not_matter() {
        let due_today = obligation(date!(2025 - 06 - 15), ObligationStatus::Pending);

        for now in [
            datetime!(2025-06-15 00:00 UTC),
            datetime!(2025-06-15 23:59:59 UTC),
        ] {
            assert_eq!(derive_display_status(&due_today, now), DisplayStatus::DueToday);
        }
    }

    #[test]
    fn uses_calendar_day_of_the_given_offset() {
        let due_today = obligation(date!(2025 - 06 - 15), ObligationStatus::Pending);
        // 01:00 UTC on the 16th is still the 15th in São Paulo.
        let now = datetime!(2025-06-16 01:00 UTC).to_offset(UtcOffset::from_hms(-3, 0, 0).unwrap());

        assert_eq!(derive_display_status(&due_today, now), DisplayStatus::DueToday);
    }

    #[test]
    fn next_execution_date_takes_precedence() {
        let now = datetime!(2025-06-15 12:00 UTC);
        let mut rolled = obligation(date!(2025 - 05 - 01), ObligationStatus::Pending);
        rolled.next_execution_date = Some(date!(2025 - 06 - 17));

        assert_eq!(derive_display_status(&rolled, now), DisplayStatus::DueSoon);
    }

    #[test]
    fn is_idempotent() {
        let now = datetime!(2025-06-15 12:00 UTC);
        let due = pending_due_in(2, now);

        assert_eq!(
            derive_display_status(&due, now),
            derive_display_status(&due, now)
        );
    }
}
