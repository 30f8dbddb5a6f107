//! Groups transactions by calendar month for the dashboard.

use std::collections::BTreeMap;

use time::{Date, Duration, Month};

use crate::transaction::{DateBounds, Totals, TransactionRow, TransactionType};

/// The first day of the month `date` falls in.
pub(super) fn month_start(date: Date) -> Date {
    date - Duration::days(i64::from(date.day()) - 1)
}

/// The last day of the month `date` falls in.
pub(super) fn month_end(date: Date) -> Date {
    // 31 days after the first of a month is always in the next month.
    let next_month = month_start(date) + Duration::days(31);
    month_start(next_month) - Duration::days(1)
}

/// Every day of the month `today` falls in, including days still to come.
pub(super) fn month_bounds(today: Date) -> DateBounds {
    DateBounds {
        start: month_start(today),
        end: month_end(today),
    }
}

/// The first days of the `count` months ending with the month of `today`, oldest first.
pub(super) fn recent_months(today: Date, count: usize) -> Vec<Date> {
    let mut months = Vec::with_capacity(count);
    let mut month = month_start(today);

    for _ in 0..count {
        months.push(month);
        month = month_start(month - Duration::days(1));
    }

    months.reverse();
    months
}

/// The income and expenses of one calendar month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct MonthlySummary {
    /// The first day of the month.
    pub month: Date,
    pub totals: Totals,
}

/// Sum `rows` per month for each of `months`.
///
/// Months without transactions get zero totals and rows outside `months` are ignored.
pub(super) fn summarize_by_month(rows: &[TransactionRow], months: &[Date]) -> Vec<MonthlySummary> {
    let mut totals: BTreeMap<Date, Totals> = months
        .iter()
        .map(|month| (*month, Totals::default()))
        .collect();

    for row in rows {
        let Some(month_totals) = totals.get_mut(&month_start(row.transaction.date)) else {
            continue;
        };

        match row.transaction.transaction_type {
            TransactionType::Income => month_totals.income += row.transaction.amount,
            TransactionType::Expense => month_totals.expenses += row.transaction.amount,
        }
    }

    totals
        .into_iter()
        .map(|(month, totals)| MonthlySummary { month, totals })
        .collect()
}

/// Formats a month as a three-letter abbreviation and year, e.g. "Jan 2025".
pub(super) fn format_month_label(month: Date) -> String {
    let name = match month.month() {
        Month::January => "Jan",
        Month::February => "Feb",
        Month::March => "Mar",
        Month::April => "Apr",
        Month::May => "May",
        Month::June => "Jun",
        Month::July => "Jul",
        Month::August => "Aug",
        Month::September => "Sep",
        Month::October => "Oct",
        Month::November => "Nov",
        Month::December => "Dec",
    };

    format!("{name} {}", month.year())
}

#[cfg(test)]
mod aggregation_tests {
    use time::{OffsetDateTime, macros::date};

    use crate::{
        auth::UserID,
        transaction::{Totals, Transaction, TransactionRow, TransactionType},
    };

    use super::{
        MonthlySummary, format_month_label, month_bounds, month_end, month_start, recent_months,
        summarize_by_month,
    };

    fn row(transaction_type: TransactionType, amount: f64, date: time::Date) -> TransactionRow {
        TransactionRow {
            transaction: Transaction {
                id: 1,
                user_id: UserID::new(1),
                transaction_type,
                amount,
                category_id: 1,
                description: String::new(),
                date,
                goal_id: None,
                created_at: OffsetDateTime::UNIX_EPOCH,
            },
            category_name: "Other".to_owned(),
            category_color: "#6B7280".to_owned(),
        }
    }

    #[test]
    fn month_edges() {
        assert_eq!(month_start(date!(2024 - 02 - 17)), date!(2024 - 02 - 01));
        assert_eq!(month_end(date!(2024 - 02 - 17)), date!(2024 - 02 - 29));
        assert_eq!(month_end(date!(2025 - 02 - 01)), date!(2025 - 02 - 28));
        assert_eq!(month_end(date!(2025 - 01 - 31)), date!(2025 - 01 - 31));
        assert_eq!(month_end(date!(2025 - 12 - 05)), date!(2025 - 12 - 31));

        let bounds = month_bounds(date!(2025 - 04 - 30));
        assert_eq!(bounds.start, date!(2025 - 04 - 01));
        assert_eq!(bounds.end, date!(2025 - 04 - 30));
    }

    #[test]
    fn recent_months_cross_year_boundary() {
        assert_eq!(
            recent_months(date!(2025 - 02 - 15), 4),
            vec![
                date!(2024 - 11 - 01),
                date!(2024 - 12 - 01),
                date!(2025 - 01 - 01),
                date!(2025 - 02 - 01),
            ]
        );
    }

    #[test]
    fn sums_each_month_and_fills_gaps() {
        let months = recent_months(date!(2025 - 03 - 10), 3);
        let rows = [
            row(TransactionType::Income, 100.0, date!(2025 - 03 - 01)),
            row(TransactionType::Expense, 40.0, date!(2025 - 03 - 09)),
            row(TransactionType::Expense, 15.0, date!(2025 - 01 - 31)),
            row(TransactionType::Expense, 99.0, date!(2024 - 12 - 31)),
        ];

        let summaries = summarize_by_month(&rows, &months);

        assert_eq!(
            summaries,
            vec![
                MonthlySummary {
                    month: date!(2025 - 01 - 01),
                    totals: Totals {
                        income: 0.0,
                        expenses: 15.0
                    },
                },
                MonthlySummary {
                    month: date!(2025 - 02 - 01),
                    totals: Totals::default(),
                },
                MonthlySummary {
                    month: date!(2025 - 03 - 01),
                    totals: Totals {
                        income: 100.0,
                        expenses: 40.0
                    },
                },
            ]
        );
    }

    #[test]
    fn formats_month_labels() {
        assert_eq!(format_month_label(date!(2025 - 01 - 01)), "Jan 2025");
        assert_eq!(format_month_label(date!(2024 - 12 - 01)), "Dec 2024");
    }
}
