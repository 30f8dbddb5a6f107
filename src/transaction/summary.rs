//! Totals and per-category breakdowns of a list of transactions.

use crate::database_id::CategoryId;

use super::{core::TransactionType, query::TransactionRow};

/// The money in, money out and what is left over.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    pub income: f64,
    pub expenses: f64,
}

impl Totals {
    pub fn balance(&self) -> f64 {
        self.income - self.expenses
    }
}

pub fn calculate_totals(rows: &[TransactionRow]) -> Totals {
    rows.iter().fold(Totals::default(), |mut totals, row| {
        match row.transaction.transaction_type {
            TransactionType::Income => totals.income += row.transaction.amount,
            TransactionType::Expense => totals.expenses += row.transaction.amount,
        }

        totals
    })
}

/// How much of the income or expenses went to one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    pub category_id: CategoryId,
    pub name: String,
    pub color: String,
    pub amount: f64,
    /// Share of the total for the transaction type as a whole percentage.
    pub percent: u8,
}

/// Group the rows of one transaction type by category, largest amount first.
pub fn category_summaries(
    rows: &[TransactionRow],
    transaction_type: TransactionType,
) -> Vec<CategorySummary> {
    let mut summaries: Vec<CategorySummary> = Vec::new();
    let mut total = 0.0;

    for row in rows
        .iter()
        .filter(|row| row.transaction.transaction_type == transaction_type)
    {
        total += row.transaction.amount;

        match summaries
            .iter_mut()
            .find(|summary| summary.category_id == row.transaction.category_id)
        {
            Some(summary) => summary.amount += row.transaction.amount,
            None => summaries.push(CategorySummary {
                category_id: row.transaction.category_id,
                name: row.category_name.clone(),
                color: row.category_color.clone(),
                amount: row.transaction.amount,
                percent: 0,
            }),
        }
    }

    for summary in &mut summaries {
        summary.percent = if total > 0.0 {
            (summary.amount / total * 100.0).round() as u8
        } else {
            0
        };
    }

    summaries.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    summaries
}
