//! HTML for transaction tables, totals and category breakdowns.
//!
//! The transactions, dashboard and reports pages all render these.

use maud::{Markup, html};

use crate::{
    endpoints,
    html::{
        CARD_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        edit_delete_action_links, format_currency, progress_bar,
    },
    transaction::{
        TransactionType,
        query::TransactionRow,
        summary::{CategorySummary, Totals},
    },
};

/// Income, expenses and balance side by side.
pub fn totals_cards(totals: Totals) -> Markup {
    let balance = totals.balance();
    let balance_style = if balance < 0.0 {
        "text-red-600 dark:text-red-400"
    } else {
        "text-emerald-600 dark:text-emerald-400"
    };

    html! {
        div class="grid gap-4 sm:grid-cols-3" data-totals="true"
        {
            div class=(CARD_STYLE)
            {
                h3 class="text-sm text-gray-500 dark:text-gray-400" { "Income" }
                p class="text-2xl font-bold text-emerald-600 dark:text-emerald-400" data-total="income"
                {
                    (format_currency(totals.income))
                }
            }

            div class=(CARD_STYLE)
            {
                h3 class="text-sm text-gray-500 dark:text-gray-400" { "Expenses" }
                p class="text-2xl font-bold text-red-600 dark:text-red-400" data-total="expenses"
                {
                    (format_currency(totals.expenses))
                }
            }

            div class=(CARD_STYLE)
            {
                h3 class="text-sm text-gray-500 dark:text-gray-400" { "Balance" }
                p class={ "text-2xl font-bold " (balance_style) } data-total="balance"
                {
                    (format_currency(balance))
                }
            }
        }
    }
}

/// A list of categories with their share of the total.
pub fn category_breakdown(title: &str, summaries: &[CategorySummary]) -> Markup {
    html! {
        section class=(CARD_STYLE)
        {
            h3 class="font-semibold mb-3" { (title) }

            @if summaries.is_empty() {
                p class="text-sm text-gray-500" { "Nothing recorded in this period." }
            } @else {
                ul class="space-y-3"
                {
                    @for summary in summaries {
                        li data-category-summary=(summary.name)
                        {
                            div class="flex justify-between text-sm mb-1"
                            {
                                span { (summary.name) }
                                span { (format_currency(summary.amount)) " (" (summary.percent) "%)" }
                            }

                            (progress_bar(summary.percent as f64, &summary.color))
                        }
                    }
                }
            }
        }
    }
}

fn amount_cell(transaction_type: TransactionType, amount: f64) -> Markup {
    match transaction_type {
        TransactionType::Income => html! {
            span class="text-emerald-600 dark:text-emerald-400" { (format_currency(amount)) }
        },
        TransactionType::Expense => html! {
            span class="text-red-600 dark:text-red-400" { (format_currency(-amount)) }
        },
    }
}

/// A table of transactions, optionally with edit and delete links on each row.
pub fn transactions_table(rows: &[TransactionRow], show_actions: bool) -> Markup {
    let table_row = |row: &TransactionRow| {
        let transaction = &row.transaction;
        let edit_url = endpoints::format_endpoint(endpoints::EDIT_TRANSACTION_VIEW, transaction.id);
        let delete_url = endpoints::format_endpoint(endpoints::TRANSACTION, transaction.id);
        let confirm_message = format!(
            "Are you sure you want to delete the transaction '{}'? This cannot be undone.",
            transaction.description
        );

        html! {
            tr class=(TABLE_ROW_STYLE) data-transaction-row="true"
            {
                td class=(TABLE_CELL_STYLE) { (transaction.date) }
                td class=(TABLE_CELL_STYLE) { (transaction.description) }
                td class=(TABLE_CELL_STYLE)
                {
                    span
                        class="inline-block w-3 h-3 mr-2 rounded-full align-middle"
                        style=(format!("background-color: {};", row.category_color))
                    {}
                    (row.category_name)
                }
                td class=(TABLE_CELL_STYLE) { (transaction.transaction_type.label()) }
                td class={ (TABLE_CELL_STYLE) " text-right" }
                {
                    (amount_cell(transaction.transaction_type, transaction.amount))
                }

                @if show_actions {
                    td class={ (TABLE_CELL_STYLE) " space-x-2" }
                    {
                        (edit_delete_action_links(
                            Some(&edit_url),
                            &delete_url,
                            &confirm_message,
                            "closest tr",
                            "delete",
                        ))
                    }
                }
            }
        }
    };

    html! {
        div class="overflow-x-auto rounded shadow-md"
        {
            table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                        th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Amount" }

                        @if show_actions {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                        }
                    }
                }

                tbody
                {
                    @for row in rows {
                        (table_row(row))
                    }

                    @if rows.is_empty() {
                        tr
                        {
                            td colspan="6" class={ (TABLE_CELL_STYLE) " text-center" }
                            {
                                "No transactions found."
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod view_tests {
    use scraper::Html;

    use crate::{
        test_utils::select_text,
        transaction::summary::{CategorySummary, Totals},
    };

    use super::{category_breakdown, totals_cards};

    #[test]
    fn totals_show_negative_balance() {
        let markup = totals_cards(Totals {
            income: 100.0,
            expenses: 250.5,
        });
        let html = Html::parse_fragment(&markup.into_string());

        assert_eq!(select_text(&html, "[data-total=income]"), vec!["R$100.00"]);
        assert_eq!(select_text(&html, "[data-total=expenses]"), vec!["R$250.50"]);
        assert_eq!(select_text(&html, "[data-total=balance]"), vec!["-R$150.50"]);
    }

    #[test]
    fn breakdown_lists_percentages() {
        let markup = category_breakdown(
            "Expenses by category",
            &[CategorySummary {
                category_id: 1,
                name: "Food".to_owned(),
                color: "#FF0000".to_owned(),
                amount: 40.0,
                percent: 100,
            }],
        );
        let html = Html::parse_fragment(&markup.into_string());

        assert_eq!(
            select_text(&html, "[data-category-summary] span + span"),
            vec!["R$40.00 (100%)"]
        );
    }
}
