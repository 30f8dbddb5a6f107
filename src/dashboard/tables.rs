//! Table views for dashboard data display.

use maud::{Markup, html};

use crate::{
    dashboard::aggregation::{MonthlySummary, format_month_label},
    html::{TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, format_currency},
};

const TABLE_CELL_GREEN_STYLE: &str = "text-green-600 dark:text-green-400";
const TABLE_CELL_RED_STYLE: &str = "text-red-600 dark:text-red-400";

/// Gets the CSS class for coloring amounts (green for positive, red for negative).
fn amount_color_class(amount: f64) -> &'static str {
    if amount >= 0.0 {
        TABLE_CELL_GREEN_STYLE
    } else {
        TABLE_CELL_RED_STYLE
    }
}

/// Renders a table with the income, expenses and balance of each month, newest first.
pub(super) fn monthly_summary_table(summaries: &[MonthlySummary]) -> Markup {
    html! {
        div
        {
            h3 class="text-xl font-semibold mb-4" { "Monthly Summary" }

            div class="overflow-x-auto rounded-lg shadow"
            {
                table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Month" }
                            th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Income" }
                            th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Expenses" }
                            th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Balance" }
                        }
                    }

                    tbody
                    {
                        @for summary in summaries.iter().rev() {
                            @let balance = summary.totals.balance();

                            tr class=(TABLE_ROW_STYLE) data-month-row=(summary.month)
                            {
                                th scope="row" class={ (TABLE_CELL_STYLE) " font-medium text-gray-900 dark:text-white" }
                                {
                                    (format_month_label(summary.month))
                                }
                                td class={ (TABLE_CELL_STYLE) " text-right" }
                                {
                                    (format_currency(summary.totals.income))
                                }
                                td class={ (TABLE_CELL_STYLE) " text-right" }
                                {
                                    (format_currency(summary.totals.expenses))
                                }
                                td class={ (TABLE_CELL_STYLE) " text-right " (amount_color_class(balance)) }
                                {
                                    (format_currency(balance))
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
