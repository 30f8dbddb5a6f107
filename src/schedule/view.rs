//! HTML for status badges and tables of scheduled transactions.

use maud::{Markup, html};
use time::OffsetDateTime;

use crate::{
    category::Category,
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_PAY_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        edit_delete_action_links, format_currency,
    },
    schedule::{
        DisplayStatus, ScheduledObligation,
        core::ObligationStatus,
        derive_display_status,
    },
    transaction::TransactionType,
};

pub fn status_badge(status: DisplayStatus) -> Markup {
    html! {
        span
            class={ "inline-block px-2 py-0.5 text-xs font-medium rounded border " (status.badge_style()) }
            data-status=(status.key())
        {
            (status.label())
        }
    }
}

/// The name of the obligation's category, or "Other" if it has none.
fn category_name<'a>(obligation: &ScheduledObligation, categories: &'a [Category]) -> &'a str {
    obligation
        .category_id
        .and_then(|category_id| {
            categories
                .iter()
                .find(|category| category.id == category_id)
        })
        .map(|category| category.name.as_ref())
        .unwrap_or("Other")
}

fn signed_amount(transaction_type: TransactionType, amount: f64) -> Markup {
    match transaction_type {
        TransactionType::Income => html! {
            span class="text-emerald-600 dark:text-emerald-400" { (format_currency(amount)) }
        },
        TransactionType::Expense => html! {
            span class="text-red-600 dark:text-red-400" { (format_currency(-amount)) }
        },
    }
}

/// The small form that marks an obligation as paid, with an optional amount override.
fn pay_form(obligation: &ScheduledObligation) -> Markup {
    html! {
        form
            hx-post=(format_endpoint(endpoints::PAY_SCHEDULED, obligation.id))
            hx-target-error="#alert-container"
            class="inline-flex items-center gap-2"
        {
            input
                name="amount"
                type="number"
                step="0.01"
                min="0.01"
                placeholder=(format!("{:.2}", obligation.amount))
                aria-label="Amount paid"
                class="w-24 p-1 rounded text-sm border border-gray-300 dark:bg-gray-700 dark:border-gray-600";

            button type="submit" class=(BUTTON_PAY_STYLE) { "Mark paid" }
        }
    }
}

/// A table of scheduled transactions with their status as of `now`.
///
/// With `show_actions`, pending rows get a pay form and an edit link, and
/// every row gets a delete button.
pub fn obligations_table(
    obligations: &[ScheduledObligation],
    categories: &[Category],
    now: OffsetDateTime,
    show_actions: bool,
) -> Markup {
    let table_row = |obligation: &ScheduledObligation| {
        let status = derive_display_status(obligation, now);
        let is_pending = obligation.status == ObligationStatus::Pending;
        let edit_url = format_endpoint(endpoints::EDIT_SCHEDULED_VIEW, obligation.id);
        let delete_url = format_endpoint(endpoints::SCHEDULED, obligation.id);
        let confirm_message = format!(
            "Are you sure you want to delete the scheduled transaction '{}'? \
            Transactions it already recorded are kept.",
            obligation.description
        );

        html! {
            tr class=(TABLE_ROW_STYLE) data-obligation-row=(obligation.id)
            {
                td class=(TABLE_CELL_STYLE) { (obligation.due_date()) }
                td class=(TABLE_CELL_STYLE) { (obligation.description) }
                td class=(TABLE_CELL_STYLE) { (category_name(obligation, categories)) }
                td class=(TABLE_CELL_STYLE) { (obligation.recurrence.label()) }
                td class={ (TABLE_CELL_STYLE) " text-right" }
                {
                    (signed_amount(
                        obligation.transaction_type,
                        obligation.paid_amount.unwrap_or(obligation.amount),
                    ))
                }
                td class=(TABLE_CELL_STYLE) { (status_badge(status)) }

                @if show_actions {
                    td class={ (TABLE_CELL_STYLE) " space-x-2 whitespace-nowrap" }
                    {
                        @if is_pending {
                            (pay_form(obligation))
                        }

                        (edit_delete_action_links(
                            is_pending.then_some(edit_url.as_str()),
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
                        th scope="col" class=(TABLE_CELL_STYLE) { "Due" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Repeats" }
                        th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Amount" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Status" }

                        @if show_actions {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                        }
                    }
                }

                tbody
                {
                    @for obligation in obligations {
                        (table_row(obligation))
                    }

                    @if obligations.is_empty() {
                        tr
                        {
                            td colspan="7" class={ (TABLE_CELL_STYLE) " text-center" }
                            {
                                "Nothing scheduled."
                            }
                        }
                    }
                }
            }
        }
    }
}
