//! Form fields shared by the new and edit transaction pages.

use maud::{Markup, html};
use serde::Deserialize;
use time::Date;

use crate::{
    category::Category,
    database_id::{CategoryId, GoalId},
    goal::Goal,
    html::{
        FORM_LABEL_STYLE, FORM_RADIO_GROUP_STYLE, FORM_RADIO_INPUT_STYLE, FORM_RADIO_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE,
    },
    transaction::{Transaction, TransactionBuilder, TransactionType},
};

/// The form data for creating or editing a transaction.
///
/// Must be extracted with axum_extra's `Form`, which reads the empty category
/// and goal options as `None`.
#[derive(Debug, Deserialize)]
pub struct TransactionForm {
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub date: Date,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub goal_id: Option<GoalId>,
}

impl TransactionForm {
    pub fn into_builder(self) -> TransactionBuilder {
        Transaction::build(self.transaction_type, self.amount, self.date)
            .description(&self.description)
            .category(self.category_id)
            .goal(self.goal_id)
    }
}

/// The values the form fields start with.
pub struct TransactionFormDefaults<'a> {
    pub transaction_type: TransactionType,
    pub amount: Option<f64>,
    pub date: Date,
    pub description: Option<&'a str>,
    pub category_id: Option<CategoryId>,
    pub goal_id: Option<GoalId>,
    pub max_date: Date,
}

pub fn transaction_form_fields(
    defaults: &TransactionFormDefaults<'_>,
    categories: &[Category],
    goals: &[Goal],
) -> Markup {
    let amount_str = defaults.amount.map(|amount| format!("{amount:.2}"));

    html! {
        fieldset class="space-y-2"
        {
            legend class=(FORM_LABEL_STYLE) { "Transaction type" }

            div class=(FORM_RADIO_GROUP_STYLE)
            {
                @for transaction_type in [TransactionType::Expense, TransactionType::Income] {
                    @let id = format!("transaction-type-{}", transaction_type.as_str());

                    div class="flex items-center gap-3 flex-1"
                    {
                        input
                            name="type"
                            id=(id)
                            type="radio"
                            value=(transaction_type.as_str())
                            checked[transaction_type == defaults.transaction_type]
                            required
                            class=(FORM_RADIO_INPUT_STYLE);

                        label for=(id) class=(FORM_RADIO_LABEL_STYLE)
                        {
                            (transaction_type.label())
                        }
                    }
                }
            }
        }

        div
        {
            label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

            div class="input-wrapper w-full"
            {
                input
                    name="amount"
                    id="amount"
                    type="number"
                    step="0.01"
                    min="0.01"
                    placeholder="0.00"
                    required
                    autofocus
                    value=[amount_str.as_deref()]
                    class=(FORM_TEXT_INPUT_STYLE);
            }
        }

        div
        {
            label for="date" class=(FORM_LABEL_STYLE) { "Date" }

            input
                name="date"
                id="date"
                type="date"
                max=(defaults.max_date)
                value=(defaults.date)
                required
                class=(FORM_TEXT_INPUT_STYLE);
        }

        div
        {
            label for="description" class=(FORM_LABEL_STYLE) { "Description" }

            input
                name="description"
                id="description"
                type="text"
                placeholder="Description"
                value=[defaults.description]
                class=(FORM_TEXT_INPUT_STYLE);
        }

        div
        {
            label for="category_id" class=(FORM_LABEL_STYLE) { "Category" }

            select name="category_id" id="category_id" class=(FORM_TEXT_INPUT_STYLE)
            {
                option value="" { "Other" }

                @for category in categories.iter().filter(|category| !category.is_default) {
                    option
                        value=(category.id)
                        selected[Some(category.id) == defaults.category_id]
                    {
                        (category.name) " (" (category.category_type.label()) ")"
                    }
                }
            }
        }

        @if !goals.is_empty() {
            div
            {
                label for="goal_id" class=(FORM_LABEL_STYLE) { "Savings goal" }

                select name="goal_id" id="goal_id" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" { "None" }

                    @for goal in goals {
                        option value=(goal.id) selected[Some(goal.id) == defaults.goal_id]
                        {
                            (goal.name)
                        }
                    }
                }

                p class="mt-1 text-xs text-gray-500" { "Only income counts towards a goal." }
            }
        }
    }
}
