//! Paid subscriptions, kept in sync with the billing provider through its
//! webhook, and the plans users can subscribe to.

mod core;
mod guard;
mod plan;
mod plans_page;
mod webhook;

pub use core::{create_billing_event_table, create_subscription_table};
pub use guard::subscription_guard;
pub use plan::create_app_config_table;
pub use plans_page::{get_plans_page, update_plan_config_endpoint};
pub use webhook::billing_webhook_endpoint;
