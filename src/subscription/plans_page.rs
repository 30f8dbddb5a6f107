//! The plans page and the admin endpoint for changing plan prices.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    auth::{UserID, get_user_by_id, validate_email},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        PAGE_CONTAINER_STYLE, base, format_currency,
    },
    navigation::NavBar,
    subscription::{
        core::{PlanType, Subscription, get_subscription},
        plan::{PlanConfig, get_plan_config, parse_price, save_plan_config},
    },
    timezone::local_now,
};

/// The state needed for the plans page and plan configuration endpoint.
#[derive(Debug, Clone)]
pub struct PlansPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "America/Sao_Paulo".
    pub local_timezone: String,
}

impl FromRef<AppState> for PlansPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

pub async fn get_plans_page(
    State(state): State<PlansPageState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let now = local_now(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(user_id, &connection)
        .inspect_err(|error| tracing::error!("could not get user {user_id}: {error}"))?;
    let subscription = get_subscription(user_id, &connection)
        .inspect_err(|error| tracing::error!("could not get subscription: {error}"))?;
    let plans = get_plan_config(&connection)
        .inspect_err(|error| tracing::error!("could not get plan configuration: {error}"))?;

    let nav_bar = NavBar::new(endpoints::PLANS_VIEW).into_html();
    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-6 w-full lg:max-w-5xl"
            {
                h1 class="text-xl font-bold" data-company-name { (plans.company_name()) " plans" }

                (subscription_summary(subscription.as_ref(), now))

                div class="grid gap-4 md:grid-cols-2"
                {
                    (plan_card(PlanType::Monthly, &plans, subscription.as_ref()))
                    (plan_card(PlanType::Annual, &plans, subscription.as_ref()))
                }

                @if !plans.contact_phone.is_empty() {
                    p class="text-sm text-gray-500 dark:text-gray-400"
                    {
                        "Questions about billing? Call us on "
                        span data-contact-phone { (plans.contact_phone) }
                    }
                }

                @if !plans.support_email.is_empty() {
                    p class="text-sm text-gray-500 dark:text-gray-400"
                    {
                        "Or email "
                        a
                            href=(format!("mailto:{}", plans.support_email))
                            class="underline"
                            data-support-email
                        {
                            (plans.support_email)
                        }
                    }
                }

                @if user.is_admin {
                    (plan_config_form(&plans))
                }
            }
        }
    };

    Ok(base("Plans", &[], &content).into_response())
}

fn subscription_summary(subscription: Option<&Subscription>, now: OffsetDateTime) -> Markup {
    let Some(subscription) = subscription else {
        return html! {
            div class=(CARD_STYLE) data-subscription-state="none"
            {
                p { "You do not have a subscription. Choose a plan to unlock reports." }
            }
        };
    };

    let state = if subscription.is_expiring(now) {
        "expiring"
    } else if subscription.is_active(now) {
        "active"
    } else {
        "inactive"
    };
    let period_end = subscription
        .current_period_end
        .map(|period_end| period_end.to_offset(now.offset()).date());

    html! {
        div class=(CARD_STYLE) data-subscription-state=(state)
        {
            p class="font-semibold"
            {
                (subscription.plan_type.label()) " plan: "
                span data-subscription-status { (subscription.status) }
            }

            @if let Some(period_end) = period_end {
                p class="text-sm"
                {
                    @if subscription.cancel_at_period_end {
                        "Ends on " (period_end)
                    } @else {
                        "Renews on " (period_end)
                    }
                }
            }

            @if state == "expiring" {
                p class="text-sm text-amber-600" { "Your subscription is about to expire." }
            } @else if state == "inactive" {
                p class="text-sm text-red-600" { "Your subscription is not active." }
            }
        }
    }
}

fn plan_card(plan_type: PlanType, plans: &PlanConfig, subscription: Option<&Subscription>) -> Markup {
    let is_current = subscription.is_some_and(|subscription| subscription.plan_type == plan_type);
    let discount = plans.discount_percent();

    html! {
        div class=(CARD_STYLE) data-plan=(plan_type.as_str())
        {
            h2 class="font-semibold text-lg flex justify-between"
            {
                (plan_type.label())

                @if is_current {
                    span class="text-sm text-emerald-600" { "Current plan" }
                }
            }

            @match plan_type {
                PlanType::Monthly => {
                    p class="text-2xl font-bold" data-price
                    {
                        (format_currency(plans.monthly_price)) span class="text-sm font-normal" { "/month" }
                    }
                }
                PlanType::Annual => {
                    p class="text-2xl font-bold" data-price
                    {
                        (format_currency(plans.annual_price)) span class="text-sm font-normal" { "/year" }
                    }

                    @if discount > 0 {
                        p class="text-sm"
                        {
                            span class="line-through text-gray-500" data-original-price
                            {
                                (format_currency(plans.original_annual_price()))
                            }
                            " "
                            span class="text-emerald-600 font-medium" data-discount
                            {
                                "Save " (discount) "%"
                            }
                        }
                    }
                }
            }
        }
    }
}

fn plan_config_form(plans: &PlanConfig) -> Markup {
    let text_input = |name: &str, label: &str, value: &str| {
        html! {
            div
            {
                label for=(name) class=(FORM_LABEL_STYLE) { (label) }

                input
                    id=(name)
                    type="text"
                    name=(name)
                    value=(value)
                    class=(FORM_TEXT_INPUT_STYLE);
            }
        }
    };

    html! {
        form
            hx-put=(endpoints::PLAN_CONFIG_API)
            hx-target-error="#alert-container"
            class=(format!("{CARD_STYLE} space-y-4"))
        {
            h2 class="font-semibold text-lg" { "Plan settings" }

            div class="grid gap-4 md:grid-cols-2"
            {
                (text_input("monthly_price_id", "Monthly price ID", &plans.monthly_price_id))
                (text_input("annual_price_id", "Annual price ID", &plans.annual_price_id))
                (text_input("monthly_price", "Monthly price", &format!("{:.2}", plans.monthly_price)))
                (text_input("annual_price", "Annual price", &format!("{:.2}", plans.annual_price)))
                (text_input("contact_phone", "Contact phone", &plans.contact_phone))
                (text_input("support_email", "Support email", &plans.support_email))
                (text_input("company_name", "Company name", &plans.company_name))
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Save" }
        }
    }
}

/// The plan settings as entered by an admin. Prices may use a decimal comma.
#[derive(Debug, Deserialize)]
pub struct PlanConfigForm {
    #[serde(default)]
    pub monthly_price_id: String,
    #[serde(default)]
    pub annual_price_id: String,
    #[serde(default)]
    pub monthly_price: String,
    #[serde(default)]
    pub annual_price: String,
    #[serde(default)]
    pub contact_phone: String,
    #[serde(default)]
    pub support_email: String,
    #[serde(default)]
    pub company_name: String,
}

impl PlanConfigForm {
    fn into_plan_config(self) -> Result<PlanConfig, Error> {
        let price = |raw: &str| -> Result<f64, Error> {
            if raw.trim().is_empty() {
                return Ok(0.0);
            }

            parse_price(raw).ok_or_else(|| Error::InvalidAmount(raw.to_owned()))
        };
        let support_email = match self.support_email.trim() {
            "" => String::new(),
            email => validate_email(email)?,
        };

        Ok(PlanConfig {
            monthly_price: price(&self.monthly_price)?,
            annual_price: price(&self.annual_price)?,
            monthly_price_id: self.monthly_price_id,
            annual_price_id: self.annual_price_id,
            contact_phone: self.contact_phone,
            support_email,
            company_name: self.company_name,
        })
    }
}

/// Replace the plan configuration. Only admins may do this.
pub async fn update_plan_config_endpoint(
    State(state): State<PlansPageState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<PlanConfigForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match get_user_by_id(user_id, &connection) {
        Ok(user) if user.is_admin => {}
        Ok(_) => {
            tracing::warn!("user {user_id} tried to change the plan configuration");
            return Error::Forbidden.into_alert_response();
        }
        Err(error) => {
            tracing::error!("could not get user {user_id}: {error}");
            return error.into_alert_response();
        }
    }

    let config = match form.into_plan_config() {
        Ok(config) => config,
        Err(error) => return error.into_alert_response(),
    };

    match save_plan_config(&config, &connection) {
        Ok(()) => {
            tracing::info!("user {user_id} updated the plan configuration");

            (
                HxRedirect(endpoints::PLANS_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!("could not save plan configuration: {error}");
            error.into_alert_response()
        }
    }
}
