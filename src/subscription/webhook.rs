//! Receives subscription events from the billing provider and keeps the
//! local subscription records in sync with them.
//!
//! Events are signed with a shared secret, may arrive more than once and may
//! arrive out of order. Each event ID is recorded in the same SQL transaction
//! that applies it, so a repeated delivery has no effect, and a record is only
//! overwritten by an event at least as new as the last one applied to it.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    auth::{UserID, get_user_by_id},
    db::with_transaction,
    subscription::{
        core::PlanType,
        plan::{PlanConfig, get_plan_config},
    },
};

type HmacSha256 = Hmac<Sha256>;

/// The request header that carries the event signature, `t=<unix seconds>,v1=<hex digest>`.
pub const SIGNATURE_HEADER: &str = "billing-signature";

const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
const SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";
const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";

/// Check that `header` holds an HMAC-SHA256 signature of `"{t}.{body}"` made with `secret`.
///
/// The header may list several `v1` signatures, e.g. while the secret is being
/// rotated, and any one of them matching is enough.
///
/// # Errors
/// Returns [Error::InvalidSignature] if the header is malformed or no signature matches.
pub fn verify_signature(header: &str, body: &str, secret: &str) -> Result<(), Error> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(Error::InvalidSignature)?;
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| Error::InvalidSignature)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body.as_bytes());

    let is_valid = signatures
        .into_iter()
        .filter_map(|signature| hex::decode(signature).ok())
        .any(|signature| mac.clone().verify_slice(&signature).is_ok());

    if is_valid {
        Ok(())
    } else {
        Err(Error::InvalidSignature)
    }
}

/// An event sent by the billing provider.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    /// When the provider created the event, in Unix seconds.
    pub created: i64,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    /// The object the event is about, its shape depends on the event type.
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CheckoutSession {
    #[serde(default)]
    metadata: CheckoutMetadata,
    customer: String,
    /// The subscription the checkout created, expanded in place.
    subscription: ProviderSubscription,
}

#[derive(Debug, Default, Deserialize)]
struct CheckoutMetadata {
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderSubscription {
    id: String,
    status: String,
    #[serde(default)]
    cancel_at_period_end: bool,
    current_period_start: Option<i64>,
    current_period_end: Option<i64>,
    #[serde(default)]
    items: Option<SubscriptionItems>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionItems {
    data: Vec<SubscriptionItem>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionItem {
    price: Price,
}

#[derive(Debug, Deserialize)]
struct Price {
    id: String,
    recurring: Option<PriceRecurring>,
}

#[derive(Debug, Deserialize)]
struct PriceRecurring {
    interval: String,
}

impl ProviderSubscription {
    /// The plan of the first subscription item, if the event lists any items.
    fn plan_type(&self, plans: &PlanConfig) -> Option<PlanType> {
        let price = &self.items.as_ref()?.data.first()?.price;
        let interval = price
            .recurring
            .as_ref()
            .map(|recurring| recurring.interval.as_str());

        Some(plans.plan_type_for_price(&price.id, interval))
    }

    fn period_start(&self) -> Result<Option<OffsetDateTime>, Error> {
        self.current_period_start.map(parse_timestamp).transpose()
    }

    fn period_end(&self) -> Result<Option<OffsetDateTime>, Error> {
        self.current_period_end.map(parse_timestamp).transpose()
    }
}

fn parse_timestamp(timestamp: i64) -> Result<OffsetDateTime, Error> {
    OffsetDateTime::from_unix_timestamp(timestamp)
        .map_err(|error| Error::MalformedBillingEvent(format!("invalid timestamp: {error}")))
}

fn parse_object<T: for<'de> Deserialize<'de>>(event: &BillingEvent) -> Result<T, Error> {
    serde_json::from_value(event.data.object.clone()).map_err(|error| {
        Error::MalformedBillingEvent(format!("invalid {} object: {error}", event.event_type))
    })
}

/// What happened to a billing event that passed the signature check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The event changed a subscription record.
    Applied,
    /// The subscription is unknown or already reflects a newer event.
    Stale,
    /// The event ID was seen before.
    Duplicate,
    /// The event type does not affect subscriptions.
    Ignored,
}

/// Apply a billing event to the subscription records.
///
/// # Errors
/// Returns [Error::MalformedBillingEvent] if the event object is missing a
/// required field or names an unknown user. Nothing is written in that case,
/// so the provider may retry a corrected event with the same ID.
pub fn reconcile_event(
    event: &BillingEvent,
    plans: &PlanConfig,
    received_at: OffsetDateTime,
    connection: &Connection,
) -> Result<Reconciliation, Error> {
    with_transaction(connection, |connection| {
        let is_new = connection.execute(
            "INSERT OR IGNORE INTO billing_event (id, type, received_at) VALUES (?1, ?2, ?3)",
            (&event.id, &event.event_type, received_at),
        )? == 1;

        if !is_new {
            return Ok(Reconciliation::Duplicate);
        }

        match event.event_type.as_str() {
            CHECKOUT_COMPLETED => apply_checkout(event, plans, connection),
            SUBSCRIPTION_UPDATED => apply_update(event, plans, connection),
            SUBSCRIPTION_DELETED => apply_deletion(event, connection),
            _ => Ok(Reconciliation::Ignored),
        }
    })
}

fn apply_checkout(
    event: &BillingEvent,
    plans: &PlanConfig,
    connection: &Connection,
) -> Result<Reconciliation, Error> {
    let session: CheckoutSession = parse_object(event)?;

    let user_id = session
        .metadata
        .user_id
        .as_deref()
        .and_then(|user_id| user_id.trim().parse::<i64>().ok())
        .map(UserID::new)
        .ok_or_else(|| Error::MalformedBillingEvent("missing user ID in metadata".to_owned()))?;

    match get_user_by_id(user_id, connection) {
        Ok(_) => {}
        Err(Error::NotFound) => {
            return Err(Error::MalformedBillingEvent(format!(
                "user {user_id} does not exist"
            )));
        }
        Err(error) => return Err(error),
    }

    let subscription = &session.subscription;
    let plan_type = subscription
        .plan_type(plans)
        .unwrap_or(PlanType::Monthly);

    let rows_changed = connection.execute(
        "INSERT INTO subscription (user_id, customer_id, subscription_id, status, plan_type,
            current_period_start, current_period_end, cancel_at_period_end, last_event_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(user_id) DO UPDATE SET
            customer_id = excluded.customer_id,
            subscription_id = excluded.subscription_id,
            status = excluded.status,
            plan_type = excluded.plan_type,
            current_period_start = excluded.current_period_start,
            current_period_end = excluded.current_period_end,
            cancel_at_period_end = excluded.cancel_at_period_end,
            last_event_at = excluded.last_event_at
         WHERE excluded.last_event_at >= subscription.last_event_at",
        (
            user_id,
            &session.customer,
            &subscription.id,
            &subscription.status,
            plan_type,
            subscription.period_start()?,
            subscription.period_end()?,
            subscription.cancel_at_period_end,
            event.created,
        ),
    )?;

    if rows_changed == 0 {
        return Ok(Reconciliation::Stale);
    }

    tracing::info!(
        "subscription {} for user {user_id} is now {} on the {plan_type} plan",
        subscription.id,
        subscription.status
    );

    Ok(Reconciliation::Applied)
}

fn apply_update(
    event: &BillingEvent,
    plans: &PlanConfig,
    connection: &Connection,
) -> Result<Reconciliation, Error> {
    let subscription: ProviderSubscription = parse_object(event)?;
    let plan_type = subscription.plan_type(plans);

    // Missing periods and items keep the stored values.
    let rows_changed = connection.execute(
        "UPDATE subscription SET
            status = ?1,
            cancel_at_period_end = ?2,
            current_period_start = COALESCE(?3, current_period_start),
            current_period_end = COALESCE(?4, current_period_end),
            plan_type = COALESCE(?5, plan_type),
            last_event_at = ?6
         WHERE subscription_id = ?7 AND last_event_at <= ?6",
        (
            &subscription.status,
            subscription.cancel_at_period_end,
            subscription.period_start()?,
            subscription.period_end()?,
            plan_type,
            event.created,
            &subscription.id,
        ),
    )?;

    if rows_changed == 0 {
        tracing::info!(
            "ignored update for subscription {}, it is unknown or has a newer event",
            subscription.id
        );
        return Ok(Reconciliation::Stale);
    }

    tracing::info!(
        "subscription {} updated to {}",
        subscription.id,
        subscription.status
    );

    Ok(Reconciliation::Applied)
}

fn apply_deletion(event: &BillingEvent, connection: &Connection) -> Result<Reconciliation, Error> {
    #[derive(Deserialize)]
    struct DeletedSubscription {
        id: String,
    }

    let subscription: DeletedSubscription = parse_object(event)?;

    let rows_changed = connection.execute(
        "UPDATE subscription SET status = 'canceled', last_event_at = ?1
         WHERE subscription_id = ?2 AND last_event_at <= ?1",
        (event.created, &subscription.id),
    )?;

    if rows_changed == 0 {
        tracing::info!(
            "ignored cancellation of subscription {}, it is unknown or has a newer event",
            subscription.id
        );
        return Ok(Reconciliation::Stale);
    }

    tracing::info!("subscription {} canceled", subscription.id);

    Ok(Reconciliation::Applied)
}

/// The state needed to receive billing events.
#[derive(Debug, Clone)]
pub struct BillingWebhookState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub billing_webhook_secret: Option<String>,
}

impl FromRef<AppState> for BillingWebhookState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            billing_webhook_secret: state.billing_webhook_secret.clone(),
        }
    }
}

/// Verify, parse and apply an event from the billing provider.
///
/// Every event that passes the signature check and parses is acknowledged
/// with 200, including duplicates and event types that are not handled.
pub async fn billing_webhook_endpoint(
    State(state): State<BillingWebhookState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    match handle_billing_event(&state, &headers, &body) {
        Ok(event) => Json(json!({ "received": true, "event": event })).into_response(),
        Err(error) => webhook_error_response(error),
    }
}

fn handle_billing_event(
    state: &BillingWebhookState,
    headers: &HeaderMap,
    body: &str,
) -> Result<String, Error> {
    let secret = state
        .billing_webhook_secret
        .as_deref()
        .ok_or(Error::BillingNotConfigured)?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(Error::InvalidSignature)?;
    verify_signature(signature, body, secret)?;

    let event: BillingEvent = serde_json::from_str(body)
        .map_err(|error| Error::MalformedBillingEvent(error.to_string()))?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let plans = get_plan_config(&connection)?;
    let outcome = reconcile_event(&event, &plans, OffsetDateTime::now_utc(), &connection)?;

    match outcome {
        Reconciliation::Duplicate => {
            tracing::info!("duplicate billing event {} ignored", event.id)
        }
        Reconciliation::Ignored => {
            tracing::debug!("billing event {} of type {} ignored", event.id, event.event_type)
        }
        Reconciliation::Applied | Reconciliation::Stale => {
            tracing::info!("billing event {} reconciled: {outcome:?}", event.id)
        }
    }

    Ok(event.event_type)
}

fn webhook_error_response(error: Error) -> Response {
    let status_code = match &error {
        Error::BillingNotConfigured => {
            tracing::warn!("rejected billing event, no webhook secret is configured");
            StatusCode::SERVICE_UNAVAILABLE
        }
        Error::InvalidSignature => {
            tracing::warn!("rejected billing event with an invalid signature");
            StatusCode::UNAUTHORIZED
        }
        Error::MalformedBillingEvent(_) => {
            tracing::warn!("rejected billing event: {error}");
            StatusCode::BAD_REQUEST
        }
        _ => {
            tracing::error!("could not process billing event: {error}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (status_code, Json(json!({ "error": error.to_string() }))).into_response()
}
