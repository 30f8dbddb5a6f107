//! The prices and billing provider IDs of the subscription plans.

use rusqlite::{Connection, OptionalExtension};

use crate::{Error, db::with_transaction, subscription::core::PlanType};

const MONTHLY_PRICE_ID_KEY: &str = "plan.monthly.price_id";
const ANNUAL_PRICE_ID_KEY: &str = "plan.annual.price_id";
const MONTHLY_PRICE_KEY: &str = "plan.monthly.price";
const ANNUAL_PRICE_KEY: &str = "plan.annual.price";
const CONTACT_PHONE_KEY: &str = "contact.phone";
const SUPPORT_EMAIL_KEY: &str = "contact.support_email";
const COMPANY_NAME_KEY: &str = "branding.company_name";

/// The name shown when an admin has not set one.
pub const DEFAULT_COMPANY_NAME: &str = "PoupeJá";

/// The plan configuration that an admin edits at run time.
///
/// Missing values are empty strings and zero prices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanConfig {
    /// The billing provider's price ID for the monthly plan.
    pub monthly_price_id: String,
    /// The billing provider's price ID for the annual plan.
    pub annual_price_id: String,
    pub monthly_price: f64,
    pub annual_price: f64,
    /// Shown on the plans page for users who need help.
    pub contact_phone: String,
    pub support_email: String,
    /// Overrides [DEFAULT_COMPANY_NAME] on the plans page.
    pub company_name: String,
}

impl PlanConfig {
    pub fn company_name(&self) -> &str {
        match self.company_name.trim() {
            "" => DEFAULT_COMPANY_NAME,
            name => name,
        }
    }

    /// What twelve months on the monthly plan cost.
    pub fn original_annual_price(&self) -> f64 {
        self.monthly_price * 12.0
    }

    /// How much cheaper the annual plan is than paying monthly, as a whole percentage.
    ///
    /// Zero unless both prices are set.
    pub fn discount_percent(&self) -> i64 {
        if self.monthly_price <= 0.0 || self.annual_price <= 0.0 {
            return 0;
        }

        let original = self.original_annual_price();

        ((original - self.annual_price) / original * 100.0).round() as i64
    }

    /// The plan that a billing provider price belongs to.
    ///
    /// Unknown prices fall back to the billing `interval`, where "year" means
    /// annual and anything else monthly.
    pub fn plan_type_for_price(&self, price_id: &str, interval: Option<&str>) -> PlanType {
        if !self.monthly_price_id.is_empty() && price_id == self.monthly_price_id {
            PlanType::Monthly
        } else if !self.annual_price_id.is_empty() && price_id == self.annual_price_id {
            PlanType::Annual
        } else {
            tracing::warn!("unknown price ID {price_id}, using the billing interval {interval:?}");

            match interval {
                Some("year") => PlanType::Annual,
                _ => PlanType::Monthly,
            }
        }
    }
}

fn get_value(key: &str, connection: &Connection) -> Result<Option<String>, Error> {
    connection
        .query_row("SELECT value FROM app_config WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|error| error.into())
}

fn set_value(key: &str, value: &str, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO app_config (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        (key, value),
    )?;

    Ok(())
}

/// Parse a price that may use a comma as the decimal separator, e.g. "19,90".
pub fn parse_price(price: &str) -> Option<f64> {
    let price = price.trim().replace(',', ".");

    match price.parse::<f64>() {
        Ok(price) if price.is_finite() && price >= 0.0 => Some(price),
        _ => None,
    }
}

pub fn get_plan_config(connection: &Connection) -> Result<PlanConfig, Error> {
    let price = |key: &str| -> Result<f64, Error> {
        Ok(get_value(key, connection)?
            .as_deref()
            .and_then(parse_price)
            .unwrap_or_default())
    };

    Ok(PlanConfig {
        monthly_price_id: get_value(MONTHLY_PRICE_ID_KEY, connection)?.unwrap_or_default(),
        annual_price_id: get_value(ANNUAL_PRICE_ID_KEY, connection)?.unwrap_or_default(),
        monthly_price: price(MONTHLY_PRICE_KEY)?,
        annual_price: price(ANNUAL_PRICE_KEY)?,
        contact_phone: get_value(CONTACT_PHONE_KEY, connection)?.unwrap_or_default(),
        support_email: get_value(SUPPORT_EMAIL_KEY, connection)?.unwrap_or_default(),
        company_name: get_value(COMPANY_NAME_KEY, connection)?.unwrap_or_default(),
    })
}

/// Replace the whole plan configuration.
pub fn save_plan_config(config: &PlanConfig, connection: &Connection) -> Result<(), Error> {
    with_transaction(connection, |connection| {
        set_value(MONTHLY_PRICE_ID_KEY, config.monthly_price_id.trim(), connection)?;
        set_value(ANNUAL_PRICE_ID_KEY, config.annual_price_id.trim(), connection)?;
        set_value(MONTHLY_PRICE_KEY, &format!("{:.2}", config.monthly_price), connection)?;
        set_value(ANNUAL_PRICE_KEY, &format!("{:.2}", config.annual_price), connection)?;
        set_value(CONTACT_PHONE_KEY, config.contact_phone.trim(), connection)?;
        set_value(SUPPORT_EMAIL_KEY, config.support_email.trim(), connection)?;
        set_value(COMPANY_NAME_KEY, config.company_name.trim(), connection)
    })
}

pub fn create_app_config_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS app_config (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )
}
