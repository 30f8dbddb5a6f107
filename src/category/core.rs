//! Core category types and database operations.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    auth::UserID,
    database_id::CategoryId,
    db::with_transaction,
    transaction::TransactionType,
};

/// The name of the category that transactions fall back to.
pub const DEFAULT_CATEGORY_NAME: &str = "Other";

/// The colour given to new categories when none is chosen.
pub const DEFAULT_CATEGORY_COLOR: &str = "#9E9E9E";

/// A validated, non-empty category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCategoryName] if `name` is empty or only whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyCategoryName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A label for grouping transactions of one type, e.g. 'Groceries' or 'Salary'.
///
/// Default categories have no owner and are shared by every user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub user_id: Option<UserID>,
    pub name: CategoryName,
    pub category_type: TransactionType,
    /// A CSS hex colour, e.g. `#4CAF50`.
    pub color: String,
    pub is_default: bool,
}

/// Normalise a colour from a form to `#rrggbb`, falling back to the default colour.
pub fn normalize_color(color: &str) -> String {
    let color = color.trim();
    let is_hex_color = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());

    if is_hex_color {
        color.to_ascii_uppercase()
    } else {
        DEFAULT_CATEGORY_COLOR.to_owned()
    }
}

const CATEGORY_COLUMNS: &str = "id, user_id, name, type, color, is_default";

/// Create a category owned by `user_id`.
pub fn create_category(
    user_id: UserID,
    name: CategoryName,
    category_type: TransactionType,
    color: &str,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(&format!(
            "INSERT INTO category (user_id, name, type, color, is_default)
             VALUES (?1, ?2, ?3, ?4, 0)
             RETURNING {CATEGORY_COLUMNS}"
        ))?
        .query_row(
            (user_id, name.as_ref(), category_type, normalize_color(color)),
            map_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve a category the user can see, i.e. one of theirs or a default.
pub fn get_category(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM category
             WHERE id = ?1 AND (user_id = ?2 OR user_id IS NULL)"
        ))?
        .query_row((category_id, user_id), map_row)
        .map_err(|error| error.into())
}

/// Retrieve the user's categories and the defaults, grouped by type and then sorted by name.
pub fn get_categories(user_id: UserID, connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM category
             WHERE user_id = ?1 OR user_id IS NULL
             ORDER BY type DESC, is_default ASC, name COLLATE NOCASE ASC"
        ))?
        .query_map([user_id], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// The ID of the shared "Other" category for `category_type`.
pub fn default_category_id(
    category_type: TransactionType,
    connection: &Connection,
) -> Result<CategoryId, Error> {
    connection
        .query_row(
            "SELECT id FROM category WHERE is_default = 1 AND type = ?1",
            [category_type],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Pick the category for a new record.
///
/// `None` means the default category of `category_type`.
///
/// # Errors
/// Returns [Error::InvalidCategory] if `category_id` is not visible to the user.
pub fn resolve_category(
    user_id: UserID,
    category_id: Option<CategoryId>,
    category_type: TransactionType,
    connection: &Connection,
) -> Result<CategoryId, Error> {
    match category_id {
        None => default_category_id(category_type, connection),
        Some(category_id) => match get_category(category_id, user_id, connection) {
            Ok(category) => Ok(category.id),
            Err(Error::NotFound) => Err(Error::InvalidCategory(Some(category_id))),
            Err(error) => Err(error),
        },
    }
}

/// Delete one of the user's categories.
///
/// Transactions in the category move to the default category of the same
/// type, and scheduled transactions lose their category.
///
/// # Errors
/// Returns [Error::DeleteDefaultCategory] for a default category and
/// [Error::DeleteMissingCategory] if the category does not exist.
pub fn delete_category(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    with_transaction(connection, |connection| {
        let category = match get_category(category_id, user_id, connection) {
            Ok(category) => category,
            Err(Error::NotFound) => return Err(Error::DeleteMissingCategory),
            Err(error) => return Err(error),
        };

        if category.is_default {
            return Err(Error::DeleteDefaultCategory);
        }

        let fallback_id = default_category_id(category.category_type, connection)?;
        connection.execute(
            "UPDATE \"transaction\" SET category_id = ?1 WHERE category_id = ?2",
            (fallback_id, category_id),
        )?;
        connection.execute(
            "DELETE FROM category WHERE id = ?1 AND user_id = ?2",
            (category_id, user_id),
        )?;

        Ok(())
    })
}

/// Create the category table and the shared default categories.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            user_id INTEGER,
            name TEXT NOT NULL,
            type TEXT NOT NULL CHECK (type IN ('income', 'expense')),
            color TEXT NOT NULL,
            is_default INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_category_user ON category(user_id);",
    )?;

    for category_type in [TransactionType::Expense, TransactionType::Income] {
        connection.execute(
            "INSERT INTO category (user_id, name, type, color, is_default)
             SELECT NULL, ?1, ?2, ?3, 1
             WHERE NOT EXISTS (SELECT 1 FROM category WHERE is_default = 1 AND type = ?2)",
            (DEFAULT_CATEGORY_NAME, category_type, DEFAULT_CATEGORY_COLOR),
        )?;
    }

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let user_id: Option<i64> = row.get(1)?;
    let raw_name: String = row.get(2)?;

    Ok(Category {
        id: row.get(0)?,
        user_id: user_id.map(UserID::new),
        name: CategoryName::new_unchecked(&raw_name),
        category_type: row.get(3)?,
        color: row.get(4)?,
        is_default: row.get(5)?,
    })
}
