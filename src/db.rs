//! Database set up and the helper for running several statements as one unit.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    auth::create_user_table,
    category::create_category_table,
    goal::create_goal_table,
    schedule::create_scheduled_transaction_table,
    subscription::{create_app_config_table, create_billing_event_table, create_subscription_table},
    transaction::create_transaction_table,
};

/// Create the all of the database tables for the application.
///
/// Safe to call on an existing database: tables are only created if they are
/// missing and default rows are only inserted once.
///
/// # Errors
/// Returns an error if a table cannot be created or if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.pragma_update(None, "foreign_keys", true)?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    // Order matters, tables must be created after the tables they reference.
    create_user_table(&transaction)?;
    create_category_table(&transaction)?;
    create_goal_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_scheduled_transaction_table(&transaction)?;
    create_subscription_table(&transaction)?;
    create_billing_event_table(&transaction)?;
    create_app_config_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Run `f` inside a SQL transaction that takes the write lock immediately.
///
/// The transaction is committed if `f` returns `Ok` and rolled back otherwise,
/// so readers never observe a partial set of writes.
///
/// # Errors
/// Returns the error from `f`, or an SQL error if the transaction cannot be
/// started or committed.
pub fn with_transaction<T, E>(
    connection: &Connection,
    f: impl FnOnce(&Connection) -> Result<T, E>,
) -> Result<T, E>
where
    E: From<rusqlite::Error>,
{
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    // Dropping the transaction without committing rolls it back.
    let value = f(&transaction)?;
    transaction.commit()?;

    Ok(value)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::Error;

    use super::{initialize, with_transaction};

    fn count_rows(connection: &Connection) -> i64 {
        connection
            .query_row("SELECT COUNT(*) FROM app_config", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn initialize_is_idempotent() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();
        initialize(&connection).unwrap();

        let default_categories: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM category WHERE is_default = 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(default_categories, 2);
    }

    #[test]
    fn initialize_enables_foreign_keys() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();

        let foreign_keys: i64 = connection
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(foreign_keys, 1);
    }

    #[test]
    fn with_transaction_commits_on_success() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        let result: Result<(), Error> = with_transaction(&connection, |connection| {
            connection.execute(
                "INSERT INTO app_config (key, value) VALUES ('foo', 'bar')",
                (),
            )?;
            Ok(())
        });

        assert!(result.is_ok());
        assert_eq!(count_rows(&connection), 1);
    }

    #[test]
    fn with_transaction_rolls_back_on_error() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        let result: Result<(), Error> = with_transaction(&connection, |connection| {
            connection.execute(
                "INSERT INTO app_config (key, value) VALUES ('foo', 'bar')",
                (),
            )?;
            Err(Error::NotFound)
        });

        assert_eq!(result, Err(Error::NotFound));
        assert_eq!(count_rows(&connection), 0);
    }
}
