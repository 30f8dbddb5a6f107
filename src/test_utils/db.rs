use rusqlite::Connection;

use crate::{
    auth::{PasswordHash, User, create_user},
    db::initialize,
};

/// An in-memory database with every table created and the default categories seeded.
pub(crate) fn get_test_connection() -> Connection {
    let connection = Connection::open_in_memory().expect("Could not open database in memory.");
    initialize(&connection).expect("Could not initialize database.");

    connection
}

/// Insert a user with a throwaway password hash.
#[track_caller]
pub(crate) fn create_test_user(email: &str, connection: &Connection) -> User {
    create_user(
        email,
        PasswordHash::new_unchecked("$2b$04$notarealhashnotarealhashnotarealhashnotarealhas"),
        connection,
    )
    .expect("Could not create test user")
}
