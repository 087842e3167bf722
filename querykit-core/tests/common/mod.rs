//! Shared fixtures for the `SQLite` integration tests.

use querykit_core::{params, ConnectionConfig, Database, DatabaseConfig, SqliteBackend};

pub const USERS: [(&str, Option<&str>); 3] = [
    ("alice", Some("alice@example.com")),
    ("bob", None),
    ("carol", Some("carol@example.com")),
];

/// Creates the `{users}` table and inserts [`USERS`].
pub fn seed(db: &mut Database<SqliteBackend>) {
    db.execute(
        "CREATE TABLE {users} (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT,
            data BLOB
        )",
        &params! {},
    )
    .expect("create users");
    for (name, email) in USERS {
        db.execute(
            "INSERT INTO {users} (name, email) VALUES (:name, :email)",
            &params! { ":name" => name, ":email" => email },
        )
        .expect("insert user");
    }
}

/// An in-memory database holding the seeded `{users}` table.
pub fn users_db(config: DatabaseConfig) -> Database<SqliteBackend> {
    let mut db = Database::open(&ConnectionConfig::in_memory(config)).expect("open");
    seed(&mut db);
    db
}
