//! Database schema migrations.
//!
//! Version 1 creates the users, knowledge_base, shortcuts, feedback and
//! conversation_history tables.

use rusqlite::Connection;
use tracing::info;

use deskmate_core::error::DeskmateError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), DeskmateError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| DeskmateError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| DeskmateError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: initial schema.
fn apply_v1(conn: &Connection) -> Result<(), DeskmateError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            username    TEXT NOT NULL UNIQUE,
            role        TEXT NOT NULL DEFAULT 'user'
                        CHECK (role IN ('user', 'admin')),
            api_token   TEXT NOT NULL UNIQUE,
            created_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE TABLE IF NOT EXISTS knowledge_base (
            key         TEXT PRIMARY KEY NOT NULL,
            content     TEXT NOT NULL,
            updated_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE TABLE IF NOT EXISTS shortcuts (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            text        TEXT NOT NULL,
            timestamp   INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_shortcuts_user
            ON shortcuts (user_id, id DESC);

        CREATE TABLE IF NOT EXISTS feedback (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            user_query      TEXT NOT NULL,
            bot_response    TEXT NOT NULL,
            rating          INTEGER NOT NULL CHECK (rating IN (-1, 1)),
            correction      TEXT,
            embedding       BLOB,
            timestamp       INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_feedback_timestamp
            ON feedback (timestamp DESC);

        CREATE INDEX IF NOT EXISTS idx_feedback_user_rating
            ON feedback (user_id, rating, timestamp DESC);

        CREATE TABLE IF NOT EXISTS conversation_history (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            session_id  TEXT NOT NULL,
            role        TEXT NOT NULL CHECK (role IN ('user', 'model')),
            content     TEXT NOT NULL,
            timestamp   INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_conversation_user
            ON conversation_history (user_id, id DESC);

        INSERT INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| DeskmateError::Storage(format!("Migration v1 failed: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_feedback_rating_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO users (username, api_token) VALUES ('ana', 'tok')",
            [],
        )
        .unwrap();

        let bad = conn.execute(
            "INSERT INTO feedback (user_id, user_query, bot_response, rating, timestamp)
             VALUES (1, 'q', 'r', 0, 0)",
            [],
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_user_role_defaults_to_user() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO users (username, api_token) VALUES ('bruno', 'tok2')",
            [],
        )
        .unwrap();
        let role: String = conn
            .query_row("SELECT role FROM users WHERE username = 'bruno'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(role, "user");
    }
}
