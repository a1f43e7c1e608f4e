use rusqlite::Connection;
use tracing::info;

use crate::error::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (codes + messages)");
        conn.execute_batch(
            "
            CREATE TABLE codes (
                code            TEXT PRIMARY KEY NOT NULL
            );

            CREATE TABLE messages (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                code            TEXT NOT NULL REFERENCES codes(code),
                message         TEXT NOT NULL,
                sensitivity     TEXT,
                delivery        TEXT,
                timestamp_utc   TEXT NOT NULL
            );

            CREATE INDEX idx_messages_code
                ON messages(code, timestamp_utc);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
