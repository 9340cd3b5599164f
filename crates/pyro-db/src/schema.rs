//! Database schema definitions and migrations.

use rusqlite::Connection;

use crate::DbError;

pub fn run_migrations(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(SCHEMA)?;
    migrate_user_state_table(conn)?;
    Ok(())
}

/// user_state: tables created before output formats existed lack `out_format`.
fn migrate_user_state_table(conn: &Connection) -> Result<(), DbError> {
    if column_exists(conn, "user_state", "out_format")? {
        return Ok(());
    }
    tracing::info!("Adding out_format column to user_state");
    conn.execute_batch("ALTER TABLE user_state ADD COLUMN out_format TEXT NOT NULL DEFAULT 'bmp';")?;
    Ok(())
}

pub(crate) fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool, DbError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let exists = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .any(|name| name.as_deref() == Ok(column));
    Ok(exists)
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS user_state (
    user_id INTEGER PRIMARY KEY,
    brightness REAL NOT NULL DEFAULT 1.0,
    contrast REAL NOT NULL DEFAULT 1.0,
    gamma REAL NOT NULL DEFAULT 1.0,
    sharpness REAL NOT NULL DEFAULT 2.0,
    invert INTEGER NOT NULL DEFAULT 0,
    dither TEXT NOT NULL DEFAULT 'fs',
    dpi INTEGER NOT NULL DEFAULT 300,
    denoise_size INTEGER NOT NULL DEFAULT 0,
    blur_radius REAL NOT NULL DEFAULT 0.0,
    last_image_bytes BLOB,
    out_format TEXT NOT NULL DEFAULT 'bmp'
);

CREATE TABLE IF NOT EXISTS user_stats (
    user_id INTEGER PRIMARY KEY,
    outputs_count INTEGER NOT NULL DEFAULT 0,
    settings_changes_count INTEGER NOT NULL DEFAULT 0,
    first_seen TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    last_seen TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#;
