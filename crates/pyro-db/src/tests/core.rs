use rusqlite::Connection;

use super::test_db;
use crate::schema::{self, column_exists};

#[test]
fn test_open_and_migrate() {
    let db = test_db();
    db.with_conn(|conn| {
        assert!(column_exists(conn, "user_state", "out_format")?);
        assert!(column_exists(conn, "user_stats", "outputs_count")?);
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_migration_adds_out_format_to_legacy_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE user_state (
            user_id INTEGER PRIMARY KEY,
            brightness REAL NOT NULL DEFAULT 1.0,
            contrast REAL NOT NULL DEFAULT 1.0,
            gamma REAL NOT NULL DEFAULT 1.0,
            sharpness REAL NOT NULL DEFAULT 1.0,
            invert INTEGER NOT NULL DEFAULT 0,
            dither TEXT NOT NULL DEFAULT 'fs',
            dpi INTEGER NOT NULL DEFAULT 300,
            denoise_size INTEGER NOT NULL DEFAULT 0,
            blur_radius REAL NOT NULL DEFAULT 0.0,
            last_image_bytes BLOB
        );
        INSERT INTO user_state (user_id, dither) VALUES (7, 'ordered');",
    )
    .unwrap();
    assert!(!column_exists(&conn, "user_state", "out_format").unwrap());

    schema::run_migrations(&conn).unwrap();
    assert!(column_exists(&conn, "user_state", "out_format").unwrap());

    let fmt: String = conn
        .query_row("SELECT out_format FROM user_state WHERE user_id = 7", [], |r| r.get(0))
        .unwrap();
    assert_eq!(fmt, "bmp");

    // running again is a no-op
    schema::run_migrations(&conn).unwrap();
}

#[test]
fn test_open_on_disk_reopens_existing_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.db");

    {
        let db = crate::Database::open(&path).unwrap();
        db.update_source_image(1, b"abc").unwrap();
    }
    let db = crate::Database::open(&path).unwrap();
    assert_eq!(db.load_state(1).unwrap().source_image, Some(b"abc".to_vec()));
}
