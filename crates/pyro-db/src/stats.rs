//! Per-user usage counters (`user_stats` table).

use rusqlite::Connection;
use serde::Serialize;

use crate::{Database, DbError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
    pub user_id: i64,
    pub outputs_count: i64,
    pub settings_changes_count: i64,
    pub first_seen: String,
    pub last_seen: String,
}

#[derive(Debug, Clone, Copy)]
enum Counter {
    Outputs,
    SettingsChanges,
}

impl Counter {
    fn column(self) -> &'static str {
        match self {
            Self::Outputs => "outputs_count",
            Self::SettingsChanges => "settings_changes_count",
        }
    }
}

fn ensure_row(conn: &Connection, user_id: i64) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO user_stats (user_id) VALUES (?1) ON CONFLICT(user_id) DO NOTHING",
        [user_id],
    )?;
    Ok(())
}

impl Database {
    fn increment_counter(&self, user_id: i64, counter: Counter, delta: i64) -> Result<(), DbError> {
        let column = counter.column();
        self.with_conn(|conn| {
            ensure_row(conn, user_id)?;
            conn.execute(
                &format!(
                    "UPDATE user_stats SET {column} = {column} + ?1, last_seen = CURRENT_TIMESTAMP
                     WHERE user_id = ?2"
                ),
                rusqlite::params![delta, user_id],
            )?;
            Ok(())
        })
    }

    /// Count a delivered final file.
    pub fn record_output(&self, user_id: i64) -> Result<(), DbError> {
        self.increment_counter(user_id, Counter::Outputs, 1)
    }

    /// Count an applied settings change.
    pub fn record_setting_change(&self, user_id: i64) -> Result<(), DbError> {
        self.increment_counter(user_id, Counter::SettingsChanges, 1)
    }

    pub fn get_user_stats(&self, user_id: i64) -> Result<UserStats, DbError> {
        self.with_conn(|conn| {
            ensure_row(conn, user_id)?;
            let stats = conn.query_row(
                "SELECT user_id, outputs_count, settings_changes_count, first_seen, last_seen
                 FROM user_stats WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok(UserStats {
                        user_id: row.get(0)?,
                        outputs_count: row.get(1)?,
                        settings_changes_count: row.get(2)?,
                        first_seen: row.get(3)?,
                        last_seen: row.get(4)?,
                    })
                },
            )?;
            Ok(stats)
        })
    }
}
