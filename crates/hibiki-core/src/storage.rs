use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::HibikiError;
use crate::models::WatchState;

const SCHEMA_V1: &str = include_str!("../../../migrations/001_initial.sql");

/// Settings key for the persisted playback rate.
const KEY_PLAYBACK_RATE: &str = "playback_rate";

/// SQLite-backed storage for watch progress and persisted player settings.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open (or create) the database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self, HibikiError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, HibikiError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    // ── Watch progress ──────────────────────────────────────────

    /// Last-watched record for a series, if any.
    pub fn watch_state(&self, series_id: &str) -> Result<Option<WatchState>, HibikiError> {
        self.conn
            .query_row(
                "SELECT series_id, episode, position_seconds, updated_at
                 FROM watch_progress WHERE series_id = ?1",
                params![series_id],
                |row| {
                    let updated_str: String = row.get(3)?;
                    Ok(WatchState {
                        series_id: row.get(0)?,
                        episode: row.get(1)?,
                        position_seconds: row.get(2)?,
                        updated_at: parse_datetime(&updated_str),
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// Upsert the last-watched record for a series.
    ///
    /// Repeated identical writes are idempotent; callers fire this on every
    /// player exit path without deduplication.
    pub fn set_watch_state(
        &self,
        series_id: &str,
        episode: u32,
        position_seconds: f64,
    ) -> Result<(), HibikiError> {
        self.conn.execute(
            "INSERT INTO watch_progress (series_id, episode, position_seconds, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(series_id) DO UPDATE SET
                 episode = excluded.episode,
                 position_seconds = excluded.position_seconds,
                 updated_at = excluded.updated_at",
            params![
                series_id,
                episode,
                position_seconds,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    // ── Player settings ─────────────────────────────────────────

    /// Persisted playback rate, if the user ever picked one.
    pub fn playback_rate(&self) -> Result<Option<f64>, HibikiError> {
        Ok(self
            .setting(KEY_PLAYBACK_RATE)?
            .and_then(|v| v.parse::<f64>().ok()))
    }

    pub fn set_playback_rate(&self, rate: f64) -> Result<(), HibikiError> {
        self.set_setting(KEY_PLAYBACK_RATE, &rate.to_string())
    }

    fn setting(&self, key: &str) -> Result<Option<String>, HibikiError> {
        self.conn
            .query_row(
                "SELECT value FROM player_settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<(), HibikiError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO player_settings (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

fn run_migrations(conn: &Connection) -> Result<(), HibikiError> {
    let version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        conn.execute_batch(SCHEMA_V1)?;
        conn.pragma_update(None, "user_version", 1)?;
    }
    Ok(())
}

/// Parse an RFC 3339 datetime from SQLite, tolerating older rows.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}
