//! Database module - SQLite storage for the per-user state blob

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{info, warn};

use crate::program::ProgramDefinition;
use crate::state::AppState;

/// Database wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS user_data (
                user_id TEXT PRIMARY KEY,
                workout_data TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Replace the whole state blob for a user
    pub fn save_state(&self, user_id: &str, state: &AppState) -> Result<()> {
        let data = serde_json::to_string(state)?;
        self.write_blob(user_id, &data)?;
        info!(user_id, sessions = state.history.len(), "state saved");
        Ok(())
    }

    /// Raw state blob as stored, without migration
    pub fn load_state(&self, user_id: &str) -> Result<Option<AppState>> {
        let data: Option<String> = self
            .conn
            .query_row(
                "SELECT workout_data FROM user_data WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;

        data.map(|json| {
            serde_json::from_str::<AppState>(&json).with_context(|| format!("corrupt state blob for user '{}'", user_id))
        })
        .transpose()
    }

    /// Load, migrate and (if anything changed) persist the state right away
    ///
    /// A user with no stored state starts a fresh program today.
    pub fn load_or_init(
        &self,
        user_id: &str,
        program: &ProgramDefinition,
        today: NaiveDate,
    ) -> Result<AppState> {
        let Some(mut state) = self.load_state(user_id)? else {
            info!(user_id, %today, "no stored state, starting fresh");
            return Ok(AppState::new(today));
        };

        let report = state.migrate(program)?;
        if report.dropped > 0 {
            warn!(user_id, dropped = report.dropped, "entries dropped during migration");
        }
        if report.migrated {
            self.save_state(user_id, &state)?;
        }

        Ok(state)
    }

    /// Store a raw JSON blob; used to import state exported by older versions
    pub fn import_raw(&self, user_id: &str, json: &str) -> Result<()> {
        let state: AppState = serde_json::from_str(json).context("invalid state JSON")?;
        self.write_blob(user_id, json)?;
        info!(user_id, sessions = state.history.len(), "state imported");
        Ok(())
    }

    fn write_blob(&self, user_id: &str, data: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO user_data (user_id, workout_data, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                workout_data = excluded.workout_data,
                updated_at = excluded.updated_at",
            params![user_id, data, now],
        )?;
        Ok(())
    }
}
