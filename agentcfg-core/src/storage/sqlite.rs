// src/storage/sqlite.rs
//! Single-writer SQLite backend.
//!
//! - Owns one SQLite connection (WAL) behind a mutex; every write goes through it.
//! - `agent_settings` holds exactly one current row per owner.
//! - `settings_versions` is append-only; triggers reject UPDATE and DELETE.
//! - List fields are JSON text, timestamps RFC3339 UTC.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::{SettingsBackend, SnapshotFilter};
use crate::error::StoreError;
use crate::model::{AgentContent, Configuration, LanguageStyle, UpsellRule, VersionSnapshot};
use agentcfg_text::Tone;

const SCHEMA: &str = r#"
    PRAGMA journal_mode = WAL;

    CREATE TABLE IF NOT EXISTS agent_settings (
      id              TEXT PRIMARY KEY,
      owner_id        TEXT NOT NULL UNIQUE,   -- one current row per owner
      system_prompt   TEXT NOT NULL,
      tone            TEXT NOT NULL,
      language_style  TEXT NOT NULL,
      upsell_rules    TEXT NOT NULL,          -- JSON array of {trigger, action, message}
      do_not_say      TEXT NOT NULL,          -- JSON array of normalized phrases
      version         INTEGER NOT NULL,
      created_at      TEXT NOT NULL,
      updated_at      TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS settings_versions (
      id              TEXT PRIMARY KEY,
      owner_id        TEXT NOT NULL,
      version         INTEGER NOT NULL,
      system_prompt   TEXT NOT NULL,
      tone            TEXT NOT NULL,
      language_style  TEXT NOT NULL,
      upsell_rules    TEXT NOT NULL,
      do_not_say      TEXT NOT NULL,
      created_at      TEXT NOT NULL,
      UNIQUE(owner_id, version)
    );

    CREATE INDEX IF NOT EXISTS idx_versions_owner_version
      ON settings_versions(owner_id, version DESC);

    CREATE TRIGGER IF NOT EXISTS settings_versions_no_update
      BEFORE UPDATE ON settings_versions
      BEGIN SELECT RAISE(ABORT, 'settings_versions is append-only'); END;

    CREATE TRIGGER IF NOT EXISTS settings_versions_no_delete
      BEFORE DELETE ON settings_versions
      BEGIN SELECT RAISE(ABORT, 'settings_versions is append-only'); END;
"#;

const CURRENT_COLUMNS: &str = "id, owner_id, system_prompt, tone, language_style, upsell_rules, \
                               do_not_say, version, created_at, updated_at";

const SNAPSHOT_COLUMNS: &str = "id, owner_id, version, system_prompt, tone, language_style, \
                                upsell_rules, do_not_say, created_at";

pub struct SqliteBackend {
    db: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open/create the database file and ensure schema.
    ///
    /// Creates the parent directory if missing.
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Connection::open(db_path)?;
        Self::with_connection(db)
    }

    /// Private in-memory database; handy for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(db: Connection) -> Result<Self, StoreError> {
        db.busy_timeout(std::time::Duration::from_secs(5))?;
        db.execute_batch(SCHEMA)?;
        Ok(Self { db: Mutex::new(db) })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // Open transactions roll back on drop, so a poisoned guard still holds a
        // consistent connection.
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SettingsBackend for SqliteBackend {
    fn read_current(&self, owner_id: &str) -> Result<Option<Configuration>, StoreError> {
        let db = self.conn();
        let raw = db
            .query_row(
                &format!("SELECT {CURRENT_COLUMNS} FROM agent_settings WHERE owner_id = ?1"),
                [owner_id],
                RawCurrent::from_row,
            )
            .optional()?;
        raw.map(RawCurrent::decode).transpose()
    }

    fn insert_current(&self, config: &Configuration) -> Result<(), StoreError> {
        let db = self.conn();
        let c = &config.content;
        let inserted = db.execute(
            &format!(
                "INSERT INTO agent_settings({CURRENT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(owner_id) DO NOTHING"
            ),
            params![
                config.id,
                config.owner_id,
                c.system_prompt,
                c.tone.as_str(),
                c.language_style.as_str(),
                serde_json::to_string(&c.upsell_rules)?,
                serde_json::to_string(&c.do_not_say)?,
                to_sql_version(config.version)?,
                config.created_at.to_rfc3339(),
                config.updated_at.to_rfc3339(),
            ],
        )?;
        if inserted == 0 {
            return Err(StoreError::OwnerExists);
        }
        Ok(())
    }

    fn commit_version(
        &self,
        snapshot: &VersionSnapshot,
        next: &Configuration,
        expected_prior_version: u64,
    ) -> Result<(), StoreError> {
        let mut db = self.conn();
        let tx = db.transaction()?;

        let s = &snapshot.content;
        let appended = tx.execute(
            &format!(
                "INSERT INTO settings_versions({SNAPSHOT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(owner_id, version) DO NOTHING"
            ),
            params![
                snapshot.id,
                snapshot.owner_id,
                to_sql_version(snapshot.version)?,
                s.system_prompt,
                s.tone.as_str(),
                s.language_style.as_str(),
                serde_json::to_string(&s.upsell_rules)?,
                serde_json::to_string(&s.do_not_say)?,
                snapshot.created_at.to_rfc3339(),
            ],
        )?;
        if appended == 0 {
            // tx drops here and rolls back.
            return Err(StoreError::DuplicateSnapshot {
                version: snapshot.version,
            });
        }

        let c = &next.content;
        let updated = tx.execute(
            "UPDATE agent_settings SET
               system_prompt  = ?1,
               tone           = ?2,
               language_style = ?3,
               upsell_rules   = ?4,
               do_not_say     = ?5,
               version        = ?6,
               updated_at     = ?7
             WHERE owner_id = ?8 AND version = ?9",
            params![
                c.system_prompt,
                c.tone.as_str(),
                c.language_style.as_str(),
                serde_json::to_string(&c.upsell_rules)?,
                serde_json::to_string(&c.do_not_say)?,
                to_sql_version(next.version)?,
                next.updated_at.to_rfc3339(),
                next.owner_id,
                to_sql_version(expected_prior_version)?,
            ],
        )?;
        if updated == 0 {
            let found: Option<i64> = tx
                .query_row(
                    "SELECT version FROM agent_settings WHERE owner_id = ?1",
                    [&next.owner_id],
                    |row| row.get(0),
                )
                .optional()?;
            return Err(StoreError::VersionMismatch {
                expected: expected_prior_version,
                found: found.map(|v| v as u64),
            });
        }

        tx.commit()?;
        Ok(())
    }

    fn read_snapshots(&self, owner_id: &str, filter: SnapshotFilter) -> Result<Vec<VersionSnapshot>, StoreError> {
        let db = self.conn();
        let limit = match filter.limit {
            Some(n) => i64::try_from(n).unwrap_or(i64::MAX),
            None => -1, // SQLite: negative LIMIT means no limit
        };
        let raws: Vec<RawSnapshot> = match filter.version {
            Some(v) => {
                let mut stmt = db.prepare(&format!(
                    "SELECT {SNAPSHOT_COLUMNS} FROM settings_versions
                     WHERE owner_id = ?1 AND version = ?2
                     LIMIT ?3"
                ))?;
                let rows = stmt.query_map(params![owner_id, to_sql_version(v)?, limit], RawSnapshot::from_row)?;
                rows.collect::<Result<_, _>>()?
            }
            None => {
                let mut stmt = db.prepare(&format!(
                    "SELECT {SNAPSHOT_COLUMNS} FROM settings_versions
                     WHERE owner_id = ?1
                     ORDER BY version DESC
                     LIMIT ?2"
                ))?;
                let rows = stmt.query_map(params![owner_id, limit], RawSnapshot::from_row)?;
                rows.collect::<Result<_, _>>()?
            }
        };
        raws.into_iter().map(RawSnapshot::decode).collect()
    }
}

// ---------- row decoding ----------

/// Text columns shared by both tables, before parsing.
struct RawContent {
    system_prompt: String,
    tone: String,
    language_style: String,
    upsell_rules: String,
    do_not_say: String,
}

impl RawContent {
    fn decode(self) -> Result<AgentContent, StoreError> {
        let tone = self
            .tone
            .parse::<Tone>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let language_style = self
            .language_style
            .parse::<LanguageStyle>()
            .map_err(StoreError::Corrupt)?;
        let upsell_rules: Vec<UpsellRule> = serde_json::from_str(&self.upsell_rules)?;
        let do_not_say: Vec<String> = serde_json::from_str(&self.do_not_say)?;
        Ok(AgentContent {
            system_prompt: self.system_prompt,
            tone,
            language_style,
            upsell_rules,
            do_not_say,
        })
    }
}

struct RawCurrent {
    id: String,
    owner_id: String,
    content: RawContent,
    version: i64,
    created_at: String,
    updated_at: String,
}

impl RawCurrent {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            content: RawContent {
                system_prompt: row.get(2)?,
                tone: row.get(3)?,
                language_style: row.get(4)?,
                upsell_rules: row.get(5)?,
                do_not_say: row.get(6)?,
            },
            version: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn decode(self) -> Result<Configuration, StoreError> {
        Ok(Configuration {
            id: self.id,
            owner_id: self.owner_id,
            content: self.content.decode()?,
            version: from_sql_version(self.version)?,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

struct RawSnapshot {
    id: String,
    owner_id: String,
    version: i64,
    content: RawContent,
    created_at: String,
}

impl RawSnapshot {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            version: row.get(2)?,
            content: RawContent {
                system_prompt: row.get(3)?,
                tone: row.get(4)?,
                language_style: row.get(5)?,
                upsell_rules: row.get(6)?,
                do_not_say: row.get(7)?,
            },
            created_at: row.get(8)?,
        })
    }

    fn decode(self) -> Result<VersionSnapshot, StoreError> {
        Ok(VersionSnapshot {
            id: self.id,
            owner_id: self.owner_id,
            version: from_sql_version(self.version)?,
            content: self.content.decode()?,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp '{s}': {e}")))
}

fn to_sql_version(v: u64) -> Result<i64, StoreError> {
    i64::try_from(v).map_err(|_| StoreError::Corrupt(format!("version {v} out of range")))
}

fn from_sql_version(v: i64) -> Result<u64, StoreError> {
    u64::try_from(v).map_err(|_| StoreError::Corrupt(format!("negative version {v}")))
}
