mod legacy;
mod state;

pub use legacy::{LegacyImport, parse_legacy_blob};
pub use state::{ClientState, DaySnapshot, PendingAction, SCHEMA_VERSION};

use chrono::{NaiveDate, Utc};
use mealsync_core::{MealError, MealResult};
use mealsync_fs::WorkspacePaths;
use rusqlite::{Connection, Error as SqlError, ErrorCode, OptionalExtension, params};
use std::fs;
use std::path::{Path, PathBuf};

use state::StateHeader;

/// File name the browser client's storage export is expected under in
/// `.mealsync/cache/`. Picked up once when a profile has no stored state.
pub const LEGACY_BLOB_FILE: &str = "meal-tracking-storage.json";

/// SQLite-backed cache of day snapshots, the pending action queue and
/// client bookkeeping, keyed by profile.
#[derive(Debug, Clone)]
pub struct CacheStore {
    db_path: PathBuf,
    legacy_blob_path: PathBuf,
}

impl CacheStore {
    pub fn from_workspace(paths: &WorkspacePaths) -> MealResult<Self> {
        fs::create_dir_all(&paths.cache_dir).map_err(|err| {
            MealError::io(format!(
                "failed to create cache directory '{}': {}",
                paths.cache_dir.display(),
                err
            ))
        })?;

        let store = Self {
            db_path: paths.state_db_path.clone(),
            legacy_blob_path: paths.cache_dir.join(LEGACY_BLOB_FILE),
        };

        let conn = store.connection()?;
        store.initialize_schema(&conn)?;

        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Loads the full persisted state for a profile. A profile with no stored
    /// state is seeded from the legacy browser export if one is present.
    pub fn load_state(&self, profile: &str) -> MealResult<ClientState> {
        let key = profile_key(profile);
        let conn = self.connection()?;

        let header_row = conn
            .query_row(
                "SELECT schema_version, payload_json FROM client_state WHERE profile = ?1",
                params![key],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map_err(|err| sqlite_error("load client state", &self.db_path, err))?;

        let header = match header_row {
            Some((schema_version, header_json)) => {
                ensure_supported_version(schema_version, &self.db_path)?;
                serde_json::from_str::<StateHeader>(&header_json).map_err(|err| {
                    MealError::io(format!(
                        "failed to parse client state in '{}': {}",
                        self.db_path.display(),
                        err
                    ))
                })?
            }
            None => {
                if table_is_empty_for(&conn, "day_snapshots", &key, &self.db_path)?
                    && table_is_empty_for(&conn, "pending_actions", &key, &self.db_path)?
                    && let Some(import) = self.load_legacy_blob()?
                {
                    self.save_state(profile, &import.state)?;
                    return Ok(import.state);
                }
                StateHeader::default()
            }
        };

        let mut state = ClientState {
            user_id: header.user_id,
            selected_date: header.selected_date,
            last_sync: header.last_sync,
            offline_mode: header.offline_mode,
            ..ClientState::default()
        };

        let mut statement = conn
            .prepare("SELECT meal_date, payload_json FROM day_snapshots WHERE profile = ?1")
            .map_err(|err| sqlite_error("prepare snapshot query", &self.db_path, err))?;
        let rows = statement
            .query_map(params![key], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|err| sqlite_error("query snapshots", &self.db_path, err))?;

        for row in rows {
            let (date, payload) =
                row.map_err(|err| sqlite_error("read snapshot row", &self.db_path, err))?;
            let date = parse_stored_date(&date, &self.db_path)?;
            let snapshot = serde_json::from_str::<DaySnapshot>(&payload).map_err(|err| {
                MealError::io(format!(
                    "failed to parse cached snapshot for {date} in '{}': {}",
                    self.db_path.display(),
                    err
                ))
            })?;
            state.cached_days.insert(date, snapshot);
        }

        state.pending_actions = self.load_pending_with(&conn, &key)?;

        Ok(state)
    }

    /// Writes the full state in one transaction. The pending queue is
    /// rewritten so its stored order always matches the in-memory order.
    pub fn save_state(&self, profile: &str, state: &ClientState) -> MealResult<()> {
        let key = profile_key(profile);
        let header = serde_json::to_string(&StateHeader::from(state))
            .map_err(|err| MealError::io(format!("failed to encode client state: {err}")))?;
        let now = Utc::now().to_rfc3339();

        let mut conn = self.connection()?;
        let transaction = conn
            .transaction()
            .map_err(|err| sqlite_error("start state transaction", &self.db_path, err))?;

        transaction
            .execute(
                "INSERT INTO client_state (profile, schema_version, payload_json, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(profile) DO UPDATE SET schema_version = excluded.schema_version, payload_json = excluded.payload_json, updated_at = excluded.updated_at",
                params![key, SCHEMA_VERSION, header, now],
            )
            .map_err(|err| sqlite_error("save client state", &self.db_path, err))?;

        for (date, snapshot) in &state.cached_days {
            let payload = serde_json::to_string(snapshot)
                .map_err(|err| MealError::io(format!("failed to encode snapshot: {err}")))?;
            transaction
                .execute(
                    "INSERT INTO day_snapshots (profile, meal_date, payload_json, updated_at) VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(profile, meal_date) DO UPDATE SET payload_json = excluded.payload_json, updated_at = excluded.updated_at",
                    params![key, date_key(*date), payload, now],
                )
                .map_err(|err| sqlite_error("save snapshot", &self.db_path, err))?;
        }

        transaction
            .execute(
                "DELETE FROM pending_actions WHERE profile = ?1",
                params![key],
            )
            .map_err(|err| sqlite_error("clear pending actions", &self.db_path, err))?;

        for (position, action) in state.pending_actions.iter().enumerate() {
            let payload = serde_json::to_string(action)
                .map_err(|err| MealError::io(format!("failed to encode pending action: {err}")))?;
            transaction
                .execute(
                    "INSERT INTO pending_actions (profile, position, action_id, payload_json, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        key,
                        position as i64,
                        action.id,
                        payload,
                        action.timestamp.to_rfc3339()
                    ],
                )
                .map_err(|err| sqlite_error("insert pending action", &self.db_path, err))?;
        }

        transaction
            .commit()
            .map_err(|err| sqlite_error("commit state transaction", &self.db_path, err))?;

        Ok(())
    }

    pub fn get_snapshot(&self, profile: &str, date: NaiveDate) -> MealResult<Option<DaySnapshot>> {
        let key = profile_key(profile);
        let conn = self.connection()?;
        let payload = conn
            .query_row(
                "SELECT payload_json FROM day_snapshots WHERE profile = ?1 AND meal_date = ?2",
                params![key, date_key(date)],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|err| sqlite_error("load snapshot", &self.db_path, err))?;

        let Some(payload) = payload else {
            return Ok(None);
        };

        let parsed = serde_json::from_str::<DaySnapshot>(&payload).map_err(|err| {
            MealError::io(format!(
                "failed to parse cached snapshot for {date} in '{}': {}",
                self.db_path.display(),
                err
            ))
        })?;

        Ok(Some(parsed))
    }

    pub fn set_snapshot(
        &self,
        profile: &str,
        date: NaiveDate,
        snapshot: &DaySnapshot,
    ) -> MealResult<()> {
        let key = profile_key(profile);
        let payload = serde_json::to_string(snapshot)
            .map_err(|err| MealError::io(format!("failed to encode snapshot: {err}")))?;

        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO day_snapshots (profile, meal_date, payload_json, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(profile, meal_date) DO UPDATE SET payload_json = excluded.payload_json, updated_at = excluded.updated_at",
            params![key, date_key(date), payload, Utc::now().to_rfc3339()],
        )
        .map_err(|err| sqlite_error("save snapshot", &self.db_path, err))?;

        Ok(())
    }

    pub fn load_pending(&self, profile: &str) -> MealResult<Vec<PendingAction>> {
        let conn = self.connection()?;
        self.load_pending_with(&conn, &profile_key(profile))
    }

    /// Drops the pending queue for a profile, plus cached day snapshots when
    /// `include_snapshots` is set. User id, selected date, last sync and the
    /// offline flag survive. A header row is always left behind so a legacy
    /// export is never seeded into a profile that was cleared on purpose.
    pub fn clear(&self, profile: &str, include_snapshots: bool) -> MealResult<()> {
        let key = profile_key(profile);
        let header = serde_json::to_string(&StateHeader::default())
            .map_err(|err| MealError::io(format!("failed to encode client state: {err}")))?;

        let mut conn = self.connection()?;
        let transaction = conn
            .transaction()
            .map_err(|err| sqlite_error("start clear transaction", &self.db_path, err))?;

        transaction
            .execute(
                "DELETE FROM pending_actions WHERE profile = ?1",
                params![key],
            )
            .map_err(|err| sqlite_error("clear pending actions", &self.db_path, err))?;
        if include_snapshots {
            transaction
                .execute("DELETE FROM day_snapshots WHERE profile = ?1", params![key])
                .map_err(|err| sqlite_error("clear snapshots", &self.db_path, err))?;
        }
        transaction
            .execute(
                "INSERT INTO client_state (profile, schema_version, payload_json, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(profile) DO NOTHING",
                params![key, SCHEMA_VERSION, header, Utc::now().to_rfc3339()],
            )
            .map_err(|err| sqlite_error("keep client state", &self.db_path, err))?;

        transaction
            .commit()
            .map_err(|err| sqlite_error("commit clear transaction", &self.db_path, err))?;

        Ok(())
    }

    /// Merges a legacy browser export into the profile's stored state.
    /// Imported snapshots overwrite cached ones for the same date; imported
    /// actions whose id is already queued are dropped.
    pub fn import_legacy(&self, profile: &str, raw: &str) -> MealResult<LegacyImport> {
        let import = parse_legacy_blob(raw)?;
        let mut current = self.load_state(profile)?;

        for (date, snapshot) in &import.state.cached_days {
            current.cached_days.insert(*date, snapshot.clone());
        }

        for action in &import.state.pending_actions {
            if current
                .pending_actions
                .iter()
                .all(|existing| existing.id != action.id)
            {
                current.pending_actions.push(action.clone());
            }
        }
        current
            .pending_actions
            .sort_by(|left, right| left.timestamp.cmp(&right.timestamp));

        if current.user_id.is_none() {
            current.user_id = import.state.user_id;
        }
        if current.selected_date.is_none() {
            current.selected_date = import.state.selected_date;
        }
        if current.last_sync.is_none() {
            current.last_sync = import.state.last_sync;
        }

        self.save_state(profile, &current)?;

        Ok(LegacyImport {
            state: current,
            ..import
        })
    }

    fn load_pending_with(&self, conn: &Connection, key: &str) -> MealResult<Vec<PendingAction>> {
        let mut statement = conn
            .prepare(
                "SELECT payload_json FROM pending_actions WHERE profile = ?1 ORDER BY position ASC",
            )
            .map_err(|err| sqlite_error("prepare pending actions query", &self.db_path, err))?;

        let rows = statement
            .query_map(params![key], |row| row.get::<_, String>(0))
            .map_err(|err| sqlite_error("query pending actions", &self.db_path, err))?;

        let mut actions = Vec::new();
        for row in rows {
            let payload =
                row.map_err(|err| sqlite_error("read pending action row", &self.db_path, err))?;
            let parsed = serde_json::from_str::<PendingAction>(&payload).map_err(|err| {
                MealError::io(format!(
                    "failed to parse pending action in '{}': {}",
                    self.db_path.display(),
                    err
                ))
            })?;
            actions.push(parsed);
        }

        Ok(actions)
    }

    fn load_legacy_blob(&self) -> MealResult<Option<LegacyImport>> {
        if !self.legacy_blob_path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.legacy_blob_path).map_err(|err| {
            MealError::io(format!(
                "failed to read legacy state file '{}': {}",
                self.legacy_blob_path.display(),
                err
            ))
        })?;

        if raw.trim().is_empty() {
            return Ok(None);
        }

        parse_legacy_blob(&raw).map(Some)
    }

    fn connection(&self) -> MealResult<Connection> {
        Connection::open(&self.db_path)
            .map_err(|err| sqlite_error("open state database", &self.db_path, err))
    }

    fn initialize_schema(&self, conn: &Connection) -> MealResult<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             CREATE TABLE IF NOT EXISTS client_state (
                 profile TEXT PRIMARY KEY,
                 schema_version INTEGER NOT NULL,
                 payload_json TEXT NOT NULL,
                 updated_at TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS day_snapshots (
                 profile TEXT NOT NULL,
                 meal_date TEXT NOT NULL,
                 payload_json TEXT NOT NULL,
                 updated_at TEXT NOT NULL,
                 PRIMARY KEY (profile, meal_date)
             );
             CREATE TABLE IF NOT EXISTS pending_actions (
                 profile TEXT NOT NULL,
                 position INTEGER NOT NULL,
                 action_id TEXT NOT NULL,
                 payload_json TEXT NOT NULL,
                 created_at TEXT NOT NULL,
                 PRIMARY KEY (profile, position)
             );",
        )
        .map_err(|err| sqlite_error("initialize schema", &self.db_path, err))?;

        Ok(())
    }
}

fn ensure_supported_version(schema_version: i64, db_path: &Path) -> MealResult<()> {
    if schema_version > i64::from(SCHEMA_VERSION) {
        return Err(MealError::io(format!(
            "state database '{}' was written by a newer mealsync (schema version {schema_version}, supported {SCHEMA_VERSION}); upgrade mealsync before using this workspace",
            db_path.display()
        )));
    }

    Ok(())
}

fn table_is_empty_for(
    conn: &Connection,
    table: &str,
    key: &str,
    db_path: &Path,
) -> MealResult<bool> {
    let query = format!("SELECT COUNT(*) FROM {table} WHERE profile = ?1");
    let count: i64 = conn
        .query_row(&query, params![key], |row| row.get(0))
        .map_err(|err| sqlite_error("count table rows", db_path, err))?;
    Ok(count == 0)
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_stored_date(raw: &str, db_path: &Path) -> MealResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|err| {
        MealError::io(format!(
            "invalid snapshot date '{raw}' in '{}': {}",
            db_path.display(),
            err
        ))
    })
}

fn sqlite_error(action: &str, db_path: &Path, err: SqlError) -> MealError {
    if let SqlError::SqliteFailure(code, message) = &err
        && (code.code == ErrorCode::DatabaseCorrupt || code.code == ErrorCode::NotADatabase)
    {
        let detail = message.as_deref().unwrap_or("sqlite reported corruption");
        return MealError::io(format!(
            "failed to {action}: state database '{}' is corrupted ({detail}); remove '.mealsync/state.db' and run `mealsync day show --refresh` to rebuild the cache (queued actions will be lost)",
            db_path.display()
        ));
    }

    MealError::io(format!(
        "failed to {action} using state database '{}': {}",
        db_path.display(),
        err
    ))
}

fn profile_key(profile: &str) -> String {
    let mut output = String::with_capacity(profile.len());
    for ch in profile.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            output.push(ch);
        } else {
            output.push('_');
        }
    }

    if output.is_empty() {
        "default".to_string()
    } else {
        output
    }
}
