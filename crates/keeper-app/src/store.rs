// Snapshot persistence: cached platform artifacts keyed by season and league.
//
// Two backends share one trait. `FileStore` writes one JSON file per
// artifact; `SqliteStore` keeps the same JSON in a key-value table.

use crate::config::{Config, StorageBackend};
use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::debug;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    League,
    Users,
    Rosters,
    Draft,
    DraftPicks,
    Transactions,
    Players,
    KeptPlayers,
}

impl Artifact {
    pub fn name(&self) -> &'static str {
        match self {
            Artifact::League => "league",
            Artifact::Users => "users",
            Artifact::Rosters => "rosters",
            Artifact::Draft => "draft",
            Artifact::DraftPicks => "draft_picks",
            Artifact::Transactions => "transactions",
            Artifact::Players => "players",
            Artifact::KeptPlayers => "kept_players",
        }
    }

    /// What the user should run to produce this artifact.
    pub fn remediation(&self) -> &'static str {
        match self {
            Artifact::KeptPlayers => "run `sleeper-keeper process-kept` for this season",
            Artifact::Players => "rerun with --player-refresh",
            _ => "rerun with --refresh",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    /// `None` for artifacts shared by every season (the player catalog).
    pub season: Option<u32>,
    pub league_id: Option<String>,
    pub artifact: Artifact,
}

impl SnapshotKey {
    pub fn season(season: u32, league_id: &str, artifact: Artifact) -> Self {
        SnapshotKey {
            season: Some(season),
            league_id: Some(league_id.to_string()),
            artifact,
        }
    }

    pub fn common(artifact: Artifact) -> Self {
        SnapshotKey {
            season: None,
            league_id: None,
            artifact,
        }
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.season, &self.league_id) {
            (Some(s), Some(l)) => write!(f, "{s}/{l}/{}", self.artifact.name()),
            (Some(s), None) => write!(f, "{s}/{}", self.artifact.name()),
            (None, _) => write!(f, "common/{}", self.artifact.name()),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no cached {key}; {remediation}")]
    MissingSnapshot {
        key: String,
        remediation: &'static str,
    },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("snapshot {key} is not valid JSON for its type: {source}")]
    Serialization {
        key: String,
        source: serde_json::Error,
    },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

// ---------------------------------------------------------------------------
// Trait and typed helpers
// ---------------------------------------------------------------------------

pub trait SnapshotStore: Send + Sync {
    fn get(&self, key: &SnapshotKey) -> Result<Option<serde_json::Value>, StoreError>;
    fn put(&self, key: &SnapshotKey, value: &serde_json::Value) -> Result<(), StoreError>;

    /// Write every entry or none of them. Readers never see a mix of old
    /// and new snapshots from one batch.
    fn put_all(&self, entries: &[(SnapshotKey, serde_json::Value)]) -> Result<(), StoreError>;
}

pub fn load<T, S>(store: &S, key: &SnapshotKey) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
    S: SnapshotStore + ?Sized,
{
    match store.get(key)? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|source| StoreError::Serialization {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Like `load`, but absence is an error naming the key and the fix.
pub fn require<T, S>(store: &S, key: &SnapshotKey) -> Result<T, StoreError>
where
    T: DeserializeOwned,
    S: SnapshotStore + ?Sized,
{
    load(store, key)?.ok_or_else(|| StoreError::MissingSnapshot {
        key: key.to_string(),
        remediation: key.artifact.remediation(),
    })
}

pub fn save<T, S>(store: &S, key: &SnapshotKey, value: &T) -> Result<(), StoreError>
where
    T: Serialize,
    S: SnapshotStore + ?Sized,
{
    let (_, json) = entry(key.clone(), value)?;
    store.put(key, &json)
}

/// Serialize one value for a `put_all` batch.
pub fn entry<T: Serialize>(
    key: SnapshotKey,
    value: &T,
) -> Result<(SnapshotKey, serde_json::Value), StoreError> {
    let json = serde_json::to_value(value).map_err(|source| StoreError::Serialization {
        key: key.to_string(),
        source,
    })?;
    Ok((key, json))
}

/// Open the backend selected in config.
pub fn open_store(config: &Config) -> Result<Box<dyn SnapshotStore>, StoreError> {
    match config.storage.backend_kind() {
        StorageBackend::File => Ok(Box::new(FileStore::new(&config.storage.data_dir))),
        StorageBackend::Sqlite => Ok(Box::new(SqliteStore::open(&config.storage.db_path)?)),
    }
}

// ---------------------------------------------------------------------------
// File backend
// ---------------------------------------------------------------------------

/// JSON files at `{root}/{season}/{league_id}/{artifact}.json`, and
/// `{root}/common/{artifact}.json` for shared artifacts.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        FileStore {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, key: &SnapshotKey) -> PathBuf {
        let mut path = self.root.clone();
        match key.season {
            Some(season) => {
                path.push(season.to_string());
                if let Some(league_id) = &key.league_id {
                    path.push(league_id);
                }
            }
            None => path.push("common"),
        }
        path.push(format!("{}.json", key.artifact.name()));
        path
    }

    /// Write `value` next to its final path as `{artifact}.json.tmp`.
    fn stage(&self, key: &SnapshotKey, value: &serde_json::Value) -> Result<(PathBuf, PathBuf), StoreError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Serialization {
            key: key.to_string(),
            source,
        })?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        Ok((tmp, path))
    }
}

fn commit_staged(staged: &[(PathBuf, PathBuf)]) -> Result<(), StoreError> {
    for (tmp, path) in staged {
        std::fs::rename(tmp, path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        debug!("wrote snapshot {}", path.display());
    }
    Ok(())
}

fn discard_staged(staged: &[(PathBuf, PathBuf)]) {
    for (tmp, _) in staged {
        let _ = std::fs::remove_file(tmp);
    }
}

impl SnapshotStore for FileStore {
    fn get(&self, key: &SnapshotKey) -> Result<Option<serde_json::Value>, StoreError> {
        let path = self.path_for(key);
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        let value = serde_json::from_slice(&bytes).map_err(|source| StoreError::Serialization {
            key: key.to_string(),
            source,
        })?;
        debug!("read snapshot {}", path.display());
        Ok(Some(value))
    }

    fn put(&self, key: &SnapshotKey, value: &serde_json::Value) -> Result<(), StoreError> {
        let staged = self.stage(key, value)?;
        commit_staged(std::slice::from_ref(&staged))
    }

    fn put_all(&self, entries: &[(SnapshotKey, serde_json::Value)]) -> Result<(), StoreError> {
        let mut staged = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            match self.stage(key, value) {
                Ok(pair) => staged.push(pair),
                Err(e) => {
                    discard_staged(&staged);
                    return Err(e);
                }
            }
        }
        let result = commit_staged(&staged);
        if result.is_err() {
            discard_staged(&staged);
        }
        result
    }
}

// ---------------------------------------------------------------------------
// SQLite backend
// ---------------------------------------------------------------------------

/// Snapshots as JSON text in a single key-value table.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`. Pass `":memory:"` for an
    /// ephemeral database.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             CREATE TABLE IF NOT EXISTS snapshots (
                 key        TEXT PRIMARY KEY,
                 value      TEXT NOT NULL,
                 updated_at TEXT NOT NULL
             );",
        )?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }
}

impl SnapshotStore for SqliteStore {
    fn get(&self, key: &SnapshotKey) -> Result<Option<serde_json::Value>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT value FROM snapshots WHERE key = ?1")?;
        let mut rows = stmt.query_map(params![key.to_string()], |row| row.get::<_, String>(0))?;

        match rows.next() {
            Some(row) => {
                let text = row?;
                let value =
                    serde_json::from_str(&text).map_err(|source| StoreError::Serialization {
                        key: key.to_string(),
                        source,
                    })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn put(&self, key: &SnapshotKey, value: &serde_json::Value) -> Result<(), StoreError> {
        let text = serde_json::to_string(value).map_err(|source| StoreError::Serialization {
            key: key.to_string(),
            source,
        })?;
        let now = chrono::Utc::now().to_rfc3339();
        self.conn().execute(
            "INSERT OR REPLACE INTO snapshots (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key.to_string(), text, now],
        )?;
        Ok(())
    }

    fn put_all(&self, entries: &[(SnapshotKey, serde_json::Value)]) -> Result<(), StoreError> {
        let mut rows = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let text = serde_json::to_string(value).map_err(|source| StoreError::Serialization {
                key: key.to_string(),
                source,
            })?;
            rows.push((key.to_string(), text));
        }

        let now = chrono::Utc::now().to_rfc3339();
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO snapshots (key, value, updated_at) VALUES (?1, ?2, ?3)",
            )?;
            for (key, text) in &rows {
                stmt.execute(params![key, text, now])?;
            }
        }
        tx.commit()?;
        debug!("wrote {} snapshots in one transaction", rows.len());
        Ok(())
    }
}
