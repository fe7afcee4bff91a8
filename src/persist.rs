// Snapshot persistence over a key-value store

use crate::error::TaskError;
use crate::task::Task;
use eyre::{Context, Result, eyre};
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Key the task collection is stored under
pub const STORAGE_KEY: &str = "advanced_todos_v1";

const CURRENT_VERSION: u32 = 1;

/// Durable string key-value storage
pub trait KvStore {
    /// Raw value at `key`, or `None` if nothing was ever stored there
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value at `key`
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Load the task collection
///
/// A missing value yields an empty collection. So does a value that does not
/// parse; that case is logged and otherwise ignored. Errors from the backend
/// itself are returned.
pub fn load(kv: &dyn KvStore) -> Result<Vec<Task>> {
    let raw = match kv.get(STORAGE_KEY)? {
        Some(raw) if !raw.is_empty() => raw,
        _ => {
            debug!(key = STORAGE_KEY, "No saved tasks");
            return Ok(Vec::new());
        }
    };

    match decode(&raw) {
        Ok(tasks) => {
            info!(key = STORAGE_KEY, count = tasks.len(), "Loaded saved tasks");
            Ok(tasks)
        }
        Err(e) => {
            warn!(key = STORAGE_KEY, error = %e, "Failed to parse saved tasks, starting empty");
            Ok(Vec::new())
        }
    }
}

/// Save the full task collection, replacing whatever was stored
pub fn save(kv: &mut dyn KvStore, tasks: &[Task]) -> Result<()> {
    let json = serde_json::to_string(tasks).context("Failed to serialize tasks")?;
    kv.set(STORAGE_KEY, &json)?;

    debug!(key = STORAGE_KEY, count = tasks.len(), "Saved tasks");
    Ok(())
}

/// Decode a stored snapshot
pub fn decode(raw: &str) -> Result<Vec<Task>, TaskError> {
    Ok(serde_json::from_str(raw)?)
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Volatile store, for tests and hosts that persist elsewhere
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ============================================================================
// File backend
// ============================================================================

/// One `{key}.json` file per key inside a directory
#[derive(Debug)]
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    /// Open or create a file store rooted at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;

        let store = Self { base_path };
        store.write_version()?;
        Ok(store)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn write_version(&self) -> Result<()> {
        let version_path = self.base_path.join(".version");
        if !version_path.exists() {
            fs::write(version_path, CURRENT_VERSION.to_string())?;
        }
        Ok(())
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.base_path.join(format!("{}.json", key)))
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }

        let mut file = File::open(&path).context("Failed to open store file")?;
        FileExt::lock_shared(&file).context("Failed to acquire file lock")?;

        let mut raw = String::new();
        file.read_to_string(&mut raw).context("Failed to read store file")?;
        Ok(Some(raw))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .context("Failed to open store file for writing")?;

        // Truncate only once the lock is held
        FileExt::lock_exclusive(&file).context("Failed to acquire file lock")?;
        file.set_len(0)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;

        // Lock is released when file is dropped
        Ok(())
    }
}

// ============================================================================
// SQLite backend
// ============================================================================

/// Key-value table in a SQLite database
pub struct SqliteStore {
    db: Connection,
}

impl SqliteStore {
    /// Open or create `taskforge.db` inside the directory `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref();
        fs::create_dir_all(base_path).context("Failed to create store directory")?;

        let db_path = base_path.join("taskforge.db");
        let db = Connection::open(&db_path).context("Failed to open SQLite database")?;

        let store = Self { db };
        store.create_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open SQLite database")?;

        let store = Self { db };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating database schema");

        self.db.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );

            PRAGMA user_version = {};
            "#,
            CURRENT_VERSION
        ))?;

        Ok(())
    }
}

impl KvStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;

        let value = self
            .db
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;

        self.db.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![key, value, crate::now_ms()],
        )?;
        Ok(())
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(eyre!("Storage key cannot be empty"));
    }
    if key.len() > 64 {
        return Err(eyre!("Storage key too long: {} (max 64 chars)", key));
    }
    if !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(eyre!("Invalid storage key: {} (must be alphanumeric with _/-)", key));
    }
    Ok(())
}
