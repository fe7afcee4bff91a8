// Configuration loaded from YAML

use crate::persist::{FileStore, KvStore, SqliteStore};
use crate::store::TaskStore;
use crate::view::{Filter, SortOrder, ViewOptions};
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const APP_DIR: &str = "taskforge";
const CONFIG_FILE: &str = "config.yml";

/// Storage backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// JSON snapshot file per key
    #[default]
    File,
    /// SQLite key-value table
    Sqlite,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: Backend,
    /// Data directory; defaults to the platform data dir
    pub path: Option<PathBuf>,
}

/// Initial view controls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub filter: Filter,
    pub sort: SortOrder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub view: ViewConfig,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            view: ViewConfig::default(),
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the default location is tried
    /// and a missing file yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match Self::source_path(explicit) {
            Some(path) if path.exists() => Self::load_from(&path),
            Some(path) => Err(eyre!("Config file not found: {}", path.display())),
            None => {
                debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// The file [`Config::load`] reads: the explicit path, else the default
    /// location when a file exists there
    pub fn source_path(explicit: Option<&Path>) -> Option<PathBuf> {
        match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path().filter(|path| path.exists()),
        }
    }

    fn load_from(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        info!(file = ?path, "Loaded config");
        Ok(config)
    }

    /// Directory holding the task data
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.storage.path {
            Some(path) => Ok(expand_tilde(path)),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or_else(|| eyre!("Could not determine data directory; set storage.path")),
        }
    }

    pub fn view_options(&self) -> ViewOptions {
        ViewOptions::new(self.view.filter, "", self.view.sort)
    }

    /// Open the configured backend
    pub fn open_backend(&self) -> Result<Box<dyn KvStore>> {
        let dir = self.data_dir()?;
        debug!(backend = ?self.storage.backend, dir = ?dir, "Opening storage backend");

        let kv: Box<dyn KvStore> = match self.storage.backend {
            Backend::File => Box::new(FileStore::open(&dir)?),
            Backend::Sqlite => Box::new(SqliteStore::open(&dir)?),
        };
        Ok(kv)
    }

    /// Open a task store with the configured backend and initial view
    pub fn open_store(&self) -> Result<TaskStore> {
        let mut store = TaskStore::open(self.open_backend()?)?;
        store.set_view_options(self.view_options());
        Ok(store)
    }
}

/// `~/.config/taskforge/config.yml` or the platform equivalent
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
