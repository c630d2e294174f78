use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::store::Store;

pub const CONFIG_FILE: &str = "config.toml";

/// Default base directory for all storage.
pub fn default_base_dir() -> PathBuf {
    dirs_home().join(".scripture-memory")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Contents of `config.toml`. Every field is optional in the file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database file name inside the base directory.
    pub database: String,
    /// Whether new entries join the phase scheduler.
    pub default_managed: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: "memory.db".to_string(),
            default_managed: true,
        }
    }
}

impl Config {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| StoreError::InvalidData(format!("invalid {CONFIG_FILE}: {e}")))
    }

    /// Load `config.toml` from `base`, falling back to defaults when absent.
    pub fn load(base: &Path) -> Result<Self> {
        let path = base.join(CONFIG_FILE);
        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

/// The user's entry collection on disk.
///
/// Layout:
/// ```text
/// ~/.scripture-memory/
/// ├── config.toml   (optional)
/// └── memory.db
/// ```
pub struct Library {
    store: Store,
    config: Config,
    base_dir: PathBuf,
}

impl Library {
    /// Open the library, creating the base directory as needed.
    /// `base_dir`: override the base directory (for testing).
    pub fn open(base_dir: Option<&Path>) -> Result<Self> {
        let base = base_dir.map(PathBuf::from).unwrap_or_else(default_base_dir);
        fs::create_dir_all(&base)?;

        let config = Config::load(&base)?;
        let db_path = base.join(&config.database);
        tracing::debug!("opening {}", db_path.display());
        let store = Store::open(&db_path)?;

        Ok(Self {
            store,
            config,
            base_dir: base,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn db_path(&self) -> PathBuf {
        self.base_dir.join(&self.config.database)
    }
}
