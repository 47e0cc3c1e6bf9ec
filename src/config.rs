use std::{
    ffi::OsString,
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::{LemmatizerError, Result};

/// Overrides every other data directory setting when set.
pub const DATA_DIR_ENV: &str = "LEMMATIZER_BE_DATA_DIR";

pub const DEFAULT_CORPUS_URL: &str =
    "https://github.com/Belarus/GrammarDB/releases/download/RELEASE-202309/RELEASE-20230920.zip";

const APP_DIR_NAME: &str = "lemmatizer-be";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageMode {
    /// Load the whole index at construction.
    #[default]
    Memory,
    /// Keep the index on disk and read one block per lookup.
    Disk,
}

impl FromStr for StorageMode {
    type Err = LemmatizerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageMode::Memory),
            "disk" => Ok(StorageMode::Disk),
            _ => Err(LemmatizerError::InvalidStorageMode(s.to_string())),
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageMode::Memory => write!(f, "memory"),
            StorageMode::Disk => write!(f, "disk"),
        }
    }
}

// storage_mode stays a string so a bad value fails lemmatizer construction, not config parsing
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub data_dir: Option<PathBuf>,
    pub corpus_dir: PathBuf,
    pub storage_mode: String,
    /// Zip archive holding a prebuilt `lemma_data.json` or disk table. Without one, a
    /// missing index is built from the corpus.
    pub index_url: Option<String>,
    pub corpus_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: None,
            corpus_dir: PathBuf::from("bnkorpus"),
            storage_mode: StorageMode::default().to_string(),
            index_url: None,
            corpus_url: DEFAULT_CORPUS_URL.to_string(),
        }
    }
}

impl Config {
    pub fn storage_mode(&self) -> Result<StorageMode> {
        self.storage_mode.parse()
    }

    pub fn data_dir(&self) -> PathBuf {
        resolve_data_dir(std::env::var_os(DATA_DIR_ENV), self.data_dir.as_deref())
    }
}

fn resolve_data_dir(env_value: Option<OsString>, configured: Option<&Path>) -> PathBuf {
    if let Some(dir) = env_value.filter(|value| !value.is_empty()) {
        return PathBuf::from(dir);
    }
    if let Some(dir) = configured {
        return dir.to_path_buf();
    }
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("data"))
}

pub fn load_config(path: &Path) -> Config {
    if !path.exists() {
        info!("{} not found, using default configuration", path.display());
        return Config::default();
    }
    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(config) => {
                info!("loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                warn!("error parsing {}: {}, using default configuration", path.display(), e);
                Config::default()
            }
        },
        Err(e) => {
            warn!("error reading {}: {}, using default configuration", path.display(), e);
            Config::default()
        }
    }
}
