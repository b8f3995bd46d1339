use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::session::{DEFAULT_DEFER_WINDOW, DEFAULT_SEED_SIZE};

pub const DATA_DIR_ENV: &str = "HANGUGO_DATA_DIR";
pub const CONFIG_FILE: &str = "config.json";
pub const DEFAULT_CATALOG_FILE: &str = "words.json";
pub const DEFAULT_SESSION_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Catalog file to prefer over `<data_dir>/words.json`.
    pub catalog_path: Option<PathBuf>,
    pub session_size: usize,
    pub defer_window: usize,
    pub seed_size: usize,
    /// First review of a newly learned item is tomorrow rather than today.
    pub start_tomorrow: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::new(),
            catalog_path: None,
            session_size: DEFAULT_SESSION_SIZE,
            defer_window: DEFAULT_DEFER_WINDOW,
            seed_size: DEFAULT_SEED_SIZE,
            start_tomorrow: true,
        }
    }
}

impl Config {
    /// Reads `config.json` from `data_dir` if present; defaults otherwise.
    pub fn load<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        let path = data_dir.join(CONFIG_FILE);

        let mut config = if path.is_file() {
            let text = fs::read_to_string(&path).map_err(|source| Error::ConfigRead {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str::<Config>(&text).map_err(|source| Error::Config {
                path: path.clone(),
                source,
            })?
        } else {
            Config::default()
        };

        config.data_dir = data_dir;
        config.defer_window = config.defer_window.max(1);
        config.seed_size = config.seed_size.max(1);
        Ok(config)
    }

    pub fn catalog_fallback_path(&self) -> PathBuf {
        self.data_dir.join(DEFAULT_CATALOG_FILE)
    }
}

pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hangugo")
}
