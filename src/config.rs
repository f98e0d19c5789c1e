use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::NwpError;
use crate::index::ParseMode;
use crate::store::ListMode;

pub const CONFIG_FILE: &str = "nwp-cache.json";
pub const CACHE_DIR_ENV: &str = "NWP_CACHE_DIR";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub cache_root: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub index_mode: Option<ParseMode>,
    #[serde(default)]
    pub list_mode: Option<ListMode>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub cache_root: Utf8PathBuf,
    pub timeout: Duration,
    pub index_mode: ParseMode,
    pub list_mode: ListMode,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, NwpError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(CONFIG_FILE),
        };

        let config = if path.is_none() && !config_path.exists() {
            Config::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| NwpError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content).map_err(|err| NwpError::ConfigParse(err.to_string()))?
        };

        let env_root = std::env::var(CACHE_DIR_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty());
        Self::resolve_config(config, env_root)
    }

    pub fn resolve_config(
        config: Config,
        env_root: Option<String>,
    ) -> Result<ResolvedConfig, NwpError> {
        let cache_root = match env_root.or(config.cache_root) {
            Some(root) => Utf8PathBuf::from(root),
            None => default_cache_root()?,
        };

        Ok(ResolvedConfig {
            cache_root,
            timeout: Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            index_mode: config.index_mode.unwrap_or_default(),
            list_mode: config.list_mode.unwrap_or_default(),
        })
    }
}

pub fn default_cache_root() -> Result<Utf8PathBuf, NwpError> {
    BaseDirs::new()
        .and_then(|dirs| {
            Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("nwp-cache")).ok()
        })
        .ok_or_else(|| NwpError::Filesystem("unable to resolve cache directory".to_string()))
}
