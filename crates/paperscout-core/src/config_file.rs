use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub search: Option<SearchConfig>,
    pub download: Option<DownloadConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub max_results: Option<usize>,
    pub rate_limit_delay_secs: Option<f64>,
    pub days_back: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadConfig {
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_delay_secs: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: Option<String>,
    pub level: Option<String>,
}

/// Platform config directory path: `<config_dir>/paperscout/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("paperscout").join("config.toml"))
}

/// Load config by cascading CWD `.paperscout.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".paperscout.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Read and parse a config file, reporting why it could not be used.
pub fn read_config(path: &Path) -> Result<ConfigFile, CoreError> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    if !path.exists() {
        return None;
    }
    match read_config(path) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
            None
        }
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let search = match (base.search, overlay.search) {
        (None, None) => None,
        (b, o) => {
            let b = b.unwrap_or_default();
            let o = o.unwrap_or_default();
            Some(SearchConfig {
                max_results: o.max_results.or(b.max_results),
                rate_limit_delay_secs: o.rate_limit_delay_secs.or(b.rate_limit_delay_secs),
                days_back: o.days_back.or(b.days_back),
            })
        }
    };

    let download = match (base.download, overlay.download) {
        (None, None) => None,
        (b, o) => {
            let b = b.unwrap_or_default();
            let o = o.unwrap_or_default();
            Some(DownloadConfig {
                timeout_secs: o.timeout_secs.or(b.timeout_secs),
                max_retries: o.max_retries.or(b.max_retries),
                retry_delay_secs: o.retry_delay_secs.or(b.retry_delay_secs),
            })
        }
    };

    let logging = match (base.logging, overlay.logging) {
        (None, None) => None,
        (b, o) => {
            let b = b.unwrap_or_default();
            let o = o.unwrap_or_default();
            Some(LoggingConfig {
                log_dir: o.log_dir.or(b.log_dir),
                level: o.level.or(b.level),
            })
        }
    };

    ConfigFile {
        search,
        download,
        logging,
    }
}
