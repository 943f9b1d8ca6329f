//! Config file discovery, loading, and environment variable overlay.

use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Pipeline paths and logging defaults.
///
/// Load order (later wins): compiled defaults, user config
/// (`~/.config/offkey/config.toml`), local `./offkey.toml`, a CLI
/// `--config` path, then `OFFKEY_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Flat directory of staged (whitespace-normalized) training files
    pub staging_dir: PathBuf,
    /// Where corpus matrices and other artifacts land
    pub artifacts_dir: PathBuf,
    pub log_level: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let data_dir = directories::BaseDirs::new()
            .map(|d| d.data_dir().join("offkey"))
            .unwrap_or_else(|| PathBuf::from(".offkey"));

        Self {
            staging_dir: data_dir.join("staging"),
            artifacts_dir: data_dir.join("artifacts"),
            log_level: "info".to_string(),
        }
    }
}

/// One config file's contents; absent keys leave the running value alone.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    staging_dir: Option<String>,
    artifacts_dir: Option<String>,
    log_level: Option<String>,
}

impl PipelineConfig {
    pub fn load_from(cli_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for path in discover_config_files(cli_path) {
            let file = load_file(&path)?;
            config.apply(file);
        }

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply(&mut self, file: ConfigFile) {
        if let Some(v) = file.staging_dir {
            self.staging_dir = expand_path(&v);
        }
        if let Some(v) = file.artifacts_dir {
            self.artifacts_dir = expand_path(&v);
        }
        if let Some(v) = file.log_level {
            self.log_level = v;
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("OFFKEY_STAGING_DIR") {
            self.staging_dir = expand_path(&v);
        }
        if let Ok(v) = env::var("OFFKEY_ARTIFACTS_DIR") {
            self.artifacts_dir = expand_path(&v);
        }
        if let Ok(v) = env::var("OFFKEY_LOG_LEVEL") {
            self.log_level = v;
        }
    }
}

/// Paths in load order (user, local, CLI override). Only existing files
/// are returned; a CLI path replaces the local override.
fn discover_config_files(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("offkey/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("offkey.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

fn load_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Expand a leading `~/` against the home directory.
fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
