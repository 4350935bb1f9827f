use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

const ENV_PREFIX: &str = "EAGLE_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("Failed to load config from environment: {0}")]
    Env(#[from] envy::Error),
}

/// Settings fixed for the lifetime of the process. Built once in `main` and
/// shared read-only with request handlers.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct AgentConfig {
    /// Expected Basic-auth username. Empty when unset.
    pub username: String,
    /// Expected Basic-auth password. Empty when unset.
    pub password: String,
    pub log_dir: String,
    /// Answer 503 instead of `null` when the load average cannot be read.
    pub strict_sampling: bool,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialAgentConfig {
    username: Option<String>,
    password: Option<String>,
    log_dir: Option<String>,
    strict_sampling: Option<bool>,
}

/// What happened to the `--config` file. Reported by the caller once logging is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigFile {
    NotGiven,
    Missing(PathBuf),
    Loaded(PathBuf),
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl AgentConfig {
    /// Layers `.env`, the optional TOML file and `EAGLE_*` environment
    /// variables, environment winning over the file.
    pub fn load(config_path: Option<&str>) -> Result<(Self, ConfigFile), ConfigError> {
        dotenv::dotenv().ok();

        let (file_config, file_status) = resolve_config_file(config_path.map(Path::new))?;
        let env_config: PartialAgentConfig = envy::prefixed(ENV_PREFIX).from_env()?;

        Ok((merge(env_config, file_config), file_status))
    }

    /// Credentials missing from every source silently fall back to empty strings.
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

fn resolve_config_file(
    path: Option<&Path>,
) -> Result<(PartialAgentConfig, ConfigFile), ConfigError> {
    let Some(path) = path else {
        return Ok((PartialAgentConfig::default(), ConfigFile::NotGiven));
    };
    match read_config_file(path)? {
        Some(partial) => Ok((partial, ConfigFile::Loaded(path.to_path_buf()))),
        None => Ok((
            PartialAgentConfig::default(),
            ConfigFile::Missing(path.to_path_buf()),
        )),
    }
}

/// `None` when the file does not exist.
fn read_config_file(path: &Path) -> Result<Option<PartialAgentConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let parsed = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    Ok(Some(parsed))
}

fn merge(env: PartialAgentConfig, file: PartialAgentConfig) -> AgentConfig {
    AgentConfig {
        username: env.username.or(file.username).unwrap_or_default(),
        password: env.password.or(file.password).unwrap_or_default(),
        log_dir: env.log_dir.or(file.log_dir).unwrap_or_else(default_log_dir),
        strict_sampling: env.strict_sampling.or(file.strict_sampling).unwrap_or(false),
    }
}
