use std::{env, fs, io, path::Path};

use log::info;
use serde::Deserialize;
use thiserror::Error;

use crate::contest::DEFAULT_ENDPOINT;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read { path: String, source: io::Error },

    #[error("could not parse config file {path}: {source}")]
    Parse { path: String, source: toml::de::Error },

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Users shown on the leaderboard.
    pub usernames: Vec<String>,
    pub endpoint: String,
    /// Caps concurrent fetches. Unset means one fetch per user at once.
    pub max_concurrency: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            usernames: Vec::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_concurrency: None,
        }
    }
}

/// Splits a comma separated list, trimming names and dropping empty ones.
pub fn parse_usernames(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

fn parse_max_concurrency(raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue {
            key: "CONTEST_MAX_CONCURRENCY",
            value: raw.to_string(),
        }),
    }
}

impl Config {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Starts from `CONFIG_PATH` if set, then applies `USERNAMES`,
    /// `CONTEST_ENDPOINT` and `CONTEST_MAX_CONCURRENCY` on top.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = match env::var("CONFIG_PATH") {
            Ok(path) => {
                info!("Loading config from {path}");
                Self::from_toml_file(path)?
            }
            Err(_) => Self::default(),
        };

        config.with_overrides(|key| env::var(key).ok())
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup("USERNAMES") {
            self.usernames = parse_usernames(&raw);
        }
        if let Some(endpoint) = lookup("CONTEST_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(raw) = lookup("CONTEST_MAX_CONCURRENCY") {
            self.max_concurrency = Some(parse_max_concurrency(&raw)?);
        }

        Ok(self)
    }
}
