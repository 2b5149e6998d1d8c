//! # Relay Configuration
//!
//! Settings come from the environment first, then from an optional JSON
//! config file (`RELAY_CONFIG_FILE`). Missing required keys fail startup
//! with a typed error instead of a half-configured process.

use std::path::PathBuf;
use thiserror::Error;

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Case-insensitive substring a post must contain to be delivered.
    pub keyword: String,
    /// Minimum minutes between reconnect attempts. Values below the
    /// upstream rate-limit floor are clamped at the point of use.
    pub reconnect_interval_minutes: u64,
    /// Cap on the total number of followed external accounts.
    pub max_followed_accounts: usize,
    /// Path of the subscription snapshot file.
    pub snapshot_path: PathBuf,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required key is present in neither the environment nor the file.
    #[error("Missing required configuration key {env_key} (file key {file_key:?})")]
    MissingKey {
        /// Environment variable name.
        env_key: &'static str,
        /// Corresponding JSON file key.
        file_key: &'static str,
    },

    /// A key was present but could not be parsed.
    #[error("Invalid value {value:?} for configuration key {env_key}")]
    InvalidValue {
        /// Environment variable name.
        env_key: &'static str,
        /// The offending raw value.
        value: String,
    },

    /// The config file could not be read or parsed.
    #[error("Could not read config file {path}: {message}")]
    File {
        /// Path of the config file.
        path: String,
        /// Underlying error text.
        message: String,
    },
}

/// One configuration key with its two spellings.
struct Key {
    env: &'static str,
    file: &'static str,
}

const KEYWORD: Key = Key {
    env: "RELAY_KEYWORD",
    file: "keyword",
};
const RECONNECT_MINUTES: Key = Key {
    env: "RELAY_RECONNECT_MINUTES",
    file: "reconnect_minutes",
};
const MAX_FOLLOWS: Key = Key {
    env: "RELAY_MAX_FOLLOWS",
    file: "max_follows",
};
const SNAPSHOT_PATH: Key = Key {
    env: "RELAY_SNAPSHOT_PATH",
    file: "snapshot_path",
};
const LOG_LEVEL: Key = Key {
    env: "RELAY_LOG_LEVEL",
    file: "log_level",
};

impl RelayConfig {
    /// Load from the process environment, with the JSON file named by
    /// `RELAY_CONFIG_FILE` as fallback for individual keys.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] when the file is unreadable, a required key is
    /// missing, or a value fails to parse.
    pub fn load() -> Result<Self, ConfigError> {
        let file = match std::env::var("RELAY_CONFIG_FILE") {
            Ok(path) => Some(read_config_file(&path)?),
            Err(_) => None,
        };
        Self::from_sources(file.as_ref(), |key| std::env::var(key).ok())
    }

    /// Resolve every key against the given sources. Split out from
    /// [`Self::load`] so resolution is testable without touching the
    /// process environment.
    pub fn from_sources(
        file: Option<&serde_json::Value>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let required = |key: &Key| {
            lookup(file, &env, key).ok_or(ConfigError::MissingKey {
                env_key: key.env,
                file_key: key.file,
            })
        };

        let keyword = required(&KEYWORD)?;
        let snapshot_path = PathBuf::from(required(&SNAPSHOT_PATH)?);
        let reconnect_interval_minutes =
            parse_or(&RECONNECT_MINUTES, lookup(file, &env, &RECONNECT_MINUTES), 15)?;
        let max_followed_accounts =
            parse_or(&MAX_FOLLOWS, lookup(file, &env, &MAX_FOLLOWS), 100)?;
        let log_level = lookup(file, &env, &LOG_LEVEL).unwrap_or_else(|| "info".to_string());

        Ok(Self {
            keyword,
            reconnect_interval_minutes,
            max_followed_accounts,
            snapshot_path,
            log_level,
        })
    }
}

fn read_config_file(path: &str) -> Result<serde_json::Value, ConfigError> {
    let file_error = |message: String| ConfigError::File {
        path: path.to_string(),
        message,
    };
    let raw = std::fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
    serde_json::from_str(&raw).map_err(|e| file_error(e.to_string()))
}

/// Environment wins over the file; JSON numbers are accepted where the
/// environment would carry a numeric string.
fn lookup(
    file: Option<&serde_json::Value>,
    env: &impl Fn(&str) -> Option<String>,
    key: &Key,
) -> Option<String> {
    if let Some(value) = env(key.env) {
        return Some(value);
    }
    match file?.get(key.file)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &Key,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            env_key: key.env,
            value: raw,
        }),
    }
}
