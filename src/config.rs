//! Application-level configuration loading for the demo binary.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};
use tracing::{info, warn};

use crate::{dao::records::DEFAULT_MAX_RECORDS, games::GameKind, state::DEFAULT_TICK_INTERVAL};

/// Default location on disk where the binary looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "PARTY_QUIZ_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq)]
/// Immutable runtime configuration.
pub struct AppConfig {
    /// Directory holding one `<content_key>.json` array per game.
    pub content_dir: PathBuf,
    /// JSON file receiving finished game records.
    pub records_path: PathBuf,
    /// Records kept in that file, newest first.
    pub max_records: usize,
    /// Wall-clock length of one nominal second of game time.
    pub tick_interval: Duration,
    /// Game played by the binary.
    pub game: GameKind,
    /// Pause between two scripted player actions.
    pub action_interval: Duration,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        game = config.game.slug(),
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON document; missing keys take their default value.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    content_dir: PathBuf,
    records_path: PathBuf,
    max_records: usize,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    tick_interval_ms: Duration,
    game: GameKind,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    action_interval_ms: Duration,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("data"),
            records_path: PathBuf::from("data/records.json"),
            max_records: DEFAULT_MAX_RECORDS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL,
            game: GameKind::WhoAmI,
            action_interval_ms: Duration::from_millis(1_500),
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            content_dir: value.content_dir,
            records_path: value.records_path,
            max_records: value.max_records.max(1),
            tick_interval: value.tick_interval_ms,
            game: value.game,
            action_interval: value.action_interval_ms,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_documents_keep_defaults() {
        let config = AppConfig::parse(r#"{"game": "taboo", "tick_interval_ms": 250}"#).unwrap();
        assert_eq!(config.game, GameKind::Taboo);
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.max_records, DEFAULT_MAX_RECORDS);
        assert_eq!(config.content_dir, PathBuf::from("data"));
    }

    #[test]
    fn unknown_games_are_rejected() {
        assert!(AppConfig::parse(r#"{"game": "chess"}"#).is_err());
    }

    #[test]
    fn record_cap_is_at_least_one() {
        let config = AppConfig::parse(r#"{"max_records": 0}"#).unwrap();
        assert_eq!(config.max_records, 1);
    }
}
