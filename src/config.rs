//! Application-level configuration loading: room capacity, round timing and queue sizes.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::RoomSettings;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "WACKAMOLE_CONFIG_PATH";

const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;
const DEFAULT_ROUND_DURATION_MS: u64 = 60_000;
const DEFAULT_MIN_PLAYERS: usize = 2;
const DEFAULT_MAX_PLAYERS: usize = 2;
const DEFAULT_STARTING_HEALTH: u32 = 3;
const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    tick_interval: Duration,
    round_duration: Duration,
    min_players: usize,
    max_players: usize,
    starting_health: u32,
    outbound_capacity: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        config = ?app_config,
                        "loaded game configuration"
                    );
                    app_config
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

    /// Interval between two ticks of a room.
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Capacity of each session's outbound queue.
    pub fn outbound_capacity(&self) -> usize {
        self.outbound_capacity
    }

    /// Settings applied to every room the registry creates.
    pub fn room_settings(&self) -> RoomSettings {
        RoomSettings {
            min_players: self.min_players,
            max_players: self.max_players,
            round_duration: self.round_duration,
            starting_health: self.starting_health,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    tick_interval_ms: Option<u64>,
    round_duration_ms: Option<u64>,
    min_players: Option<usize>,
    max_players: Option<usize>,
    starting_health: Option<u32>,
    outbound_capacity: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let positive_u64 = |v: Option<u64>, default| v.filter(|v| *v > 0).unwrap_or(default);
        let positive = |v: Option<usize>, default| v.filter(|v| *v > 0).unwrap_or(default);

        let mut min_players = positive(value.min_players, DEFAULT_MIN_PLAYERS);
        let mut max_players = positive(value.max_players, DEFAULT_MAX_PLAYERS);
        if max_players < min_players {
            warn!(
                min_players,
                max_players, "max_players below min_players; using default capacity"
            );
            min_players = DEFAULT_MIN_PLAYERS;
            max_players = DEFAULT_MAX_PLAYERS;
        }

        Self {
            tick_interval: Duration::from_millis(positive_u64(
                value.tick_interval_ms,
                DEFAULT_TICK_INTERVAL_MS,
            )),
            round_duration: Duration::from_millis(positive_u64(
                value.round_duration_ms,
                DEFAULT_ROUND_DURATION_MS,
            )),
            min_players,
            max_players,
            starting_health: value
                .starting_health
                .filter(|v| *v > 0)
                .unwrap_or(DEFAULT_STARTING_HEALTH),
            outbound_capacity: positive(value.outbound_capacity, DEFAULT_OUTBOUND_CAPACITY),
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
    fn empty_file_yields_defaults() {
        let raw: RawConfig = serde_json::from_str("{}").unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.outbound_capacity(), 256);
        assert_eq!(config.room_settings(), RoomSettings::default());
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"tick_interval_ms": 250, "max_players": 4}"#).unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.tick_interval(), Duration::from_millis(250));
        let settings = config.room_settings();
        assert_eq!(settings.min_players, 2);
        assert_eq!(settings.max_players, 4);
    }

    #[test]
    fn invalid_values_are_normalized() {
        let raw: RawConfig = serde_json::from_str(
            r#"{"tick_interval_ms": 0, "min_players": 5, "max_players": 3, "outbound_capacity": 0}"#,
        )
        .unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.outbound_capacity(), 256);
        let settings = config.room_settings();
        assert_eq!((settings.min_players, settings.max_players), (2, 2));
    }
}
