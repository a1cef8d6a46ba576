//! Application-level configuration loading: recorder and aggregator tunables.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "CLUB_STATS_CONFIG_PATH";

const DEFAULT_MIN_PRESENT_PLAYERS: usize = 2;
const DEFAULT_LEADERBOARD_SIZE: usize = 3;
const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(4 * 60 * 60);
const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_millis(5_000);

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    min_present_players: usize,
    leaderboard_size: usize,
    session_ttl: Duration,
    storage_timeout: Duration,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        min_present_players = config.min_present_players,
                        leaderboard_size = config.leaderboard_size,
                        session_ttl_secs = config.session_ttl.as_secs(),
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

    /// Players that must be marked present before a match can start.
    pub fn min_present_players(&self) -> usize {
        self.min_present_players
    }

    /// Entries kept per category leaderboard.
    pub fn leaderboard_size(&self) -> usize {
        self.leaderboard_size
    }

    /// Idle time after which a recorder session is swept.
    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Upper bound for the attendance write issued when a match finishes.
    pub fn storage_timeout(&self) -> Duration {
        self.storage_timeout
    }

    /// Override the minimum presence gate.
    pub fn with_min_present_players(mut self, value: usize) -> Self {
        self.min_present_players = value.max(1);
        self
    }

    /// Override the recorder session time-to-live.
    pub fn with_session_ttl(mut self, value: Duration) -> Self {
        self.session_ttl = value;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            min_present_players: DEFAULT_MIN_PRESENT_PLAYERS,
            leaderboard_size: DEFAULT_LEADERBOARD_SIZE,
            session_ttl: DEFAULT_SESSION_TTL,
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the file located at [`DEFAULT_CONFIG_PATH`]; absent keys keep their default.
struct RawConfig {
    min_present_players: Option<usize>,
    leaderboard_size: Option<usize>,
    session_ttl_secs: Option<u64>,
    storage_timeout_ms: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            min_present_players: value
                .min_present_players
                .map_or(defaults.min_present_players, |count| count.max(1)),
            leaderboard_size: value
                .leaderboard_size
                .unwrap_or(defaults.leaderboard_size),
            session_ttl: value
                .session_ttl_secs
                .map_or(defaults.session_ttl, Duration::from_secs),
            storage_timeout: value
                .storage_timeout_ms
                .map_or(defaults.storage_timeout, Duration::from_millis),
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
    fn missing_keys_keep_defaults() {
        let raw: RawConfig = serde_json::from_str(r#"{"leaderboard_size": 5}"#).unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(config.leaderboard_size(), 5);
        assert_eq!(config.min_present_players(), 2);
        assert_eq!(config.session_ttl(), Duration::from_secs(14_400));
        assert_eq!(config.storage_timeout(), Duration::from_millis(5_000));
    }

    #[test]
    fn presence_gate_never_drops_below_one() {
        let raw: RawConfig = serde_json::from_str(r#"{"min_present_players": 0}"#).unwrap();
        assert_eq!(AppConfig::from(raw).min_present_players(), 1);
        assert_eq!(
            AppConfig::default()
                .with_min_present_players(0)
                .min_present_players(),
            1
        );
    }
}
