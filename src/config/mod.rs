//! Configuration module - environment variable parsing

use std::env;
use std::str::FromStr;

use crate::ws::protocol::Team;

/// Client configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Game server WebSocket URL
    pub server_url: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Display name sent on connect
    pub player_name: String,
    /// Room to join; a new room is created when absent
    pub room_code: Option<String>,

    /// Field size reported to the server
    pub field_width: f32,
    pub field_height: f32,

    /// Match settings applied when hosting
    pub starting_team: Team,
    /// Match duration in minutes
    pub game_duration: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_url =
            lookup("SERVER_URL").unwrap_or_else(|| "ws://127.0.0.1:3000/ws".to_string());
        if !(server_url.starts_with("ws://") || server_url.starts_with("wss://")) {
            return Err(ConfigError::Invalid("SERVER_URL", server_url));
        }

        let player_name = lookup("PLAYER_NAME")
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or(ConfigError::Missing("PLAYER_NAME"))?;

        let room_code = lookup("ROOM_CODE")
            .map(|code| code.trim().to_uppercase())
            .filter(|code| !code.is_empty());

        let starting_team: Team = parse_or(&lookup, "STARTING_TEAM", Team::Red)?;
        if !starting_team.is_playing() {
            return Err(ConfigError::Invalid(
                "STARTING_TEAM",
                starting_team.to_string(),
            ));
        }

        Ok(Self {
            server_url,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            player_name,
            room_code,
            field_width: parse_or(&lookup, "FIELD_WIDTH", 1200.0)?,
            field_height: parse_or(&lookup, "FIELD_HEIGHT", 720.0)?,
            starting_team,
            game_duration: parse_or(&lookup, "GAME_DURATION", 5)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(key, raw)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
