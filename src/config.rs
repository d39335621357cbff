use chrono_tz::Tz;
use std::fmt;
use std::path::PathBuf;

/// Ergast-compatible mirror; ergast.com itself is retired.
pub const DEFAULT_ERGAST_URL: &str = "https://api.jolpi.ca/ergast/f1";

const DEFAULT_TZ: &str = "Europe/Moscow";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_STREAMER_ID: i64 = 152819213;
const DEFAULT_ANNOUNCE_PEER_ID: i64 = 2000000003;
const DEFAULT_CAROUSEL_PHOTO: &str = "-219009582_457239025";

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// A `.env` file exists but could not be read.
    EnvFile(String),
    /// A required variable is not set.
    Missing(&'static str),
    /// A variable is set to something unusable.
    Invalid { key: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnvFile(e) => write!(f, "failed to read .env file: {}", e),
            Self::Missing(key) => write!(f, "environment variable {} is required", key),
            Self::Invalid { key, reason } => write!(f, "invalid value for {}: {}", key, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

pub struct Config {
    /// VK community access token (`RACEVK_BOT`).
    pub vk_group_token: String,
    /// Telegram bot token (`RACETG_BOT`).
    pub telegram_bot_token: String,
    /// Base URL of the statistics API, without trailing slash.
    pub ergast_url: String,
    /// Time zone used when displaying session times.
    pub display_tz: Tz,
    /// Directory for the log file.
    pub log_dir: PathBuf,
    /// VK user allowed to announce streams.
    pub vk_streamer_id: i64,
    /// VK conversation that receives stream announcements.
    pub vk_announce_peer_id: i64,
    /// Photo attached to grand prix carousel cards.
    pub vk_carousel_photo: String,
}

impl Config {
    /// Load from `.env` (if present) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv()
            && !e.not_found()
        {
            return Err(ConfigError::EnvFile(e.to_string()));
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let vk_group_token = get("RACEVK_BOT").ok_or(ConfigError::Missing("RACEVK_BOT"))?;
        let telegram_bot_token = get("RACETG_BOT").ok_or(ConfigError::Missing("RACETG_BOT"))?;

        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Invalid {
                key: "RACETG_BOT",
                reason: "expected format 123456789:ABCdefGHI...".into(),
            });
        }

        let ergast_url = get("ERGAST_URL")
            .unwrap_or_else(|| DEFAULT_ERGAST_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let tz_name = get("DISPLAY_TZ").unwrap_or_else(|| DEFAULT_TZ.to_string());
        let display_tz: Tz = tz_name.parse().map_err(|_| ConfigError::Invalid {
            key: "DISPLAY_TZ",
            reason: format!("unknown time zone '{}'", tz_name),
        })?;

        let vk_streamer_id = parse_id(get("VK_STREAMER_ID"), "VK_STREAMER_ID", DEFAULT_STREAMER_ID)?;
        let vk_announce_peer_id =
            parse_id(get("VK_ANNOUNCE_PEER_ID"), "VK_ANNOUNCE_PEER_ID", DEFAULT_ANNOUNCE_PEER_ID)?;

        Ok(Self {
            vk_group_token,
            telegram_bot_token,
            ergast_url,
            display_tz,
            log_dir: get("LOG_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
            vk_streamer_id,
            vk_announce_peer_id,
            vk_carousel_photo: get("VK_CAROUSEL_PHOTO").unwrap_or_else(|| DEFAULT_CAROUSEL_PHOTO.to_string()),
        })
    }
}

fn parse_id(value: Option<String>, key: &'static str, default: i64) -> Result<i64, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            reason: format!("'{}' is not a numeric id", v),
        }),
    }
}
