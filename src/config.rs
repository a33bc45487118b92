//! Environment-backed configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Debug)]
pub struct Config {
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub db_url: String,
    pub db_path: String,
    pub logs_path: PathBuf,
    pub discord_token: String,
    pub twitch_client_id: String,
    pub twitch_client_secret: String,
}

impl Config {
    /// Creates a config holding defaults. Secrets are empty until [`Config::load`].
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            db_url: "sqlite://data/tatl.db".to_string(),
            db_path: "data/tatl.db".to_string(),
            logs_path: PathBuf::from("logs"),
            discord_token: String::new(),
            twitch_client_id: String::new(),
            twitch_client_secret: String::new(),
        }
    }

    /// Reads configuration from the process environment.
    pub fn load(&mut self) -> Result<(), AppError> {
        self.discord_token = required("BOT_TOKEN")?;
        self.twitch_client_id = required("TWITCH_CLIENT_ID")?;
        self.twitch_client_secret = required("TWITCH_CLIENT_SECRET")?;

        if let Some(secs) = optional_secs("POLL_INTERVAL")? {
            self.poll_interval = secs;
        }
        if let Some(secs) = optional_secs("REQUEST_TIMEOUT")? {
            self.request_timeout = secs;
        }
        if let Some(db_url) = optional("DB_URL") {
            self.db_url = db_url;
        }
        if let Some(db_path) = optional("DB_PATH") {
            self.db_path = db_path;
        }
        if let Some(logs_path) = optional("LOGS_PATH") {
            self.logs_path = PathBuf::from(logs_path);
        }
        Ok(())
    }
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(key: &str) -> Result<String, AppError> {
    optional(key).ok_or_else(|| AppError::MissingConfig {
        key: key.to_string(),
    })
}

fn optional_secs(key: &str) -> Result<Option<Duration>, AppError> {
    let Some(raw) = optional(key) else {
        return Ok(None);
    };
    let secs = raw.parse::<u64>().map_err(|e| AppError::InvalidConfig {
        key: key.to_string(),
        reason: format!("`{raw}` is not a number of seconds ({e})"),
    })?;
    if secs == 0 {
        return Err(AppError::InvalidConfig {
            key: key.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Some(Duration::from_secs(secs)))
}
