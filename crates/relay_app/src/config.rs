//! Process configuration from the environment.
//!
//! A `.env` file in the working directory is loaded first when present.

use std::path::PathBuf;

use relay_engine::{ControlSettings, Credentials, EngineSettings, PortalSettings};

const DEFAULT_PORTAL_URL: &str = "https://www.ivasms.com";
const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";
const DEFAULT_STATE_FILE: &str = "sms_statistics.json";
const DEFAULT_LOG_FILE: &str = "bot.log";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),
    #[error("environment variable {name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub credentials: Credentials,
    pub bot_token: String,
    pub chat_id: String,
    pub portal_url: String,
    pub telegram_api: String,
    pub state_file: PathBuf,
    pub log_file: PathBuf,
    pub replay_backlog: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let replay_backlog = match get("REPLAY_BACKLOG") {
            None => false,
            Some(value) => parse_flag(&value).ok_or(ConfigError::Invalid {
                name: "REPLAY_BACKLOG",
                value,
            })?,
        };

        Ok(Self {
            credentials: Credentials {
                email: required("IVASMS_EMAIL")?,
                password: required("IVASMS_PASSWORD")?,
            },
            bot_token: required("BOT_TOKEN")?,
            chat_id: required("CHAT_ID")?,
            portal_url: get("PORTAL_BASE_URL").unwrap_or_else(|| DEFAULT_PORTAL_URL.to_string()),
            telegram_api: get("TELEGRAM_API_URL")
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API.to_string()),
            state_file: get("STATE_FILE")
                .unwrap_or_else(|| DEFAULT_STATE_FILE.to_string())
                .into(),
            log_file: get("LOG_FILE")
                .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string())
                .into(),
            replay_backlog,
        })
    }

    pub fn engine_settings(&self) -> EngineSettings {
        let mut settings = EngineSettings::new(self.credentials.clone(), self.state_file.clone());
        settings.portal = PortalSettings {
            base_url: self.portal_url.clone(),
            ..PortalSettings::default()
        };
        settings.replay_backlog = self.replay_backlog;
        settings.control = Some(ControlSettings::new(
            self.telegram_api.clone(),
            self.bot_token.clone(),
        ));
        settings
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
