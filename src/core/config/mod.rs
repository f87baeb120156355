use std::path::PathBuf;

use crate::core::translate::LlmConfig;
use crate::core::window::DEFAULT_WINDOW_SECS;

pub const DEFAULT_FEED_URL: &str = "https://aws.amazon.com/about-aws/whats-new/recent/feed/";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://update-notifier.db?mode=rwc";
pub const DEFAULT_WEBHOOK_PATH: &str = "/update-notifier/discord/webhooks/";
pub const DEFAULT_BOT_NAME: &str = "aws-update-notification";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;

const ENV_PREFIX: &str = "UPDATE_NOTIFIER_";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a positive integer, got \"{value}\"")]
    InvalidNumber { key: String, value: String },
    #[error("{key} must be true or false, got \"{value}\"")]
    InvalidBool { key: String, value: String },
    #[error("unsupported log format \"{0}\" (expected pretty or json)")]
    InvalidLogFormat(String),
    #[error("translator settings are incomplete: missing {0}")]
    IncompleteTranslator(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub feed_url: String,
    pub database_url: String,
    pub webhook_path: String,
    pub parameters_file: Option<PathBuf>,
    pub channels_file: Option<PathBuf>,
    pub poll_interval_secs: u64,
    pub bot_name: String,
    pub source_language: String,
    pub target_language: String,
    pub translator: Option<LlmConfig>,
    pub log_format: LogFormat,
    pub run_once: bool,
}

impl AppConfig {
    /// Loads `.env.local` then `.env` (neither is required) and reads the
    /// process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut webhook_path = read("WEBHOOK_PATH").unwrap_or_else(|| DEFAULT_WEBHOOK_PATH.to_string());
        if !webhook_path.ends_with('/') {
            webhook_path.push('/');
        }

        let poll_interval_secs = match read("POLL_INTERVAL_SECS") {
            Some(value) => parse_positive("POLL_INTERVAL_SECS", &value)?,
            None => DEFAULT_WINDOW_SECS,
        };

        let log_format = match read("LOG_FORMAT").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(ConfigError::InvalidLogFormat(other.to_string())),
        };

        let run_once = match read("RUN_ONCE") {
            Some(value) => parse_bool("RUN_ONCE", &value)?,
            None => false,
        };

        Ok(Self {
            feed_url: read("FEED_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            database_url: read("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            webhook_path,
            parameters_file: read("PARAMETERS_FILE").map(PathBuf::from),
            channels_file: read("CHANNELS_FILE").map(PathBuf::from),
            poll_interval_secs,
            bot_name: read("BOT_NAME").unwrap_or_else(|| DEFAULT_BOT_NAME.to_string()),
            source_language: read("SOURCE_LANGUAGE").unwrap_or_else(|| "en".to_string()),
            target_language: read("TARGET_LANGUAGE").unwrap_or_else(|| "ja".to_string()),
            translator: read_translator(&read)?,
            log_format,
            run_once,
        })
    }
}

fn read_translator<R>(read: &R) -> Result<Option<LlmConfig>, ConfigError>
where
    R: Fn(&str) -> Option<String>,
{
    let base_url = read("LLM_BASE_URL");
    let api_key = read("LLM_API_KEY");
    let model = read("LLM_MODEL");

    let missing: Vec<&str> = [
        ("LLM_BASE_URL", base_url.is_none()),
        ("LLM_API_KEY", api_key.is_none()),
        ("LLM_MODEL", model.is_none()),
    ]
    .into_iter()
    .filter_map(|(name, absent)| absent.then_some(name))
    .collect();

    let (Some(base_url), Some(api_key), Some(model)) = (base_url, api_key, model) else {
        if missing.len() == 3 {
            return Ok(None);
        }
        let names: Vec<String> = missing
            .iter()
            .map(|name| format!("{ENV_PREFIX}{name}"))
            .collect();
        return Err(ConfigError::IncompleteTranslator(names.join(", ")));
    };

    let timeout_secs = match read("LLM_TIMEOUT_SECS") {
        Some(value) => parse_positive("LLM_TIMEOUT_SECS", &value)?,
        None => DEFAULT_LLM_TIMEOUT_SECS,
    };

    Ok(Some(LlmConfig {
        base_url,
        api_key,
        model,
        timeout_secs,
    }))
}

fn parse_positive(name: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .parse::<u64>()
        .ok()
        .filter(|parsed| *parsed > 0)
        .ok_or_else(|| ConfigError::InvalidNumber {
            key: format!("{ENV_PREFIX}{name}"),
            value: value.to_string(),
        })
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key: format!("{ENV_PREFIX}{name}"),
            value: value.to_string(),
        }),
    }
}
