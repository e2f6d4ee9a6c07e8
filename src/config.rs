use chrono_tz::Tz;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_MAX_AUDIO_FILE_SIZE: u64 = 5 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Immutable runtime settings. Built once in `main` and handed to handlers by reference.
#[derive(Debug, Clone)]
pub struct Config {
    /// Zone whose local midnight rolls the daily and weekly rotation seeds.
    pub timezone: Tz,
    pub max_audio_file_size: u64,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Europe::Moscow,
            max_audio_file_size: DEFAULT_MAX_AUDIO_FILE_SIZE,
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    timezone: Option<String>,
    max_audio_file_size: Option<u64>,
    #[serde(default)]
    logging: RawLogging,
}

#[derive(Debug, Default, Deserialize)]
struct RawLogging {
    level: Option<String>,
    format: Option<String>,
}

impl Config {
    /// `$FOCUSD_CONFIG` (TOML) first, then `FOCUSD_*` env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let raw = match std::env::var_os("FOCUSD_CONFIG") {
            Some(p) => read_raw(Path::new(&p))?,
            None => RawConfig::default(),
        };
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self::from_parts(
            raw,
            env("FOCUSD_TIMEZONE"),
            env("FOCUSD_LOG_LEVEL"),
            env("FOCUSD_LOG_FORMAT"),
        )
    }

    #[cfg(test)]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(s).map_err(ConfigError::Parse)?;
        Self::from_parts(raw, None, None, None)
    }

    fn from_parts(
        raw: RawConfig,
        timezone_override: Option<String>,
        level_override: Option<String>,
        format_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let timezone = match timezone_override.or(raw.timezone) {
            Some(name) => parse_timezone(&name)?,
            None => defaults.timezone,
        };
        let format = format_override
            .or(raw.logging.format)
            .unwrap_or(defaults.logging.format);
        if format != "pretty" && format != "json" {
            return Err(ConfigError::InvalidValue {
                field: "logging.format",
                reason: format!("expected pretty or json, got {format}"),
            });
        }
        Ok(Self {
            timezone,
            max_audio_file_size: raw
                .max_audio_file_size
                .unwrap_or(defaults.max_audio_file_size),
            logging: LoggingConfig {
                level: level_override
                    .or(raw.logging.level)
                    .unwrap_or(defaults.logging.level),
                format,
            },
        })
    }
}

fn read_raw(path: &Path) -> Result<RawConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
    toml::from_str(&text).map_err(ConfigError::Parse)
}

pub fn parse_timezone(name: &str) -> Result<Tz, ConfigError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| ConfigError::InvalidValue {
            field: "timezone",
            reason: e.to_string(),
        })
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

impl LoggingConfig {
    /// stdout carries the IPC protocol, so logs always go to stderr.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        match self.format.as_str() {
            "json" => {
                fmt()
                    .json()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
            _ => {
                fmt()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
        }
    }
}
