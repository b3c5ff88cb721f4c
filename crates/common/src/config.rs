//! Environment-driven configuration
//!
//! Everything is read from `CODEX_*` variables (plus the Anthropic ones for
//! the direct backend). A `.env` file in the working directory is loaded
//! first when present.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::structured_logging::LoggingConfig;

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Which Generation Client adapter to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// The hosted `reading` edge function
    #[default]
    Edge,
    /// Call the Anthropic Messages API directly
    Anthropic,
    /// Canned responses, no network
    Mock,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "edge" | "http" => Ok(BackendKind::Edge),
            "anthropic" => Ok(BackendKind::Anthropic),
            "mock" => Ok(BackendKind::Mock),
            other => Err(format!("expected edge, anthropic or mock, got {other}")),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Edge => "edge",
            BackendKind::Anthropic => "anthropic",
            BackendKind::Mock => "mock",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub kind: BackendKind,
    pub reading_url: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub anthropic_base_url: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            reading_url: None,
            api_key: None,
            request_timeout: Duration::from_secs(60),
            anthropic_api_key: None,
            anthropic_model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            anthropic_base_url: DEFAULT_ANTHROPIC_BASE_URL.to_string(),
        }
    }
}

/// How the wait between pipeline attempts grows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackoffKind {
    /// The same delay before every retry
    #[default]
    Fixed,
    /// Delay grows by the base delay on each retry
    Linear,
    /// Delay doubles on each retry, with jitter
    Exponential,
}

impl FromStr for BackoffKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(BackoffKind::Fixed),
            "linear" => Ok(BackoffKind::Linear),
            "exponential" | "exp" => Ok(BackoffKind::Exponential),
            other => Err(format!("expected fixed, linear or exponential, got {other}")),
        }
    }
}

/// Whole-pipeline retry settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_retries: u32,
    /// Base delay; the first retry always waits this long
    pub delay: Duration,
    pub backoff: BackoffKind,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delay: Duration::from_secs(1),
            backoff: BackoffKind::Fixed,
        }
    }
}

/// Monthly spread allowances, `None` is unlimited
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageLimits {
    pub three_card: Option<u32>,
    pub five_card: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct CodexConfig {
    pub backend: BackendSettings,
    pub retry: RetrySettings,
    pub deck_path: Option<PathBuf>,
    pub limits: UsageLimits,
    pub logging: LoggingConfig,
}

impl CodexConfig {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let backend = BackendSettings {
            kind: parse_or(&get, "CODEX_BACKEND", defaults.backend.kind)?,
            reading_url: get("CODEX_READING_URL"),
            api_key: get("CODEX_API_KEY"),
            request_timeout: parse_or(&get, "CODEX_REQUEST_TIMEOUT_SECS", 60u64)
                .map(Duration::from_secs)?,
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            anthropic_model: get("ANTHROPIC_MODEL").unwrap_or(defaults.backend.anthropic_model),
            anthropic_base_url: get("ANTHROPIC_BASE_URL")
                .unwrap_or(defaults.backend.anthropic_base_url),
        };

        let retry = RetrySettings {
            max_retries: parse_or(&get, "CODEX_MAX_RETRIES", defaults.retry.max_retries)?,
            delay: parse_or(&get, "CODEX_RETRY_DELAY_MS", 1000u64).map(Duration::from_millis)?,
            backoff: parse_or(&get, "CODEX_RETRY_BACKOFF", defaults.retry.backoff)?,
        };

        let limits = UsageLimits {
            three_card: parse_opt(&get, "CODEX_LIMIT_THREE")?,
            five_card: parse_opt(&get, "CODEX_LIMIT_FIVE")?,
        };

        let logging = LoggingConfig {
            level: parse_or(&get, "CODEX_LOG_LEVEL", defaults.logging.level)?,
            json_output: parse_or(&get, "CODEX_LOG_JSON", false)?,
            ..defaults.logging
        };

        Ok(Self {
            backend,
            retry,
            deck_path: get("CODEX_DECK_PATH").map(PathBuf::from),
            limits,
            logging,
        })
    }
}

fn parse_opt<G, T>(get: &G, key: &str) -> Result<Option<T>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match get(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                key: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}

fn parse_or<G, T>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    Ok(parse_opt(get, key)?.unwrap_or(default))
}
