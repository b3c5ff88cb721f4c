//! Shared ambient concerns: structured logging and environment configuration

pub mod config;
pub mod structured_logging;

pub use config::{
    BackendKind, BackendSettings, BackoffKind, CodexConfig, ConfigError, RetrySettings,
    UsageLimits, DEFAULT_ANTHROPIC_BASE_URL, DEFAULT_ANTHROPIC_MODEL,
};
pub use structured_logging::{
    init_structured_logging, JsonFormatter, LoggingConfig, OperationTimer, StructuredLogEntry,
};
