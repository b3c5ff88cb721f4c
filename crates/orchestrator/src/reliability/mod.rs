//! Retry support for the reading pipeline

pub mod retry_policy;

pub use retry_policy::{run_with_retry, BackoffStrategy, RetryPolicy, Retryable};
