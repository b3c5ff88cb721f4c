//! Progressive reading pipeline
//!
//! - [`ReadingStore`]: the live reading, observable through a `watch` channel
//! - [`ReadingOrchestrator`]: analyze → synthesize → oracle against a
//!   [`codex_core::GenerationClient`]
//! - [`run_with_retry`]: whole-pipeline retry with a pluggable backoff

pub mod reading;
pub mod reliability;
pub mod store;

pub use reading::{ReadingError, ReadingOrchestrator, GENERIC_FAILURE};
pub use reliability::{run_with_retry, BackoffStrategy, RetryPolicy, Retryable};
pub use store::{GenerationToken, ReadingState, ReadingStore, StoreError};
