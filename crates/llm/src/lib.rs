//! Generation Client adapters
//!
//! Every adapter implements [`codex_core::GenerationClient`]:
//! - [`HttpGenerationClient`]: the hosted `reading` endpoint, one action per call
//! - [`AnthropicGenerationClient`]: composes prompts locally and calls the Messages API
//! - [`MockGenerationClient`]: canned texts for offline development

mod factory;
mod http_client;
mod mock;
pub mod prompts;
pub mod providers;

pub use factory::build_generation_client;
pub use http_client::HttpGenerationClient;
pub use mock::MockGenerationClient;
#[cfg(feature = "anthropic")]
pub use providers::AnthropicGenerationClient;

use codex_core::{RemoteGenerationError, Stage};
use serde::de::DeserializeOwned;

/// Map a reqwest failure to the stage it interrupted
pub(crate) fn transport_error(stage: Stage, err: reqwest::Error) -> RemoteGenerationError {
    if err.is_timeout() {
        RemoteGenerationError::Timeout { stage }
    } else {
        RemoteGenerationError::Transport {
            stage,
            message: err.to_string(),
        }
    }
}

/// Parse a stage payload, tolerating a Markdown code fence around it
pub(crate) fn parse_stage_json<T: DeserializeOwned>(
    stage: Stage,
    text: &str,
) -> Result<T, RemoteGenerationError> {
    serde_json::from_str(strip_code_fence(text)).map_err(|e| RemoteGenerationError::Decode {
        stage,
        message: e.to_string(),
    })
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the optional language tag on the opening fence
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
