use crate::{HttpGenerationClient, MockGenerationClient};
use anyhow::{anyhow, Result};
use codex_core::GenerationClient;
use common::{BackendKind, BackendSettings};
use std::sync::Arc;
use tracing::info;

/// Build the Generation Client selected by configuration
pub fn build_generation_client(settings: &BackendSettings) -> Result<Arc<dyn GenerationClient>> {
    let client: Arc<dyn GenerationClient> = match settings.kind {
        BackendKind::Edge => {
            let endpoint = settings
                .reading_url
                .as_ref()
                .ok_or_else(|| anyhow!("CODEX_READING_URL is required for the edge backend"))?;

            Arc::new(HttpGenerationClient::new(
                endpoint.clone(),
                settings.api_key.clone(),
                settings.request_timeout,
            )?)
        }
        #[cfg(feature = "anthropic")]
        BackendKind::Anthropic => {
            let api_key = settings
                .anthropic_api_key
                .as_ref()
                .ok_or_else(|| anyhow!("ANTHROPIC_API_KEY is required for the anthropic backend"))?;

            Arc::new(crate::AnthropicGenerationClient::new(
                api_key.clone(),
                settings.anthropic_model.clone(),
                settings.anthropic_base_url.clone(),
                settings.request_timeout,
            )?)
        }
        #[cfg(not(feature = "anthropic"))]
        BackendKind::Anthropic => {
            return Err(anyhow!("Built without the `anthropic` feature"));
        }
        BackendKind::Mock => Arc::new(MockGenerationClient::new()),
    };

    info!(backend = %settings.kind, client = client.name(), "Generation client ready");
    Ok(client)
}
