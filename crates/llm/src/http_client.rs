use anyhow::{anyhow, Result};
use async_trait::async_trait;
use codex_core::{
    AnalyzeRequest, AnalyzeResponse, ErrorEnvelope, GenerationClient, GenerationRequest,
    OracleRequest, OracleResponse, RemoteGenerationError, SynthesizeRequest, SynthesizeResponse,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::{parse_stage_json, transport_error};

/// Client for the hosted `reading` endpoint.
///
/// All three stages go to the same URL; the body's `action` field selects
/// the operation. A non-success status carries `{ "error": "..." }`.
#[derive(Debug, Clone)]
pub struct HttpGenerationClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpGenerationClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(anyhow!("Reading endpoint URL cannot be empty"));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn invoke<T: DeserializeOwned>(
        &self,
        request: GenerationRequest<'_>,
    ) -> Result<T, RemoteGenerationError> {
        let stage = request.stage();
        info!(stage = %stage, endpoint = %self.endpoint, "Sending generation request");
        if let Ok(body) = serde_json::to_string(&request) {
            debug!(stage = %stage, body = %body, "Request body");
        }

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key).header("apikey", key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(stage, e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(stage, e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error)
                .unwrap_or_else(|_| format!("Backend returned status {}", status.as_u16()));
            error!(stage = %stage, status = status.as_u16(), "Generation backend error: {}", message);
            return Err(RemoteGenerationError::Status {
                stage,
                status: status.as_u16(),
                message,
            });
        }

        debug!(stage = %stage, bytes = body.len(), "Generation response received");
        parse_stage_json(stage, &body)
    }
}

#[async_trait]
impl GenerationClient for HttpGenerationClient {
    async fn analyze(
        &self,
        request: &AnalyzeRequest,
    ) -> Result<AnalyzeResponse, RemoteGenerationError> {
        let response: AnalyzeResponse = self.invoke(GenerationRequest::Analyze(request)).await?;
        response.validated(request)
    }

    async fn synthesize(
        &self,
        request: &SynthesizeRequest,
    ) -> Result<SynthesizeResponse, RemoteGenerationError> {
        let response: SynthesizeResponse =
            self.invoke(GenerationRequest::Synthesize(request)).await?;
        response.validated()
    }

    async fn oracle(
        &self,
        request: &OracleRequest,
    ) -> Result<OracleResponse, RemoteGenerationError> {
        let response: OracleResponse = self.invoke(GenerationRequest::Oracle(request)).await?;
        response.validated()
    }

    fn name(&self) -> &str {
        "edge"
    }
}
