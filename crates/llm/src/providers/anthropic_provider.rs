use crate::prompts::{self, Prompt};
use crate::{parse_stage_json, transport_error};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use codex_core::{
    AnalyzeRequest, AnalyzeResponse, GenerationClient, OracleRequest, OracleResponse,
    RemoteGenerationError, Stage, SynthesizeRequest, SynthesizeResponse,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Runs the three stages against the Anthropic Messages API directly.
///
/// Prompts are composed locally; the model is asked for a JSON object in the
/// stage's response shape.
#[derive(Debug, Clone)]
pub struct AnthropicGenerationClient {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    #[serde(default)]
    message: String,
}

/// `Anthropic API error: <status> - <detail>`, detail taken from the error
/// body's `error.message` or else the raw body
fn api_error_message(status: u16, body: &str) -> String {
    let detail = serde_json::from_str::<AnthropicErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| body.to_string());
    let detail = detail.trim();

    if detail.is_empty() {
        format!("Anthropic API error: {status}")
    } else {
        format!("Anthropic API error: {status} - {detail}")
    }
}

impl AnthropicGenerationClient {
    pub fn new(
        api_key: String,
        model: String,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(anyhow!("Anthropic API key cannot be empty"));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            api_key,
            model,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete<T: DeserializeOwned>(
        &self,
        stage: Stage,
        prompt: Prompt,
    ) -> Result<T, RemoteGenerationError> {
        let start_time = Instant::now();
        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: prompt.max_tokens,
            system: &prompt.system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: &prompt.user,
            }],
        };

        info!(stage = %stage, model = %self.model, "Sending request to Anthropic");

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(stage, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(stage = %stage, status = status.as_u16(), "Anthropic API error: {}", error_text);
            return Err(RemoteGenerationError::Status {
                stage,
                status: status.as_u16(),
                message: api_error_message(status.as_u16(), &error_text),
            });
        }

        let body: AnthropicResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                RemoteGenerationError::Timeout { stage }
            } else {
                RemoteGenerationError::Decode {
                    stage,
                    message: e.to_string(),
                }
            }
        })?;

        let text = body
            .content
            .first()
            .filter(|block| block.content_type == "text")
            .and_then(|block| block.text.as_deref())
            .ok_or_else(|| RemoteGenerationError::Decode {
                stage,
                message: "Unexpected response format from Anthropic".to_string(),
            })?;

        if let Some(usage) = &body.usage {
            debug!(
                stage = %stage,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "Anthropic token usage"
            );
        }
        info!(stage = %stage, elapsed = ?start_time.elapsed(), "Received response from Anthropic");

        parse_stage_json(stage, text)
    }
}

#[async_trait]
impl GenerationClient for AnthropicGenerationClient {
    async fn analyze(
        &self,
        request: &AnalyzeRequest,
    ) -> Result<AnalyzeResponse, RemoteGenerationError> {
        let response: AnalyzeResponse = self
            .complete(Stage::Analyze, prompts::analyze_prompt(request))
            .await?;
        response.validated(request)
    }

    async fn synthesize(
        &self,
        request: &SynthesizeRequest,
    ) -> Result<SynthesizeResponse, RemoteGenerationError> {
        let response: SynthesizeResponse = self
            .complete(Stage::Synthesize, prompts::synthesize_prompt(request))
            .await?;
        response.validated()
    }

    async fn oracle(
        &self,
        request: &OracleRequest,
    ) -> Result<OracleResponse, RemoteGenerationError> {
        let response: OracleResponse = self
            .complete(Stage::Oracle, prompts::oracle_prompt(request))
            .await?;
        response.validated()
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicContentBlock>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_message_keeps_detail() {
        let body = r#"{"type": "error", "error": {"type": "invalid_request_error", "message": "max_tokens too large"}}"#;
        assert_eq!(
            api_error_message(400, body),
            "Anthropic API error: 400 - max_tokens too large"
        );
        assert_eq!(
            api_error_message(502, "Bad Gateway\n"),
            "Anthropic API error: 502 - Bad Gateway"
        );
        assert_eq!(api_error_message(500, ""), "Anthropic API error: 500");
    }

    #[test]
    fn test_rejects_empty_api_key() {
        let result = AnthropicGenerationClient::new(
            String::new(),
            "claude-sonnet-4-20250514".to_string(),
            "https://api.anthropic.com",
            Duration::from_secs(30),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_trims_trailing_slash() {
        let client = AnthropicGenerationClient::new(
            "sk-test".to_string(),
            "claude-sonnet-4-20250514".to_string(),
            "http://localhost:1234/",
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:1234");
        assert_eq!(client.model(), "claude-sonnet-4-20250514");
    }

    #[test]
    fn test_request_shape() {
        let request = AnthropicRequest {
            model: "m",
            max_tokens: 800,
            system: "persona",
            messages: vec![AnthropicMessage {
                role: "user",
                content: "hello",
            }],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["system"], "persona");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["max_tokens"], 800);
    }
}
