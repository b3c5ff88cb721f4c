//! Generation Client port and its wire shapes
//!
//! The three stages are multiplexed over one endpoint through an `action`
//! field. Adapters live in the `llm` crate; the orchestrator only sees the
//! [`GenerationClient`] trait.

use crate::*;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// One of the three sequential remote operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Analyze,
    Synthesize,
    Oracle,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Analyze => "analyze",
            Stage::Synthesize => "synthesize",
            Stage::Oracle => "oracle",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub intention: String,
    pub spread_type: SpreadType,
    pub cards: Vec<PositionedCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizeRequest {
    pub intention: String,
    pub card_analyses: Vec<CardAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleRequest {
    pub intention: String,
    pub cards: Vec<Card>,
    /// `null` on the wire for single-card readings
    pub synthesis: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub opening: String,
    pub cards: Vec<CardAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizeResponse {
    pub synthesis: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleResponse {
    pub oracle: String,
}

/// Request envelope: `{ "action": "...", ...fields }`
#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum GenerationRequest<'a> {
    Analyze(&'a AnalyzeRequest),
    Synthesize(&'a SynthesizeRequest),
    Oracle(&'a OracleRequest),
}

impl GenerationRequest<'_> {
    pub fn stage(&self) -> Stage {
        match self {
            GenerationRequest::Analyze(_) => Stage::Analyze,
            GenerationRequest::Synthesize(_) => Stage::Synthesize,
            GenerationRequest::Oracle(_) => Stage::Oracle,
        }
    }
}

/// Failure envelope returned with a non-success status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
}

/// Any failure of a generation stage.
///
/// The client never retries; every variant is recoverable by the
/// orchestrator's whole-pipeline retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteGenerationError {
    #[error("Network error during {stage}: {message}")]
    Transport { stage: Stage, message: String },

    #[error("The {stage} request timed out")]
    Timeout { stage: Stage },

    #[error("{message}")]
    Status {
        stage: Stage,
        status: u16,
        message: String,
    },

    #[error("Malformed {stage} response: {message}")]
    Decode { stage: Stage, message: String },

    /// The backend answered with valid JSON that breaks a reading invariant
    #[error("Invalid {stage} response: {message}")]
    InvalidShape { stage: Stage, message: String },
}

impl RemoteGenerationError {
    pub fn stage(&self) -> Stage {
        match self {
            RemoteGenerationError::Transport { stage, .. }
            | RemoteGenerationError::Timeout { stage }
            | RemoteGenerationError::Status { stage, .. }
            | RemoteGenerationError::Decode { stage, .. }
            | RemoteGenerationError::InvalidShape { stage, .. } => *stage,
        }
    }

    /// Message fit for the user, `None` when the failure carries nothing useful
    pub fn user_message(&self) -> Option<String> {
        match self {
            RemoteGenerationError::Status { message, .. } if message.trim().is_empty() => None,
            other => Some(other.to_string()),
        }
    }

    pub fn invalid_shape(stage: Stage, message: impl Into<String>) -> Self {
        RemoteGenerationError::InvalidShape {
            stage,
            message: message.into(),
        }
    }
}

fn require_text(stage: Stage, field: &str, value: &str) -> Result<(), RemoteGenerationError> {
    if value.trim().is_empty() {
        return Err(RemoteGenerationError::invalid_shape(
            stage,
            format!("`{field}` is empty"),
        ));
    }
    Ok(())
}

impl AnalyzeResponse {
    /// Check the response against the request it answers.
    ///
    /// The analysis count must match the request. Entries are taken in
    /// request order: position labels are forced to the requested ones and
    /// the card image is copied from the drawn card.
    pub fn validated(mut self, request: &AnalyzeRequest) -> Result<Self, RemoteGenerationError> {
        let stage = Stage::Analyze;
        require_text(stage, "opening", &self.opening)?;

        if self.cards.len() != request.cards.len() {
            return Err(RemoteGenerationError::invalid_shape(
                stage,
                format!(
                    "expected {} card analyses, got {}",
                    request.cards.len(),
                    self.cards.len()
                ),
            ));
        }

        for (analysis, positioned) in self.cards.iter_mut().zip(&request.cards) {
            require_text(stage, "analysis", &analysis.analysis)?;

            if analysis.position != positioned.position {
                warn!(
                    expected = %positioned.position,
                    received = %analysis.position,
                    "Backend relabelled a position, keeping request order"
                );
                analysis.position = positioned.position.clone();
            }
            if analysis.card.trim().is_empty() {
                analysis.card = positioned.card.name.clone();
            }
            analysis.image = positioned.card.image.clone();
        }

        Ok(self)
    }
}

impl SynthesizeResponse {
    pub fn validated(self) -> Result<Self, RemoteGenerationError> {
        require_text(Stage::Synthesize, "synthesis", &self.synthesis)?;
        Ok(self)
    }
}

impl OracleResponse {
    pub fn validated(self) -> Result<Self, RemoteGenerationError> {
        require_text(Stage::Oracle, "oracle", &self.oracle)?;
        Ok(self)
    }
}

/// Port to the remote text-generation backend.
///
/// Each call is one round trip. Implementations must not retry.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn analyze(
        &self,
        request: &AnalyzeRequest,
    ) -> Result<AnalyzeResponse, RemoteGenerationError>;

    /// Only called for spreads with more than one card
    async fn synthesize(
        &self,
        request: &SynthesizeRequest,
    ) -> Result<SynthesizeResponse, RemoteGenerationError>;

    async fn oracle(&self, request: &OracleRequest)
        -> Result<OracleResponse, RemoteGenerationError>;

    /// Name used in logs
    fn name(&self) -> &str {
        "generation"
    }
}
