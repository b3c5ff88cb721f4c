//! Reading Orchestrator
//!
//! Runs analyze, then synthesize (multi-card spreads only), then oracle,
//! publishing each result to the [`ReadingStore`] as it lands. A failure in
//! any stage restarts the whole sequence from analyze, within the retry
//! budget.

use codex_core::{
    AnalyzeRequest, Card, CompletedReading, DeckProvider, DrawError, GenerationClient, InputError,
    Intention, OracleRequest, OracleResponse, ReadingStatus, RemoteGenerationError, SpreadType,
    Stage, SynthesizeRequest, SynthesizeResponse,
};
use common::OperationTimer;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::reliability::{run_with_retry, RetryPolicy, Retryable};
use crate::store::{GenerationToken, ReadingState, ReadingStore, StoreError};

/// Shown when the failure carries no message of its own
pub const GENERIC_FAILURE: &str = "Reading failed. The server may be temporarily unavailable.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReadingError {
    #[error("Invalid intention: {0}")]
    InvalidIntention(InputError),

    #[error(transparent)]
    CardCountMismatch(InputError),

    #[error("Could not draw cards: {0}")]
    Draw(#[from] DrawError),

    /// A reset or a newer reading took over the store
    #[error("Reading was superseded by a newer request or a reset")]
    Superseded,

    /// Terminal failure after the retry budget was spent
    #[error("{message}")]
    Failed { message: String },

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ReadingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Stale { .. } => ReadingError::Superseded,
            other => ReadingError::Store(other),
        }
    }
}

/// Failure of one pipeline attempt
#[derive(Error, Debug)]
enum AttemptError {
    #[error(transparent)]
    Remote(#[from] RemoteGenerationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Retryable for AttemptError {
    fn is_retryable(&self) -> bool {
        matches!(self, AttemptError::Remote(_))
    }
}

/// Sequences the generation stages against one store
#[derive(Clone)]
pub struct ReadingOrchestrator {
    client: Arc<dyn GenerationClient>,
    store: Arc<ReadingStore>,
    policy: RetryPolicy,
}

impl ReadingOrchestrator {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self::with_policy(client, RetryPolicy::default())
    }

    pub fn with_policy(client: Arc<dyn GenerationClient>, policy: RetryPolicy) -> Self {
        Self::with_store(client, Arc::new(ReadingStore::new()), policy)
    }

    pub fn with_store(
        client: Arc<dyn GenerationClient>,
        store: Arc<ReadingStore>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            client,
            store,
            policy,
        }
    }

    pub fn store(&self) -> &Arc<ReadingStore> {
        &self.store
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn subscribe(&self) -> watch::Receiver<ReadingState> {
        self.store.subscribe()
    }

    pub fn snapshot(&self) -> ReadingState {
        self.store.snapshot()
    }

    /// Clear the store and cut off any reading still in flight
    pub fn reset(&self) {
        self.store.reset();
    }

    /// Generate a reading for cards already drawn.
    ///
    /// Input is validated before the store is touched. The caller must not
    /// run two readings against the same store at once; the older one ends
    /// with [`ReadingError::Superseded`].
    pub async fn generate_reading(
        &self,
        intention: &str,
        spread: SpreadType,
        cards: Vec<Card>,
    ) -> Result<CompletedReading, ReadingError> {
        let intention = Intention::parse(intention).map_err(ReadingError::InvalidIntention)?;
        spread
            .position_cards(&cards)
            .map_err(ReadingError::CardCountMismatch)?;

        let token = self.store.begin(intention.as_str(), spread, cards.clone());
        self.run(token, &intention, spread, cards).await
    }

    /// Draw from `deck`, then generate. A draw failure is terminal.
    pub async fn draw_and_generate(
        &self,
        deck: &dyn DeckProvider,
        intention: &str,
        spread: SpreadType,
    ) -> Result<CompletedReading, ReadingError> {
        let intention = Intention::parse(intention).map_err(ReadingError::InvalidIntention)?;
        let token = self.store.begin_draw(intention.as_str(), spread);

        let cards = match deck.draw(spread.card_count()) {
            Ok(cards) => cards,
            Err(e) => {
                error!(spread = %spread, error = %e, "Draw failed");
                self.store.fail(token, e.to_string())?;
                return Err(ReadingError::Draw(e));
            }
        };

        self.store.set_cards(token, cards.clone())?;
        self.run(token, &intention, spread, cards).await
    }

    async fn run(
        &self,
        token: GenerationToken,
        intention: &Intention,
        spread: SpreadType,
        cards: Vec<Card>,
    ) -> Result<CompletedReading, ReadingError> {
        let request = AnalyzeRequest {
            intention: intention.to_string(),
            spread_type: spread,
            cards: spread
                .position_cards(&cards)
                .map_err(ReadingError::CardCountMismatch)?,
        };

        let result = run_with_retry(
            &self.policy,
            self.store.retry_count(),
            || self.attempt(token, &request, &cards),
            |retry, err: &AttemptError| {
                warn!(
                    generation = token.value(),
                    retry,
                    max_retries = self.policy.max_retries,
                    error = %err,
                    "Reading attempt failed, restarting from analyze"
                );
                self.store
                    .increment_retry(token)
                    .map(|_| ())
                    .map_err(AttemptError::from)
            },
        )
        .await;

        match result {
            Ok(reading) => {
                info!(generation = token.value(), reading_id = %reading.id, "Reading complete");
                Ok(reading)
            }
            Err(AttemptError::Remote(e)) => {
                let message = e.user_message().unwrap_or_else(|| GENERIC_FAILURE.to_string());
                error!(
                    generation = token.value(),
                    stage = %e.stage(),
                    error = %e,
                    "Reading failed"
                );
                self.store.fail(token, message.clone())?;
                Err(ReadingError::Failed { message })
            }
            Err(AttemptError::Store(e)) => {
                info!(generation = token.value(), reason = %e, "Reading abandoned");
                Err(e.into())
            }
        }
    }

    /// One pass through the stages, always starting at analyze
    async fn attempt(
        &self,
        token: GenerationToken,
        request: &AnalyzeRequest,
        cards: &[Card],
    ) -> Result<CompletedReading, AttemptError> {
        self.store.begin_attempt(token)?;

        let analysis = self
            .timed(Stage::Analyze, self.client.analyze(request))
            .await
            .and_then(|response| response.validated(request))?;
        let card_analyses = analysis.cards.clone();
        let next = self
            .store
            .set_analysis(token, analysis.opening, analysis.cards)?;

        let synthesis = if next == ReadingStatus::Synthesizing {
            let request = SynthesizeRequest {
                intention: request.intention.clone(),
                card_analyses,
            };
            let synthesis = self
                .timed(Stage::Synthesize, self.client.synthesize(&request))
                .await
                .and_then(SynthesizeResponse::validated)?
                .synthesis;
            self.store.set_synthesis(token, synthesis.clone())?;
            Some(synthesis)
        } else {
            None
        };

        let request = OracleRequest {
            intention: request.intention.clone(),
            cards: cards.to_vec(),
            synthesis,
        };
        let oracle = self
            .timed(Stage::Oracle, self.client.oracle(&request))
            .await
            .and_then(OracleResponse::validated)?
            .oracle;

        Ok(self.store.complete(token, oracle)?)
    }

    async fn timed<T>(
        &self,
        stage: Stage,
        call: impl Future<Output = Result<T, RemoteGenerationError>>,
    ) -> Result<T, RemoteGenerationError> {
        info!(stage = %stage, client = self.client.name(), "Stage started");
        let mut timer = OperationTimer::new(format!("reading.{stage}"));
        timer.add_field("client", self.client.name());

        let result = call.await;
        timer.finish_with_result(&result);
        result
    }
}
