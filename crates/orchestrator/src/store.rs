//! Reading Store
//!
//! Holds the one live reading. Writes go through the orchestrator and carry
//! the [`GenerationToken`] handed out by `begin`; observers get snapshots
//! through a `watch` channel and never touch the state directly.

use codex_core::{
    Card, CardAnalysis, CompletedReading, ReadingStatus, SpreadType, Utc, Uuid,
};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};

/// Identifies one `begin` call. Stale tokens cannot write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenerationToken(u64);

impl GenerationToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Write from generation {token} rejected, current generation is {current}")]
    Stale { token: u64, current: u64 },

    #[error("Cannot move from {from} to {to}")]
    InvalidTransition {
        from: ReadingStatus,
        to: ReadingStatus,
    },
}

/// Snapshot of the live reading
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadingState {
    /// Bumped by every `begin` and by `reset`
    pub generation: u64,
    pub intention: String,
    pub spread_type: SpreadType,
    pub selected_cards: Vec<Card>,
    pub status: ReadingStatus,
    pub retry_count: u32,
    pub opening: Option<String>,
    pub card_analyses: Option<Vec<CardAnalysis>>,
    /// Never set for single-card readings
    pub synthesis: Option<String>,
    pub oracle: Option<String>,
    pub error: Option<String>,
}

impl ReadingState {
    fn initial(generation: u64) -> Self {
        Self {
            generation,
            ..Self::default()
        }
    }

    /// Everything except the generation counter is at its initial value
    pub fn is_initial(&self) -> bool {
        *self == Self::initial(self.generation)
    }

    /// The finished record, only once the status is `complete`
    pub fn completed_reading(&self) -> Option<CompletedReading> {
        if self.status != ReadingStatus::Complete {
            return None;
        }

        Some(CompletedReading {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            intention: self.intention.clone(),
            spread_type: self.spread_type,
            opening: self.opening.clone()?,
            cards: self.card_analyses.clone()?,
            synthesis: self.synthesis.clone(),
            oracle: self.oracle.clone()?,
        })
    }

    fn transition(&mut self, next: ReadingStatus) -> Result<(), StoreError> {
        if !self.status.can_transition_to(next) {
            return Err(StoreError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    fn check_transition(&self, next: ReadingStatus) -> Result<(), StoreError> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(StoreError::InvalidTransition {
                from: self.status,
                to: next,
            })
        }
    }

    fn clear_results(&mut self) {
        self.opening = None;
        self.card_analyses = None;
        self.synthesis = None;
        self.oracle = None;
        self.error = None;
    }
}

#[derive(Debug)]
pub struct ReadingStore {
    tx: watch::Sender<ReadingState>,
}

impl Default for ReadingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadingStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ReadingState::default());
        Self { tx }
    }

    /// Receiver that sees every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<ReadingState> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> ReadingState {
        self.tx.borrow().clone()
    }

    pub fn status(&self) -> ReadingStatus {
        self.tx.borrow().status
    }

    pub fn retry_count(&self) -> u32 {
        self.tx.borrow().retry_count
    }

    /// Start a new generation whose cards are still to be drawn
    pub fn begin_draw(&self, intention: &str, spread_type: SpreadType) -> GenerationToken {
        self.start(intention, spread_type, Vec::new(), ReadingStatus::Drawing)
    }

    /// Start a new generation at `analyzing`.
    ///
    /// Any in-flight writer holding an older token is cut off. The retry
    /// counter is carried over; only `reset` and completion clear it.
    pub fn begin(
        &self,
        intention: &str,
        spread_type: SpreadType,
        cards: Vec<Card>,
    ) -> GenerationToken {
        self.start(intention, spread_type, cards, ReadingStatus::Analyzing)
    }

    fn start(
        &self,
        intention: &str,
        spread_type: SpreadType,
        cards: Vec<Card>,
        status: ReadingStatus,
    ) -> GenerationToken {
        let mut token = GenerationToken(0);
        self.tx.send_modify(|state| {
            let generation = state.generation + 1;
            *state = ReadingState {
                generation,
                intention: intention.to_string(),
                spread_type,
                selected_cards: cards,
                status,
                retry_count: state.retry_count,
                ..ReadingState::default()
            };
            token = GenerationToken(generation);
        });
        info!(generation = token.0, spread = %spread_type, status = %status, "Reading started");
        token
    }

    /// Apply `f` if `token` is current. Nothing is published on error.
    fn write<T>(
        &self,
        token: GenerationToken,
        f: impl FnOnce(&mut ReadingState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut outcome = None;
        self.tx.send_if_modified(|state| {
            if state.generation != token.0 {
                outcome = Some(Err(StoreError::Stale {
                    token: token.0,
                    current: state.generation,
                }));
                return false;
            }
            let result = f(state);
            let modified = result.is_ok();
            outcome = Some(result);
            modified
        });

        let result = outcome.unwrap_or(Err(StoreError::Stale {
            token: token.0,
            current: token.0,
        }));
        if let Err(e) = &result {
            debug!(generation = token.0, error = %e, "Store write rejected");
        }
        result
    }

    /// Record the drawn cards and move from `drawing` to `analyzing`
    pub fn set_cards(&self, token: GenerationToken, cards: Vec<Card>) -> Result<(), StoreError> {
        self.write(token, |state| {
            state.transition(ReadingStatus::Analyzing)?;
            state.selected_cards = cards;
            Ok(())
        })
    }

    /// Start a pipeline attempt: back to `analyzing` with no stage results
    pub fn begin_attempt(&self, token: GenerationToken) -> Result<(), StoreError> {
        self.write(token, |state| {
            state.transition(ReadingStatus::Analyzing)?;
            state.clear_results();
            Ok(())
        })
    }

    /// Store the opening and analyses, then move to `synthesizing`, or
    /// straight to `oracle` for a single card.
    pub fn set_analysis(
        &self,
        token: GenerationToken,
        opening: String,
        analyses: Vec<CardAnalysis>,
    ) -> Result<ReadingStatus, StoreError> {
        self.write(token, |state| {
            if state.status != ReadingStatus::Analyzing {
                return Err(StoreError::InvalidTransition {
                    from: state.status,
                    to: ReadingStatus::Analyzing,
                });
            }
            let next = if state.spread_type.has_synthesis() {
                ReadingStatus::Synthesizing
            } else {
                ReadingStatus::Oracle
            };
            state.transition(next)?;
            state.opening = Some(opening);
            state.card_analyses = Some(analyses);
            Ok(next)
        })
    }

    pub fn set_synthesis(&self, token: GenerationToken, synthesis: String) -> Result<(), StoreError> {
        self.write(token, |state| {
            if state.status != ReadingStatus::Synthesizing {
                return Err(StoreError::InvalidTransition {
                    from: state.status,
                    to: ReadingStatus::Oracle,
                });
            }
            state.transition(ReadingStatus::Oracle)?;
            state.synthesis = Some(synthesis);
            Ok(())
        })
    }

    /// Store the oracle, mark the reading complete and clear the retry counter
    pub fn complete(
        &self,
        token: GenerationToken,
        oracle: String,
    ) -> Result<CompletedReading, StoreError> {
        self.write(token, |state| {
            state.check_transition(ReadingStatus::Complete)?;

            let mut finished = state.clone();
            finished.status = ReadingStatus::Complete;
            finished.oracle = Some(oracle);
            finished.retry_count = 0;
            let reading = finished
                .completed_reading()
                .ok_or(StoreError::InvalidTransition {
                    from: state.status,
                    to: ReadingStatus::Complete,
                })?;

            *state = finished;
            Ok(reading)
        })
    }

    pub fn increment_retry(&self, token: GenerationToken) -> Result<u32, StoreError> {
        self.write(token, |state| {
            state.retry_count += 1;
            Ok(state.retry_count)
        })
    }

    /// Terminal failure with a user-facing message
    pub fn fail(&self, token: GenerationToken, message: impl Into<String>) -> Result<(), StoreError> {
        let message = message.into();
        self.write(token, |state| {
            state.transition(ReadingStatus::Error)?;
            state.error = Some(message);
            Ok(())
        })
    }

    /// Back to idle with everything cleared. Idempotent: resetting an
    /// already initial store publishes nothing and keeps the generation.
    pub fn reset(&self) {
        let reset = self.tx.send_if_modified(|state| {
            if state.is_initial() {
                return false;
            }
            *state = ReadingState::initial(state.generation + 1);
            true
        });

        if reset {
            info!("Reading reset");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codex_core::ArcanaType;

    fn cards(n: usize) -> Vec<Card> {
        (0..n)
            .map(|i| Card::new(format!("c{i}"), format!("Card {i}"), ArcanaType::Major))
            .collect()
    }

    fn analyses(spread: SpreadType) -> Vec<CardAnalysis> {
        spread
            .positions()
            .iter()
            .map(|position| CardAnalysis {
                position: position.to_string(),
                card: "Card".to_string(),
                analysis: "Text".to_string(),
                image: String::new(),
            })
            .collect()
    }

    #[test]
    fn test_three_card_lifecycle() {
        let store = ReadingStore::new();
        let token = store.begin("Will I find clarity?", SpreadType::Three, cards(3));
        assert_eq!(store.status(), ReadingStatus::Analyzing);

        let next = store
            .set_analysis(token, "Opening".to_string(), analyses(SpreadType::Three))
            .unwrap();
        assert_eq!(next, ReadingStatus::Synthesizing);

        store.set_synthesis(token, "Synthesis".to_string()).unwrap();
        assert_eq!(store.status(), ReadingStatus::Oracle);

        let reading = store.complete(token, "Oracle".to_string()).unwrap();
        assert_eq!(reading.cards.len(), 3);
        assert_eq!(reading.synthesis.as_deref(), Some("Synthesis"));

        let state = store.snapshot();
        assert_eq!(state.status, ReadingStatus::Complete);
        assert_eq!(state.oracle.as_deref(), Some("Oracle"));
        assert!(state.error.is_none());
        assert!(state.completed_reading().is_some());
    }

    #[test]
    fn test_single_card_goes_straight_to_oracle() {
        let store = ReadingStore::new();
        let token = store.begin("q", SpreadType::Single, cards(1));

        let next = store
            .set_analysis(token, "Opening".to_string(), analyses(SpreadType::Single))
            .unwrap();
        assert_eq!(next, ReadingStatus::Oracle);

        let err = store.set_synthesis(token, "nope".to_string()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
        assert!(store.snapshot().synthesis.is_none());
    }

    #[test]
    fn test_stale_token_cannot_write() {
        let store = ReadingStore::new();
        let old = store.begin("first", SpreadType::Single, cards(1));
        let new = store.begin("second", SpreadType::Single, cards(1));

        let err = store
            .set_analysis(old, "late".to_string(), analyses(SpreadType::Single))
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::Stale {
                token: old.value(),
                current: new.value()
            }
        );
        assert_eq!(store.snapshot().intention, "second");
        assert!(store.snapshot().opening.is_none());
    }

    #[test]
    fn test_reset_cuts_off_in_flight_writer() {
        let store = ReadingStore::new();
        let token = store.begin("q", SpreadType::Three, cards(3));
        store.reset();

        assert!(store.fail(token, "late failure").is_err());
        let state = store.snapshot();
        assert_eq!(state.status, ReadingStatus::Idle);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_reset_is_idempotent() {
        let store = ReadingStore::new();
        let token = store.begin("q", SpreadType::Three, cards(3));
        store.increment_retry(token).unwrap();
        store.fail(token, "boom").unwrap();

        store.reset();
        let first = store.snapshot();
        assert_eq!(first.status, ReadingStatus::Idle);
        assert_eq!(first.retry_count, 0);
        assert!(first.card_analyses.is_none());
        assert!(first.error.is_none());
        assert!(first.is_initial());

        let mut rx = store.subscribe();
        store.reset();
        assert_eq!(store.snapshot(), first);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_begin_attempt_clears_partial_results() {
        let store = ReadingStore::new();
        let token = store.begin("q", SpreadType::Three, cards(3));
        store
            .set_analysis(token, "Opening".to_string(), analyses(SpreadType::Three))
            .unwrap();

        store.begin_attempt(token).unwrap();
        let state = store.snapshot();
        assert_eq!(state.status, ReadingStatus::Analyzing);
        assert!(state.opening.is_none());
        assert!(state.card_analyses.is_none());
    }

    #[test]
    fn test_retry_counter_survives_begin_and_clears_on_complete() {
        let store = ReadingStore::new();
        let token = store.begin("q", SpreadType::Single, cards(1));
        assert_eq!(store.increment_retry(token).unwrap(), 1);

        let token = store.begin("q", SpreadType::Single, cards(1));
        assert_eq!(store.retry_count(), 1);

        store
            .set_analysis(token, "Opening".to_string(), analyses(SpreadType::Single))
            .unwrap();
        store.complete(token, "Oracle".to_string()).unwrap();
        assert_eq!(store.retry_count(), 0);
    }

    #[test]
    fn test_terminal_states_only_leave_through_reset() {
        let store = ReadingStore::new();
        let token = store.begin("q", SpreadType::Single, cards(1));
        store.fail(token, "boom").unwrap();

        assert!(matches!(
            store.begin_attempt(token),
            Err(StoreError::InvalidTransition { .. })
        ));
        assert_eq!(store.snapshot().error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_draw_then_cards() {
        let store = ReadingStore::new();
        let token = store.begin_draw("q", SpreadType::Three);
        assert_eq!(store.status(), ReadingStatus::Drawing);

        store.set_cards(token, cards(3)).unwrap();
        let state = store.snapshot();
        assert_eq!(state.status, ReadingStatus::Analyzing);
        assert_eq!(state.selected_cards.len(), 3);
    }

    #[tokio::test]
    async fn test_subscribers_see_updates() {
        let store = ReadingStore::new();
        let mut rx = store.subscribe();

        let token = store.begin("q", SpreadType::Single, cards(1));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().status, ReadingStatus::Analyzing);

        store
            .set_analysis(token, "Opening".to_string(), analyses(SpreadType::Single))
            .unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().opening.as_deref(), Some("Opening"));
    }
}
