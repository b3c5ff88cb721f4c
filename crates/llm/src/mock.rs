use async_trait::async_trait;
use codex_core::{
    AnalyzeRequest, AnalyzeResponse, CardAnalysis, GenerationClient, OracleRequest,
    OracleResponse, RemoteGenerationError, SynthesizeRequest, SynthesizeResponse,
};
use rand::seq::SliceRandom;
use std::time::Duration;
use tracing::debug;

const ANALYSES: [&str; 5] = [
    "This card sits at the heart of the question. It marks a season of change in which a familiar habit loosens its grip, and asks what you keep carrying out of loyalty rather than need.",
    "Here the card shows what moves beneath the surface. It speaks of timing: nothing is gained by forcing the hour, yet waiting too long becomes its own decision.",
    "In this place the card turns toward the people around you. Notice who reflects you back to yourself, and which of those reflections you have been avoiding.",
    "The card names a question of authority. Where have you handed your judgement to someone else, and what would it cost to take it back quietly?",
    "This position opens the wider view. Past the practical worry lies an invitation to let the situation teach you something about how you meet uncertainty.",
];

const OPENINGS: [&str; 3] = [
    "You have come with a real question, and the cards have answered with a clear shape.",
    "Your question has drawn a spread that holds both difficulty and opening.",
    "The cards meet your question plainly today. Let us read what they set out.",
];

const SYNTHESIS: &str = "Read together, these cards describe a crossing point. What has shaped you so far is meeting what has not yet taken form, and the spread does not choose between them for you.

The strongest thread runs between acting and receiving. One card pushes forward while another asks you to stop and absorb what has happened. The skill being asked of you is telling those moments apart.

Ask yourself which hopes and which fears are colouring how you see the choice. The cards show the ground outside you and the weather you bring to it.";

const ORACLE: &str = "You are standing on a threshold. One door is closing behind you and the next has not yet opened, and the stillness between them feels like doubt.

It is not empty. It is full of what has not been decided. You are not asked to end the uncertainty, only to learn to walk inside it without hurry.

Trust the way you are unfolding. The answer is already moving toward you, and it will arrive as a step rather than a certainty.

The road shows itself to the one who walks it.";

/// Offline Generation Client with canned texts and short delays
#[derive(Debug, Clone)]
pub struct MockGenerationClient {
    analyze_delay: Duration,
    synthesize_delay: Duration,
    oracle_delay: Duration,
}

impl Default for MockGenerationClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGenerationClient {
    pub fn new() -> Self {
        Self {
            analyze_delay: Duration::from_millis(200),
            synthesize_delay: Duration::from_millis(150),
            oracle_delay: Duration::from_millis(100),
        }
    }

    /// No artificial latency
    pub fn instant() -> Self {
        Self {
            analyze_delay: Duration::ZERO,
            synthesize_delay: Duration::ZERO,
            oracle_delay: Duration::ZERO,
        }
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl GenerationClient for MockGenerationClient {
    async fn analyze(
        &self,
        request: &AnalyzeRequest,
    ) -> Result<AnalyzeResponse, RemoteGenerationError> {
        debug!(cards = request.cards.len(), "Mock card analyses");
        pause(self.analyze_delay).await;

        let cards = request
            .cards
            .iter()
            .enumerate()
            .map(|(index, positioned)| CardAnalysis {
                position: positioned.position.clone(),
                card: positioned.card.name.clone(),
                analysis: ANALYSES[index % ANALYSES.len()].to_string(),
                image: positioned.card.image.clone(),
            })
            .collect();

        let opening = OPENINGS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(OPENINGS[0])
            .to_string();

        AnalyzeResponse { opening, cards }.validated(request)
    }

    async fn synthesize(
        &self,
        request: &SynthesizeRequest,
    ) -> Result<SynthesizeResponse, RemoteGenerationError> {
        debug!(analyses = request.card_analyses.len(), "Mock synthesis");
        pause(self.synthesize_delay).await;
        Ok(SynthesizeResponse {
            synthesis: SYNTHESIS.to_string(),
        })
    }

    async fn oracle(
        &self,
        request: &OracleRequest,
    ) -> Result<OracleResponse, RemoteGenerationError> {
        debug!(cards = request.cards.len(), "Mock oracle");
        pause(self.oracle_delay).await;
        Ok(OracleResponse {
            oracle: ORACLE.to_string(),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codex_core::{Deck, DeckProvider, SpreadType};

    #[tokio::test]
    async fn test_mock_answers_every_position() {
        let deck = Deck::major_arcana().unwrap();
        let cards: Vec<_> = deck.catalog()[..5].to_vec();
        let request = AnalyzeRequest {
            intention: "Where am I heading?".to_string(),
            spread_type: SpreadType::Five,
            cards: SpreadType::Five.position_cards(&cards).unwrap(),
        };

        let response = MockGenerationClient::instant().analyze(&request).await.unwrap();
        assert_eq!(response.cards.len(), 5);
        assert_eq!(response.cards[1].position, "Obstacle or Blockage");
        assert_eq!(response.cards[0].card, cards[0].name);
        assert_eq!(response.cards[0].image, cards[0].image);
        assert!(OPENINGS.contains(&response.opening.as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_delays_are_virtual() {
        let client = MockGenerationClient::new();
        let request = OracleRequest {
            intention: "q".to_string(),
            cards: vec![],
            synthesis: None,
        };
        let response = client.oracle(&request).await.unwrap();
        assert!(response.oracle.ends_with("walks it."));
    }
}
