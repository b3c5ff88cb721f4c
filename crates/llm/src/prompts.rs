//! Prompt composition for the direct backend
//!
//! A fixed persona is shared by every stage; each stage adds its own task
//! description and asks for a strict JSON answer.

use codex_core::{AnalyzeRequest, OracleRequest, SpreadType, SynthesizeRequest};
use std::fmt::Write;

pub const PERSONA: &str = "You are the Reader of the Codex Tarot, an interpreter of the Tarot de Marseille in the symbolic tradition.

VOICE:
- British English
- Warm and direct, offering neither false comfort nor doom
- Hold light and shadow together for every card
- Poetic but concrete, never vague

CONSTRAINTS:
- Use only the card data you are given
- Do not invent symbolism that is absent from the source
- Avoid stock phrases about the universe or fate
- Never answer yes or no; illuminate instead of prescribing

KNOWLEDGE:
- Cards colour each other through position and proximity
- Numbers describe a development (1 potential, 9 crisis, 10 completion)
- Suits carry elements: Swords air, Cups water, Wands fire, Pentacles earth
- Major Arcana are universal forces, Minor Arcana are personal experience";

/// System prompt, user message and token budget for one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
}

fn analysis_words(spread: SpreadType) -> u32 {
    match spread {
        SpreadType::Single => 150,
        SpreadType::Three => 80,
        SpreadType::Five => 60,
    }
}

fn oracle_words(card_count: usize) -> u32 {
    match card_count {
        1 => 120,
        3 => 180,
        _ => 200,
    }
}

pub fn analyze_prompt(request: &AnalyzeRequest) -> Prompt {
    let words = analysis_words(request.spread_type);
    let system = format!(
        "{PERSONA}

TASK: Interpret each card in its position. Stay with what the card means in that place; the cards are woven together later.

Write about {words} words per card, covering the essence and one shadow note.
Let suit and element patterns inform the reading without naming them."
    );

    let mut cards = String::new();
    for positioned in &request.cards {
        let card = &positioned.card;
        let _ = writeln!(cards, "---");
        let _ = writeln!(cards, "POSITION: {}", positioned.position);
        let _ = writeln!(cards, "CARD: {}", card.name);
        let _ = writeln!(cards, "Keywords: {}", card.keywords.join(", "));
        let _ = writeln!(cards, "Description: {}", card.description);
        let _ = writeln!(cards, "Reading: {}", card.reading);
        if let Some(degree) = &card.degree {
            let _ = writeln!(cards, "Degree meaning: {}", degree.meaning);
            let _ = writeln!(cards, "Degree shadow: {}", degree.shadow);
        }
        if let Some(suit) = &card.suit {
            let _ = writeln!(cards, "Suit: {}", suit);
        }
    }
    cards.push_str("---");

    let user = format!(
        "QUERENT'S QUESTION: \"{}\"

SPREAD: {}

{cards}

Return JSON only, without markdown:
{{
  \"opening\": \"one or two sentences warmly restating the question\",
  \"cards\": [
    {{\"position\": \"...\", \"card\": \"...\", \"analysis\": \"...\"}}
  ]
}}",
        request.intention, request.spread_type
    );

    Prompt {
        system,
        user,
        max_tokens: 2000,
    }
}

pub fn synthesize_prompt(request: &SynthesizeRequest) -> Prompt {
    let length = if request.card_analyses.len() >= 5 { 400 } else { 300 };
    let system = format!(
        "{PERSONA}

TASK: Show how the cards speak to each other. This is where the interpretation happens.

INCLUDE:
- The movement across the positions
- Numerical patterns when present
- How each card's energy shifts its neighbours
- What this means for the querent's own question
- Clear symbolic handoffs from one card to the next

Close with a reflective question only when the reading holds real tension.

LENGTH: about {length} words."
    );

    let analyses = request
        .card_analyses
        .iter()
        .map(|a| format!("{} / {}:\n\"{}\"", a.position, a.card, a.analysis))
        .collect::<Vec<_>>()
        .join("\n\n");

    let user = format!(
        "QUERENT'S QUESTION: \"{}\"

CARD ANALYSES:

{analyses}

Return JSON only, without markdown:
{{
  \"synthesis\": \"...\"
}}",
        request.intention
    );

    Prompt {
        system,
        user,
        max_tokens: 1500,
    }
}

pub fn oracle_prompt(request: &OracleRequest) -> Prompt {
    let words = oracle_words(request.cards.len());
    let system = format!(
        "{PERSONA}

TASK: Speak as the Tarot itself. The drawn cards have become one voice addressing the querent.

VOICE:
- Rhythmic and incantatory
- Built from the imagery of these specific cards
- Speak to the querent as \"you\"
- Do not repeat the synthesis; go deeper or turn to a new angle
- End on something that lingers

LENGTH: about {words} words."
    );

    let voices = request
        .cards
        .iter()
        .map(|card| format!("{} speaks:\n\"{}\"", card.name, card.monologue))
        .collect::<Vec<_>>()
        .join("\n\n");

    let conclusion = request
        .synthesis
        .as_deref()
        .map(|s| format!("THE READING CONCLUDED WITH:\n\"{s}\"\n\n"))
        .unwrap_or_default();

    let user = format!(
        "QUERENT'S QUESTION: \"{}\"

THE CARDS' VOICES:

{voices}

{conclusion}Return JSON only, without markdown:
{{
  \"oracle\": \"...\"
}}",
        request.intention
    );

    Prompt {
        system,
        user,
        max_tokens: 800,
    }
}
