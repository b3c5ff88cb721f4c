use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Card, PositionedCard};
use crate::errors::InputError;

/// Layout of a reading: how many cards and which positions they occupy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpreadType {
    #[default]
    Single,
    Three,
    Five,
}

const SINGLE_POSITIONS: &[&str] = &["The Card"];
const THREE_POSITIONS: &[&str] = &["Past", "Present", "Future"];
const FIVE_POSITIONS: &[&str] = &[
    "Situation",
    "Obstacle or Blockage",
    "Past",
    "Future",
    "Potential",
];

impl SpreadType {
    pub const ALL: [SpreadType; 3] = [SpreadType::Single, SpreadType::Three, SpreadType::Five];

    pub fn card_count(self) -> usize {
        self.positions().len()
    }

    pub fn positions(self) -> &'static [&'static str] {
        match self {
            SpreadType::Single => SINGLE_POSITIONS,
            SpreadType::Three => THREE_POSITIONS,
            SpreadType::Five => FIVE_POSITIONS,
        }
    }

    /// Whether the synthesize stage runs for this spread
    pub fn has_synthesis(self) -> bool {
        self.card_count() > 1
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SpreadType::Single => "single",
            SpreadType::Three => "three",
            SpreadType::Five => "five",
        }
    }

    /// Key used by the usage service (`one_card`, `three_card`, `five_card`)
    pub fn usage_key(self) -> &'static str {
        match self {
            SpreadType::Single => "one_card",
            SpreadType::Three => "three_card",
            SpreadType::Five => "five_card",
        }
    }

    /// Bind drawn cards to this spread's positions, preserving draw order.
    pub fn position_cards(self, cards: &[Card]) -> Result<Vec<PositionedCard>, InputError> {
        if cards.len() != self.card_count() {
            return Err(InputError::CardCountMismatch {
                spread: self,
                expected: self.card_count(),
                actual: cards.len(),
            });
        }

        Ok(self
            .positions()
            .iter()
            .zip(cards)
            .map(|(position, card)| PositionedCard {
                position: position.to_string(),
                card: card.clone(),
            })
            .collect())
    }
}

impl fmt::Display for SpreadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpreadType {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" | "one" | "1" => Ok(SpreadType::Single),
            "three" | "3" => Ok(SpreadType::Three),
            "five" | "5" => Ok(SpreadType::Five),
            other => Err(InputError::UnknownSpread(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ArcanaType;
    use rstest::rstest;

    fn cards(n: usize) -> Vec<Card> {
        (0..n)
            .map(|i| Card::new(format!("c{i}"), format!("Card {i}"), ArcanaType::Major))
            .collect()
    }

    #[rstest]
    #[case(SpreadType::Single, 1, false)]
    #[case(SpreadType::Three, 3, true)]
    #[case(SpreadType::Five, 5, true)]
    fn test_spread_shape(#[case] spread: SpreadType, #[case] count: usize, #[case] synth: bool) {
        assert_eq!(spread.card_count(), count);
        assert_eq!(spread.has_synthesis(), synth);
    }

    #[test]
    fn test_position_cards_keeps_draw_order() {
        let drawn = cards(5);
        let positioned = SpreadType::Five.position_cards(&drawn).unwrap();

        assert_eq!(positioned[1].position, "Obstacle or Blockage");
        for (p, c) in positioned.iter().zip(&drawn) {
            assert_eq!(&p.card, c);
        }
    }

    #[test]
    fn test_position_cards_rejects_wrong_count() {
        let err = SpreadType::Three.position_cards(&cards(2)).unwrap_err();
        assert!(matches!(
            err,
            InputError::CardCountMismatch { expected: 3, actual: 2, .. }
        ));
    }

    #[test]
    fn test_parse_and_wire_names() {
        assert_eq!("Three".parse::<SpreadType>().unwrap(), SpreadType::Three);
        assert_eq!("1".parse::<SpreadType>().unwrap(), SpreadType::Single);
        assert!("seven".parse::<SpreadType>().is_err());
        assert_eq!(serde_json::to_string(&SpreadType::Five).unwrap(), "\"five\"");
        assert_eq!(SpreadType::Five.usage_key(), "five_card");
    }
}
