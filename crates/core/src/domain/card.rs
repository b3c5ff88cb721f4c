use serde::{Deserialize, Serialize};

/// Taxonomy of a card inside the deck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArcanaType {
    Major,
    Minor,
    Court,
}

/// Numerological degree attached to minor cards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degree {
    pub meaning: String,
    pub shadow: String,
}

/// Immutable reference data for a single tarot card.
///
/// Field names follow the catalog JSON (`arcanaType`, `arcanaNumber`, ...).
/// Only `id`, `name` and `arcanaType` are mandatory, the free-text fields
/// default to empty so partial catalogs still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub name: String,
    pub arcana_type: ArcanaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arcana_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suit: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub interpretations: String,
    #[serde(default)]
    pub reading: String,
    /// First-person voice used by the oracle stage
    #[serde(default)]
    pub monologue: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree: Option<Degree>,
}

impl Card {
    /// Minimal card, mostly useful for fixtures
    pub fn new(id: impl Into<String>, name: impl Into<String>, arcana_type: ArcanaType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arcana_type,
            arcana_number: None,
            number: None,
            suit: None,
            keywords: Vec::new(),
            description: String::new(),
            interpretations: String::new(),
            reading: String::new(),
            monologue: String::new(),
            image: String::new(),
            degree: None,
        }
    }

    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords = keywords.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn with_monologue(mut self, monologue: impl Into<String>) -> Self {
        self.monologue = monologue.into();
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }
}

/// A card bound to the position it occupies in a spread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionedCard {
    pub position: String,
    pub card: Card,
}

/// Per-position result of the analyze stage.
///
/// `card` is the display name, `image` is copied from the drawn card so the
/// presentation layer does not need a catalog lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardAnalysis {
    pub position: String,
    pub card: String,
    pub analysis: String,
    #[serde(default)]
    pub image: String,
}
