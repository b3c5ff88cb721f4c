//! Deck Provider: a fixed card catalog and uniform draws without replacement

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

use crate::domain::Card;
use crate::errors::{DeckError, DrawError};

const MAJOR_ARCANA_JSON: &str = include_str!("../data/major_arcana.json");

/// Source of drawn cards for a reading
pub trait DeckProvider: Send + Sync {
    /// Full catalog, in catalog order
    fn catalog(&self) -> &[Card];

    /// `count` distinct cards in draw order
    fn draw(&self, count: usize) -> Result<Vec<Card>, DrawError>;
}

#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// Build a deck, rejecting empty catalogs and duplicate ids
    pub fn new(cards: Vec<Card>) -> Result<Self, DeckError> {
        if cards.is_empty() {
            return Err(DeckError::Empty);
        }

        let mut seen = HashSet::with_capacity(cards.len());
        for card in &cards {
            if !seen.insert(card.id.as_str()) {
                return Err(DeckError::DuplicateId(card.id.clone()));
            }
        }

        Ok(Self { cards })
    }

    /// The 22 Major Arcana bundled with the crate
    pub fn major_arcana() -> Result<Self, DeckError> {
        Self::from_json(MAJOR_ARCANA_JSON)
    }

    pub fn from_json(json: &str) -> Result<Self, DeckError> {
        let cards: Vec<Card> = serde_json::from_str(json)?;
        Self::new(cards)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DeckError> {
        let path = path.as_ref();
        debug!("Loading card catalog from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == id)
    }

    /// Shuffle the whole catalog with `rng`, then take the first `count`.
    pub fn draw_with<R: Rng + ?Sized>(
        &self,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<Card>, DrawError> {
        if count == 0 {
            return Err(DrawError::ZeroCount);
        }
        if count > self.cards.len() {
            return Err(DrawError::InsufficientCards {
                requested: count,
                available: self.cards.len(),
            });
        }

        let mut shuffled = self.cards.clone();
        shuffled.shuffle(rng);
        shuffled.truncate(count);

        debug!(
            count,
            drawn = ?shuffled.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            "Cards drawn"
        );
        Ok(shuffled)
    }
}

impl DeckProvider for Deck {
    fn catalog(&self) -> &[Card] {
        &self.cards
    }

    fn draw(&self, count: usize) -> Result<Vec<Card>, DrawError> {
        self.draw_with(count, &mut rand::thread_rng())
    }
}
