use thiserror::Error;

use crate::domain::SpreadType;

/// Rejected reading input. Returned before any state is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Intention cannot be empty")]
    EmptyIntention,

    #[error("Intention is {length} characters, the limit is {max}")]
    IntentionTooLong { length: usize, max: usize },

    #[error("A {spread} spread needs {expected} cards, got {actual}")]
    CardCountMismatch {
        spread: SpreadType,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown spread type: {0}")]
    UnknownSpread(String),
}

/// The deck cannot satisfy a draw request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DrawError {
    #[error("Cannot draw zero cards")]
    ZeroCount,

    #[error("Requested {requested} cards but the deck only holds {available}")]
    InsufficientCards { requested: usize, available: usize },
}

/// Catalog loading failures
#[derive(Error, Debug)]
pub enum DeckError {
    #[error("Card catalog is empty")]
    Empty,

    #[error("Duplicate card id in catalog: {0}")]
    DuplicateId(String),

    #[error("Failed to parse card catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read card catalog: {0}")]
    Io(#[from] std::io::Error),
}
