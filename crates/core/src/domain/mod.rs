//! Domain models for a tarot reading

mod card;
mod spread;

pub use card::*;
pub use spread::*;

use crate::errors::InputError;
use crate::*;
use std::fmt;

/// Maximum length of an intention, in characters
pub const MAX_INTENTION_CHARS: usize = 500;

/// Lifecycle of the live reading.
///
/// `Drawing` belongs to the deck, the pipeline itself starts at `Analyzing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingStatus {
    #[default]
    Idle,
    Drawing,
    Analyzing,
    Synthesizing,
    Oracle,
    Complete,
    Error,
}

impl ReadingStatus {
    pub fn is_in_progress(self) -> bool {
        matches!(
            self,
            ReadingStatus::Drawing
                | ReadingStatus::Analyzing
                | ReadingStatus::Synthesizing
                | ReadingStatus::Oracle
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ReadingStatus::Complete | ReadingStatus::Error)
    }

    /// Transitions allowed inside one generation.
    ///
    /// Moving back to `Analyzing` is the whole-pipeline retry; `Idle` is
    /// always reachable through reset.
    pub fn can_transition_to(self, next: ReadingStatus) -> bool {
        use ReadingStatus::*;

        if next == Idle {
            return true;
        }

        match self {
            Idle => matches!(next, Drawing | Analyzing),
            Drawing => matches!(next, Analyzing | Error),
            Analyzing => matches!(next, Analyzing | Synthesizing | Oracle | Error),
            Synthesizing => matches!(next, Analyzing | Oracle | Error),
            Oracle => matches!(next, Analyzing | Complete | Error),
            Complete | Error => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReadingStatus::Idle => "idle",
            ReadingStatus::Drawing => "drawing",
            ReadingStatus::Analyzing => "analyzing",
            ReadingStatus::Synthesizing => "synthesizing",
            ReadingStatus::Oracle => "oracle",
            ReadingStatus::Complete => "complete",
            ReadingStatus::Error => "error",
        }
    }
}

impl fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The querent's question, trimmed and bounded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Intention(String);

impl Intention {
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InputError::EmptyIntention);
        }

        let chars = trimmed.chars().count();
        if chars > MAX_INTENTION_CHARS {
            return Err(InputError::IntentionTooLong {
                length: chars,
                max: MAX_INTENTION_CHARS,
            });
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Intention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A finished reading, suitable for history or export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedReading {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub intention: String,
    pub spread_type: SpreadType,
    pub opening: String,
    pub cards: Vec<CardAnalysis>,
    /// Always `None` for single-card readings
    pub synthesis: Option<String>,
    pub oracle: String,
}
