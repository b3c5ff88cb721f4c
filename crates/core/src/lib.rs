//! Core domain models and contracts for Codex Tarot
//!
//! This crate holds everything the reading pipeline shares:
//! - Card, SpreadType, PositionedCard, CardAnalysis, ReadingStatus
//! - The Deck Provider (uniform draws without replacement)
//! - The Usage Gate consulted before a reading starts
//! - The GenerationClient port and its wire request/response shapes

pub mod contracts;
pub mod deck;
pub mod domain;
pub mod errors;
pub mod usage;

pub use contracts::*;
pub use deck::*;
pub use domain::*;
pub use errors::*;
pub use usage::*;

/// Re-export common types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use uuid::Uuid;
