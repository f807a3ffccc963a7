//! # Round Log
//!
//! The `RoundLog` is the root container for saved rounds. Logs serialize to
//! `.trn` files as human-readable JSON (see [`file_io`](crate::file_io)).
//!
//! ## Structure
//!
//! ```text
//! RoundLog
//! ├── meta: LogMetadata (format, timestamps)
//! └── rounds: HashMap<Uuid, Round> (all designed rounds)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use blast_core::config::DesignConfig;
//! use blast_core::explosives::LoadingScheme;
//! use blast_core::geometry::{BurdenModel, RockClass, Section};
//! use blast_core::round::{compute_round, RoundInput, RoundMetadata};
//! use blast_core::round_log::RoundLog;
//!
//! let input = RoundInput {
//!     section: Section::new(4.5, 4.8, 3.2),
//!     burden_model: BurdenModel::RockAdjusted,
//!     rock_class: RockClass::Medium,
//!     diameter_mm: 45.0,
//!     burden_m: None,
//!     spacing_m: None,
//!     metadata: RoundMetadata::new("CT-7", "El Teniente"),
//! };
//! let round = compute_round(&input, &LoadingScheme::default(), DesignConfig::reference()).unwrap();
//!
//! let mut log = RoundLog::new();
//! let id = log.add_round(round);
//! assert!(log.get_round(&id).is_some());
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{DesignError, DesignResult};
use crate::round::Round;

/// Layout revision of .trn files written by this build
pub const LOG_FORMAT: u32 = 1;

/// Root container of saved rounds.
///
/// Rounds are stored in a flat UUID-keyed map; listing order comes from the
/// creation timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundLog {
    /// Log metadata (format, timestamps)
    pub meta: LogMetadata,

    /// All saved rounds, keyed by round id
    pub rounds: HashMap<Uuid, Round>,
}

impl RoundLog {
    /// Create a new empty log.
    pub fn new() -> Self {
        let now = Utc::now();
        RoundLog {
            meta: LogMetadata {
                format: LOG_FORMAT,
                created: now,
                modified: now,
            },
            rounds: HashMap::new(),
        }
    }

    /// Add a round under its own id.
    ///
    /// Returns the round id.
    pub fn add_round(&mut self, round: Round) -> Uuid {
        let id = round.id;
        self.rounds.insert(id, round);
        self.touch();
        id
    }

    /// Replace a saved round by id (edit and re-save).
    ///
    /// The replacement takes over the original id and creation time; its
    /// modified time is set to now.
    pub fn replace_round(&mut self, id: &Uuid, mut round: Round) -> DesignResult<()> {
        let existing = self
            .rounds
            .get(id)
            .ok_or_else(|| DesignError::RoundNotFound { id: id.to_string() })?;
        round.id = *id;
        round.created = existing.created;
        round.modified = Utc::now();
        self.rounds.insert(*id, round);
        self.touch();
        Ok(())
    }

    /// Remove a round by id.
    ///
    /// Returns the removed round if it existed.
    pub fn remove_round(&mut self, id: &Uuid) -> Option<Round> {
        let round = self.rounds.remove(id);
        if round.is_some() {
            self.touch();
        }
        round
    }

    /// Get a round by id.
    pub fn get_round(&self, id: &Uuid) -> Option<&Round> {
        self.rounds.get(id)
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.meta.modified = Utc::now();
    }

    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    /// All rounds, oldest first.
    pub fn rounds_chronological(&self) -> Vec<&Round> {
        let mut rounds: Vec<&Round> = self.rounds.values().collect();
        rounds.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
        rounds
    }

    /// Most recently created round
    pub fn latest(&self) -> Option<&Round> {
        self.rounds_chronological().last().copied()
    }

    /// Rounds matching a site (exact) and a contract (case-insensitive
    /// substring), oldest first. `None` or empty filters match everything.
    pub fn filter(&self, site: Option<&str>, contract: Option<&str>) -> Vec<&Round> {
        let site = site.map(str::trim).filter(|s| !s.is_empty());
        let contract = contract
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty());

        self.rounds_chronological()
            .into_iter()
            .filter(|r| site.map_or(true, |s| r.metadata.site == s))
            .filter(|r| {
                contract
                    .as_deref()
                    .map_or(true, |c| r.metadata.contract.to_lowercase().contains(c))
            })
            .collect()
    }
}

impl Default for RoundLog {
    fn default() -> Self {
        RoundLog::new()
    }
}

/// Log metadata stored in the file header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogMetadata {
    /// File layout revision; files newer than [`LOG_FORMAT`] are refused
    pub format: u32,

    /// When the log was created
    pub created: DateTime<Utc>,

    /// When the log was last modified
    pub modified: DateTime<Utc>,
}
