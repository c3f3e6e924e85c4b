//! Shared value types: ownership keys, voter attributes, and score pairs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EntryError;

/// Identifies one user's view of one prospect. Every per-relationship record
/// (entries, day scores, intervals, ripples) is owned by exactly one pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    pub user_id: String,
    pub prospect_id: String,
}

impl PairKey {
    pub fn new(user_id: impl Into<String>, prospect_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            prospect_id: prospect_id.into(),
        }
    }

    /// Both ids must be usable as key segments.
    pub fn validate(&self) -> Result<(), EntryError> {
        check_id(&self.user_id)?;
        check_id(&self.prospect_id)
    }
}

/// Ids are joined with `/` into storage keys, so a `/` inside one would let a
/// prefix scan for one pair reach another pair's records.
pub fn check_id(id: &str) -> Result<(), EntryError> {
    if id.is_empty() || id.contains('/') {
        return Err(EntryError::InvalidId(id.to_string()));
    }
    Ok(())
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user_id, self.prospect_id)
    }
}

/// Sex of the voting user. Vote rollups are partitioned by it but merged
/// totals ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    Female,
    Male,
    Unspecified,
}

impl Sex {
    pub const ALL: [Sex; 3] = [Sex::Female, Sex::Male, Sex::Unspecified];

    pub fn index(self) -> usize {
        match self {
            Self::Female => 0,
            Self::Male => 1,
            Self::Unspecified => 2,
        }
    }
}

/// Which question a community vote answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteType {
    /// How a behavior makes the voter feel.
    Feeling,
    /// How much the voter cares about a behavior.
    Concern,
    /// How often the prospect does it.
    Frequency,
}

impl VoteType {
    pub const ALL: [VoteType; 3] = [VoteType::Feeling, VoteType::Concern, VoteType::Frequency];

    pub fn index(self) -> usize {
        match self {
            Self::Feeling => 0,
            Self::Concern => 1,
            Self::Frequency => 2,
        }
    }
}

/// The two parallel scores every scoring step produces: the app/user
/// calibrated score and the community-consensus hybrid score.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScorePair {
    pub app: f64,
    pub community: f64,
}

impl ScorePair {
    pub fn new(app: f64, community: f64) -> Self {
        Self { app, community }
    }

    /// Same score on both sides (incidents, commitment changes).
    pub fn uniform(score: f64) -> Self {
        Self::new(score, score)
    }

    pub fn scale(self, factor: f64) -> Self {
        Self::new(self.app * factor, self.community * factor)
    }

    pub fn clamped(self) -> Self {
        Self::new(self.app.clamp(-1.0, 1.0), self.community.clamp(-1.0, 1.0))
    }

    /// Larger of the two magnitudes.
    pub fn strength(self) -> f64 {
        self.app.abs().max(self.community.abs())
    }
}
