//! Commitment levels and the fixed level-transition impact table.
//!
//! A commitment change is not interpolated: every ordered pair of distinct
//! levels maps to one constant score. Pairs missing from the table are a data
//! error; they are logged and score `0.0`.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::IntervalError;

/// Ordinal relationship-exclusivity phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CommitLevel {
    BrokenUp = 0,
    Casual = 1,
    Dating = 2,
    ExclusiveAssumed = 3,
    /// Exclusive by mutual agreement.
    ExclusiveMa = 4,
}

impl CommitLevel {
    pub const ALL: [CommitLevel; 5] = [
        CommitLevel::BrokenUp,
        CommitLevel::Casual,
        CommitLevel::Dating,
        CommitLevel::ExclusiveAssumed,
        CommitLevel::ExclusiveMa,
    ];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(value: u8) -> Result<Self, IntervalError> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(IntervalError::UnknownLevel(value))
    }

    /// Whether the level implies the prospect should be seeing nobody else.
    pub fn is_exclusive(self) -> bool {
        matches!(self, Self::ExclusiveAssumed | Self::ExclusiveMa)
    }
}

impl fmt::Display for CommitLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BrokenUp => "BROKENUP",
            Self::Casual => "CASUAL",
            Self::Dating => "DATING",
            Self::ExclusiveAssumed => "EXCLUSIVE_ASSUMED",
            Self::ExclusiveMa => "EXCLUSIVE_MA",
        };
        f.write_str(name)
    }
}

/// `(from, to) -> score` for every defined transition.
const TRANSITIONS: [((u8, u8), f64); 20] = [
    ((0, 1), 0.30),
    ((0, 2), 0.40),
    ((0, 3), 0.50),
    ((0, 4), 0.60),
    ((1, 0), -0.40),
    ((1, 2), 0.30),
    ((1, 3), 0.45),
    ((1, 4), 0.60),
    ((2, 0), -0.60),
    ((2, 1), -0.30),
    ((2, 3), 0.35),
    ((2, 4), 0.50),
    ((3, 0), -0.80),
    ((3, 1), -0.50),
    ((3, 2), -0.30),
    ((3, 4), 0.40),
    ((4, 0), -0.95),
    ((4, 1), -0.70),
    ((4, 2), -0.50),
    ((4, 3), -0.35),
];

/// Table key in `"{from}-{to}"` form.
pub fn transition_key(from_level: u8, to_level: u8) -> String {
    format!("{from_level}-{to_level}")
}

/// Score for moving from one commitment level to another.
///
/// Returns `0.0` (and logs) for pairs absent from the table, including
/// `from == to` and ordinals above 4.
///
/// # Examples
///
/// ```
/// use tether_core::commit_level::get_commit_level_impact;
///
/// assert_eq!(get_commit_level_impact(4, 0), -0.95);
/// assert_eq!(get_commit_level_impact(2, 3), 0.35);
/// assert_eq!(get_commit_level_impact(2, 2), 0.0);
/// ```
pub fn get_commit_level_impact(from_level: u8, to_level: u8) -> f64 {
    match TRANSITIONS
        .iter()
        .find(|((from, to), _)| *from == from_level && *to == to_level)
    {
        Some((_, score)) => *score,
        None => {
            error!(
                key = %transition_key(from_level, to_level),
                "commitment transition missing from impact table"
            );
            0.0
        }
    }
}

/// Every defined `(from, to, score)` transition.
pub fn transitions() -> impl Iterator<Item = (u8, u8, f64)> {
    TRANSITIONS.iter().map(|((from, to), score)| (*from, *to, *score))
}
