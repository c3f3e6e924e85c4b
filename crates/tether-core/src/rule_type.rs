//! Score rule types: what kind of event an entry records.
//!
//! The rule type fixes three things about an entry: which interpolation
//! applies to it, which allocation bit it sets in its window, and whether it
//! keeps contributing after its origin day.

use serde::{Deserialize, Serialize};

use crate::alloc::AllocType;
use crate::commit_level::CommitLevel;
use crate::interpolation::SliderKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreRuleType {
    BehaviorPos,
    BehaviorNeg,
    FeelingPos,
    FeelingNeg,
    ValAssessNever,
    ValAssessLittle,
    ValAssessFrequent,
    ValAssessLots,
    Breakup,
    Incident,
    ProspectStatusIncrease,
    ProspectStatusDecrease,
    CommunicationPos,
    CommunicationNeg,
    PreScored,
}

/// How far past its origin day an event keeps contributing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RippleKind {
    /// Scored on its origin day only.
    None,
    /// Persists until answered again or the repeat horizon passes.
    Repeating,
    /// Echoes a fixed number of windows forward.
    Echo,
}

impl ScoreRuleType {
    pub fn alloc_type(self) -> AllocType {
        match self {
            Self::FeelingPos | Self::FeelingNeg => AllocType::Feeling,
            Self::BehaviorPos
            | Self::BehaviorNeg
            | Self::CommunicationPos
            | Self::CommunicationNeg
            | Self::PreScored => AllocType::Behavior,
            Self::ValAssessNever
            | Self::ValAssessLittle
            | Self::ValAssessFrequent
            | Self::ValAssessLots => AllocType::Assess,
            Self::ProspectStatusIncrease | Self::ProspectStatusDecrease => AllocType::CommitChange,
            Self::Breakup => AllocType::Breakup,
            Self::Incident => AllocType::Incident,
        }
    }

    pub fn ripple_kind(self) -> RippleKind {
        match self {
            Self::ValAssessNever
            | Self::ValAssessLittle
            | Self::ValAssessFrequent
            | Self::ValAssessLots => RippleKind::Repeating,
            Self::Breakup
            | Self::Incident
            | Self::ProspectStatusIncrease
            | Self::ProspectStatusDecrease => RippleKind::Echo,
            _ => RippleKind::None,
        }
    }

    /// Slider shape for interpolated rule types; `None` for table or ratio scored ones.
    pub fn slider_kind(self) -> Option<SliderKind> {
        match self.alloc_type() {
            AllocType::Feeling | AllocType::Behavior if self != Self::PreScored => {
                Some(SliderKind::Three)
            }
            AllocType::Assess => Some(SliderKind::Four),
            _ => None,
        }
    }

    pub fn is_positive(self) -> bool {
        matches!(
            self,
            Self::BehaviorPos
                | Self::FeelingPos
                | Self::CommunicationPos
                | Self::ProspectStatusIncrease
                | Self::ValAssessNever
        )
    }

    pub fn behavior(positive: bool, communication: bool) -> Self {
        match (positive, communication) {
            (true, false) => Self::BehaviorPos,
            (false, false) => Self::BehaviorNeg,
            (true, true) => Self::CommunicationPos,
            (false, true) => Self::CommunicationNeg,
        }
    }

    pub fn feeling(positive: bool) -> Self {
        if positive { Self::FeelingPos } else { Self::FeelingNeg }
    }
}

/// Rule type for a value assessment, chosen by the frequency vote.
///
/// Returns `None` when the vote is outside `1..=4`.
pub fn rule_type_from_freq_vote(freq_vote: u8) -> Option<ScoreRuleType> {
    match freq_vote {
        1 => Some(ScoreRuleType::ValAssessNever),
        2 => Some(ScoreRuleType::ValAssessLittle),
        3 => Some(ScoreRuleType::ValAssessFrequent),
        4 => Some(ScoreRuleType::ValAssessLots),
        _ => None,
    }
}

/// Rule type for a commitment change from `prior` to `current`.
///
/// Returns `None` when the level did not change.
pub fn rule_type_from_phase_change(current: CommitLevel, prior: CommitLevel) -> Option<ScoreRuleType> {
    if current == prior {
        None
    } else if current == CommitLevel::BrokenUp {
        Some(ScoreRuleType::Breakup)
    } else if current > prior {
        Some(ScoreRuleType::ProspectStatusIncrease)
    } else {
        Some(ScoreRuleType::ProspectStatusDecrease)
    }
}
