//! Bounded interpolation of slider inputs into scores in `[-1, 1]`.
//!
//! Slider-scored entries start at a minimum weight (the behavior's impact
//! weight) and move one notch per slider position. The notch is normally a
//! fixed fraction of the weight; once `|weight|` passes the slider's threshold
//! the notch shrinks to the headroom left before `±1.0`, so the strongest
//! slider position lands exactly on the boundary instead of past it.

use serde::{Deserialize, Serialize};

use crate::commit_level::get_commit_level_impact;
use crate::constants::{
    CONCERN_SCALE, FOUR_SLOT_HEADROOM_SCALE, NEVER_REWARD_FACTOR, SLIDER_3_NOTCH_THRESHOLD,
    SLIDER_4_NOTCH_THRESHOLD,
};

/// Number of positions on an input slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SliderKind {
    /// Behavior, feeling and communication strength (1–3).
    Three,
    /// Value-assessment frequency (1–4).
    Four,
}

impl SliderKind {
    pub fn slots(self) -> u8 {
        match self {
            Self::Three => 3,
            Self::Four => 4,
        }
    }

    /// Notch steps between the first and last slot.
    pub fn steps(self) -> u8 {
        self.slots() - 1
    }

    pub fn threshold(self) -> f64 {
        match self {
            Self::Three => SLIDER_3_NOTCH_THRESHOLD,
            Self::Four => SLIDER_4_NOTCH_THRESHOLD,
        }
    }
}

/// Notch size for a slider whose minimum weight is `mid_score`.
///
/// Below the threshold: `mid_score / slots`. At or above it:
/// `sign · (1 - |mid_score|) / 2`, scaled by `2/3` on a 4-slot slider, which
/// puts the last slot exactly on `±1.0`.
///
/// # Examples
///
/// ```
/// use tether_core::interpolation::{bounded_notch, SliderKind};
///
/// assert!((bounded_notch(0.6, SliderKind::Three) - 0.2).abs() < 1e-12);
/// assert!((bounded_notch(0.9, SliderKind::Three) - 0.05).abs() < 1e-12);
/// ```
pub fn bounded_notch(mid_score: f64, kind: SliderKind) -> f64 {
    let magnitude = mid_score.abs();
    if magnitude < kind.threshold() {
        return mid_score / f64::from(kind.slots());
    }
    let mut headroom = (1.0 - magnitude).max(0.0) / 2.0;
    if kind == SliderKind::Four {
        headroom *= FOUR_SLOT_HEADROOM_SCALE;
    }
    headroom.copysign(mid_score)
}

/// Notch for an incident: the full headroom from the minimum weight to `-1.0`
/// (or `+1.0` for a positive weight).
pub fn incident_notch(min_weight: f64) -> f64 {
    (1.0 - min_weight.abs()).max(0.0).copysign(min_weight)
}

/// 3-slot interpolation: `min + (pos - 1) · notch`, clamped to `±1`.
pub fn slider_score(min_weight: f64, notch: f64, slider_pos: u8) -> f64 {
    let steps = f64::from(slider_pos.saturating_sub(1));
    (min_weight + steps * notch).clamp(-1.0, 1.0)
}

/// 4-slot value-assessment interpolation.
///
/// A frequency of 1 ("never does this") returns `min_weight` unchanged; that
/// is where the caller's reward weight comes through.
pub fn value_assessment_score(min_weight: f64, notch: f64, freq_slider_pos: u8) -> f64 {
    if freq_slider_pos <= 1 {
        return min_weight;
    }
    let raw = min_weight + f64::from(freq_slider_pos - 1) * notch;
    if notch < 0.0 { raw.max(-1.0) } else { raw.min(1.0) }
}

/// Incident interpolation: `min + notch · overlap / relationship length`.
///
/// The ratio is clamped to `[0, 1]`; a zero-length relationship counts as a
/// full overlap.
pub fn incident_score(min_weight: f64, notch: f64, overlap_days: i64, relationship_days: i64) -> f64 {
    let ratio = if relationship_days <= 0 {
        1.0
    } else {
        (overlap_days.max(0) as f64 / relationship_days as f64).clamp(0.0, 1.0)
    };
    (min_weight + notch * ratio).clamp(-1.0, 1.0)
}

/// Numeric inputs of an entry, one variant per interpolation algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScoreArgs {
    Behavior { slider_pos: u8 },
    Feeling { slider_pos: u8 },
    ValueAssessment { concern_vote: u8, freq_vote: u8 },
    Incident { overlap_days: i64, relationship_days: i64 },
    CommitChange { from_level: u8, to_level: u8 },
    /// Score computed upstream; passes through.
    PreScored { score: f64 },
}

impl ScoreArgs {
    /// Minimum weight and notch for this entry given its resolved weight.
    ///
    /// `weight` is the impact weight for slider variants and the incident
    /// minimum weight for incidents; table and pre-scored variants ignore it.
    pub fn min_and_notch(&self, weight: f64) -> (f64, f64) {
        match *self {
            Self::Behavior { .. } | Self::Feeling { .. } => {
                (weight, bounded_notch(weight, SliderKind::Three))
            }
            Self::ValueAssessment { concern_vote, freq_vote } => {
                let scale = concern_scale(concern_vote);
                let mid = weight * scale;
                let notch = bounded_notch(mid, SliderKind::Four);
                if freq_vote <= 1 {
                    (-mid * NEVER_REWARD_FACTOR, notch)
                } else {
                    (mid, notch)
                }
            }
            Self::Incident { .. } => (weight, incident_notch(weight)),
            Self::CommitChange { .. } | Self::PreScored { .. } => (0.0, 0.0),
        }
    }

    /// Score for an explicit minimum weight and notch.
    pub fn score(&self, min_weight: f64, notch: f64) -> f64 {
        match *self {
            Self::Behavior { slider_pos } | Self::Feeling { slider_pos } => {
                slider_score(min_weight, notch, slider_pos)
            }
            Self::ValueAssessment { freq_vote, .. } => {
                value_assessment_score(min_weight, notch, freq_vote)
            }
            Self::Incident {
                overlap_days,
                relationship_days,
            } => incident_score(min_weight, notch, overlap_days, relationship_days),
            Self::CommitChange { from_level, to_level } => {
                get_commit_level_impact(from_level, to_level)
            }
            Self::PreScored { score } => score.clamp(-1.0, 1.0),
        }
    }

    /// Score from a resolved weight.
    pub fn resolve(&self, weight: f64) -> f64 {
        let (min_weight, notch) = self.min_and_notch(weight);
        self.score(min_weight, notch)
    }

    /// Whether scoring needs a behavior impact weight.
    pub fn needs_impact_weight(&self) -> bool {
        matches!(
            self,
            Self::Behavior { .. } | Self::Feeling { .. } | Self::ValueAssessment { .. }
        )
    }
}

fn concern_scale(concern_vote: u8) -> f64 {
    let index = usize::from(concern_vote.clamp(1, 4)) - 1;
    CONCERN_SCALE[index]
}
