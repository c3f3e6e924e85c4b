//! Canonical scored records built from user actions.
//!
//! Every user action that moves a relationship score (a logged behavior, a
//! feeling report, a value-assessment answer, a commitment change, a detected
//! incident) is normalised into an [`EntryAdapter`]. Entries are append-only
//! until a rescore pass marks them scored. Construction validates slider
//! ranges and never clamps; persisting the entry is the caller's job.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{SLIDER_3_RANGE, SLIDER_4_RANGE};
use crate::error::EntryError;
use crate::incident::Incident;
use crate::interpolation::ScoreArgs;
use crate::interval::Interval;
use crate::rule_type::{ScoreRuleType, rule_type_from_freq_vote, rule_type_from_phase_change};

/// A logged behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorEntry {
    pub code: String,
    pub positive: bool,
    /// Whether the behavior sits under the communication category.
    pub communication: bool,
    /// Slider position, 1–3.
    pub feeling_strength: u8,
    pub occur_date: NaiveDate,
}

/// A feeling report about a prospect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeelingEntry {
    pub code: String,
    pub positive: bool,
    /// Slider position, 1–3.
    pub feeling_strength: u8,
    pub occur_date: NaiveDate,
}

/// Date range an entry refers to beyond its occur date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateArgs {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryAdapter {
    pub id: u64,
    pub rule_type: ScoreRuleType,
    pub occur_date: NaiveDate,
    /// Behavior code for taxonomy-backed entries.
    pub code: Option<String>,
    pub args: ScoreArgs,
    pub date_args: Option<DateArgs>,
    pub scored: bool,
    pub created_at: DateTime<Utc>,
}

impl EntryAdapter {
    fn build(
        rule_type: ScoreRuleType,
        occur_date: NaiveDate,
        code: Option<String>,
        args: ScoreArgs,
        date_args: Option<DateArgs>,
    ) -> Self {
        Self {
            id: rand::random(),
            rule_type,
            occur_date,
            code,
            args,
            date_args,
            scored: false,
            created_at: Utc::now(),
        }
    }

    pub fn from_behavior(entry: &BehaviorEntry) -> Result<Self, EntryError> {
        check_range("feeling_strength", entry.feeling_strength, &SLIDER_3_RANGE)?;
        Ok(Self::build(
            ScoreRuleType::behavior(entry.positive, entry.communication),
            entry.occur_date,
            Some(entry.code.clone()),
            ScoreArgs::Behavior {
                slider_pos: entry.feeling_strength,
            },
            None,
        ))
    }

    pub fn from_feeling(entry: &FeelingEntry) -> Result<Self, EntryError> {
        check_range("feeling_strength", entry.feeling_strength, &SLIDER_3_RANGE)?;
        Ok(Self::build(
            ScoreRuleType::feeling(entry.positive),
            entry.occur_date,
            Some(entry.code.clone()),
            ScoreArgs::Feeling {
                slider_pos: entry.feeling_strength,
            },
            None,
        ))
    }

    pub fn from_value_assessment(
        code: &str,
        concern_vote: u8,
        freq_vote: u8,
        date: NaiveDate,
    ) -> Result<Self, EntryError> {
        check_range("concern_vote", concern_vote, &SLIDER_4_RANGE)?;
        check_range("freq_vote", freq_vote, &SLIDER_4_RANGE)?;
        let rule_type = rule_type_from_freq_vote(freq_vote).ok_or(EntryError::SliderOutOfRange {
            field: "freq_vote",
            value: freq_vote,
            min: *SLIDER_4_RANGE.start(),
            max: *SLIDER_4_RANGE.end(),
        })?;
        Ok(Self::build(
            rule_type,
            date,
            Some(code.to_string()),
            ScoreArgs::ValueAssessment {
                concern_vote,
                freq_vote,
            },
            None,
        ))
    }

    /// Incident entry, dated at the start of the overlap.
    pub fn from_incident(incident: &Incident, relationship_length_days: i64) -> Self {
        let occur_date = incident
            .earliest_overlap_date
            .unwrap_or(incident.user_interval.start_date);
        Self::build(
            ScoreRuleType::Incident,
            occur_date,
            None,
            ScoreArgs::Incident {
                overlap_days: incident.overlap_days,
                relationship_days: relationship_length_days,
            },
            Some(DateArgs {
                start: occur_date,
                end: incident.latest_overlap_date,
            }),
        )
    }

    /// Commitment change entry, dated when the next interval starts.
    pub fn from_commit_level_change(prior: &Interval, next: &Interval) -> Result<Self, EntryError> {
        let rule_type = rule_type_from_phase_change(next.commit_level, prior.commit_level)
            .ok_or(EntryError::NoPhaseChange(next.commit_level.ordinal()))?;
        Ok(Self::build(
            rule_type,
            next.start_date,
            None,
            ScoreArgs::CommitChange {
                from_level: prior.commit_level.ordinal(),
                to_level: next.commit_level.ordinal(),
            },
            Some(DateArgs {
                start: prior.start_date,
                end: prior.end_date,
            }),
        ))
    }

    /// Entry whose score was computed upstream.
    pub fn pre_scored(score: f64, date: NaiveDate) -> Self {
        Self::build(
            ScoreRuleType::PreScored,
            date,
            None,
            ScoreArgs::PreScored { score },
            None,
        )
    }
}

fn check_range(
    field: &'static str,
    value: u8,
    range: &std::ops::RangeInclusive<u8>,
) -> Result<(), EntryError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(EntryError::SliderOutOfRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}
