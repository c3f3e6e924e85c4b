//! Incidents: one prospect in overlapping relationships with two users.
//!
//! An incident pairs a user's exclusive interval with another (reporting)
//! user's active interval for the same prospect. The overlap fields are
//! derived data and are recomputed from the two intervals every time an
//! incident is persisted; a stored value is never trusted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::commit_level::CommitLevel;
use crate::interval::{Interval, IntervalHistory};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub user_id: String,
    pub reporting_user_id: String,
    pub prospect_id: String,
    pub user_interval: Interval,
    pub reporting_user_interval: Interval,
    pub overlap_days: i64,
    pub earliest_overlap_date: Option<NaiveDate>,
    pub latest_overlap_date: Option<NaiveDate>,
    /// Id of the incident entry written for this incident, `0` until one is.
    pub entry_id: u64,
}

/// Stable identity of an incident across recomputations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IncidentId {
    pub reporting_user_id: String,
    pub user_start: NaiveDate,
    pub reporting_start: NaiveDate,
}

impl Incident {
    /// Only an exclusive phase can be cheated on, and only an active
    /// relationship on the other side counts as cheating.
    pub fn is_incident_bearing(user_interval: &Interval, reporting_interval: &Interval) -> bool {
        user_interval.commit_level.is_exclusive()
            && reporting_interval.commit_level != CommitLevel::BrokenUp
    }

    /// Build an incident if the two intervals overlap and can bear one.
    pub fn detect(
        user_id: &str,
        user_interval: Interval,
        reporting_user_id: &str,
        reporting_user_interval: Interval,
        prospect_id: &str,
        today: NaiveDate,
    ) -> Option<Self> {
        if user_id == reporting_user_id
            || !Self::is_incident_bearing(&user_interval, &reporting_user_interval)
        {
            return None;
        }
        let mut incident = Self {
            user_id: user_id.to_string(),
            reporting_user_id: reporting_user_id.to_string(),
            prospect_id: prospect_id.to_string(),
            user_interval,
            reporting_user_interval,
            overlap_days: 0,
            earliest_overlap_date: None,
            latest_overlap_date: None,
            entry_id: 0,
        };
        incident.recompute(today);
        (incident.overlap_days > 0).then_some(incident)
    }

    /// Refresh the derived overlap fields from the two intervals.
    pub fn recompute(&mut self, today: NaiveDate) {
        match self.user_interval.overlap_with(&self.reporting_user_interval, today) {
            Some((start, end)) => {
                self.overlap_days = (end - start).num_days().abs();
                self.earliest_overlap_date = Some(start);
                self.latest_overlap_date = Some(end);
            }
            None => {
                self.overlap_days = 0;
                self.earliest_overlap_date = None;
                self.latest_overlap_date = None;
            }
        }
    }

    pub fn id(&self) -> IncidentId {
        IncidentId {
            reporting_user_id: self.reporting_user_id.clone(),
            user_start: self.user_interval.start_date,
            reporting_start: self.reporting_user_interval.start_date,
        }
    }
}

/// Every incident for `user_id` against the other users tracking the same prospect.
pub fn detect_incidents(
    user_id: &str,
    history: &IntervalHistory,
    others: &[(String, IntervalHistory)],
    prospect_id: &str,
    today: NaiveDate,
) -> Vec<Incident> {
    let mut found = Vec::new();
    for user_interval in history.exclusive_intervals() {
        for (other_id, other_history) in others {
            for reporting_interval in other_history.intervals() {
                if let Some(incident) = Incident::detect(
                    user_id,
                    *user_interval,
                    other_id,
                    *reporting_interval,
                    prospect_id,
                    today,
                ) {
                    found.push(incident);
                }
            }
        }
    }
    found.sort_by(|a, b| a.id().cmp(&b.id()));
    found
}
