//! The rescoring pass.
//!
//! A pass scores a pair's unscored entries and rebuilds every day they touch,
//! plus the days live ripples have reached by `today`. Days are always recomputed from all retained entries on that date plus
//! the active ripples, never incrementally, so running a pass twice leaves
//! the stored day scores unchanged.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, error, info};

use tether_core::alloc::AllocType;
use tether_core::entry::EntryAdapter;
use tether_core::error::TetherError;
use tether_core::impact::ImpactWeight;
use tether_core::repo::ScoreRepository;
use tether_core::rollup::{DayBucket, MonthlyRawScores, month_key};
use tether_core::traits::{ImpactSource, RippleCalculator};
use tether_core::types::{PairKey, ScorePair};
use tether_decay::ripple::register;
use tether_decay::{RippleEffect, RippleLedger};

/// What one pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RescoreSummary {
    pub scored: usize,
    pub days: usize,
    pub superseded: usize,
    pub ripples_created: usize,
    pub pruned_entries: usize,
    pub expired_ripples: usize,
}

pub struct Rescorer {
    repo: ScoreRepository,
    ripples: RippleLedger,
    impacts: Arc<dyn ImpactSource>,
    calculator: Arc<dyn RippleCalculator>,
    incident_min_weight: f64,
    retain_scored_entries: usize,
}

impl Rescorer {
    pub fn new(
        repo: ScoreRepository,
        impacts: Arc<dyn ImpactSource>,
        calculator: Arc<dyn RippleCalculator>,
        incident_min_weight: f64,
        retain_scored_entries: usize,
    ) -> Self {
        Self {
            ripples: RippleLedger::new(repo.clone()),
            repo,
            impacts,
            calculator,
            incident_min_weight,
            retain_scored_entries,
        }
    }

    /// App and community-hybrid score of one entry.
    pub fn score_entry(&self, entry: &EntryAdapter) -> ScorePair {
        let args = &entry.args;
        if args.needs_impact_weight() {
            let weight = match entry.code.as_deref() {
                Some(code) => self.impacts.impact_weight(code),
                None => {
                    error!(id = entry.id, rule_type = ?entry.rule_type, "entry without behavior code");
                    ImpactWeight::near_zero()
                }
            };
            return ScorePair::new(args.resolve(weight.app), args.resolve(weight.hybrid));
        }
        if entry.rule_type.alloc_type() == AllocType::Incident {
            return ScorePair::uniform(args.resolve(self.incident_min_weight));
        }
        ScorePair::uniform(args.resolve(0.0))
    }

    /// Score a pair's pending entries and rebuild the days they touch.
    pub fn rescore(&self, pair: &PairKey, today: NaiveDate) -> Result<RescoreSummary, TetherError> {
        let mut summary = RescoreSummary::default();
        let (mut entries, superseded) = supersede_same_day_assessments(self.repo.entries(pair)?);
        summary.superseded = superseded.len();
        self.repo.delete_entries(pair, &superseded)?;

        let mut ripples = self.ripples.load(pair)?;
        let mut replaced_ripples = Vec::new();
        let mut affected: BTreeSet<NaiveDate> = BTreeSet::new();

        let mut newly_scored = Vec::new();
        for entry in entries.iter_mut().filter(|entry| !entry.scored) {
            affected.insert(entry.occur_date);
            let points = self.score_entry(entry);
            if let Some(ripple) = RippleEffect::from_entry(entry, points, self.calculator.as_ref()) {
                // Days an earlier ripple of this entry, or an earlier answer
                // for the same code, covered may lose it.
                for existing in ripples.iter().filter(|r| {
                    r.entry_id == ripple.entry_id
                        || (ripple.is_repeating() && r.is_repeating() && r.code == ripple.code)
                }) {
                    affected.extend(existing.active_dates(today));
                }
                replaced_ripples.extend(register(&mut ripples, ripple));
                summary.ripples_created += 1;
            }
            entry.scored = true;
            newly_scored.push(entry.clone());
        }
        summary.scored = newly_scored.len();

        // Ripple days reached since the last pass.
        for ripple in &ripples {
            affected.extend(ripple.active_dates(today));
        }

        if affected.is_empty() && summary.superseded == 0 {
            summary.expired_ripples = self.drop_expired(pair, &mut ripples, today)?;
            return Ok(summary);
        }

        summary.days = self.rebuild_days(pair, &entries, &ripples, &affected)?;
        self.repo.put_entries(pair, &newly_scored)?;
        summary.pruned_entries = self.prune_scored(pair, &entries)?;

        self.ripples.remove(pair, &replaced_ripples)?;
        self.ripples.save(pair, &ripples)?;
        summary.expired_ripples = self.drop_expired(pair, &mut ripples, today)?;

        info!(
            pair = %pair,
            scored = summary.scored,
            days = summary.days,
            ripples = summary.ripples_created,
            pruned = summary.pruned_entries,
            "rescored pair"
        );
        Ok(summary)
    }

    /// Withdraw entry `entry_id` and its ripple, rebuilding every day either
    /// had reached. Returns the number of days rebuilt.
    pub fn retract(
        &self,
        pair: &PairKey,
        entry_id: u64,
        today: NaiveDate,
    ) -> Result<usize, TetherError> {
        let (retracted, kept): (Vec<EntryAdapter>, Vec<EntryAdapter>) = self
            .repo
            .entries(pair)?
            .into_iter()
            .partition(|entry| entry.id == entry_id);
        let (dropped, live): (Vec<RippleEffect>, Vec<RippleEffect>) = self
            .ripples
            .load(pair)?
            .into_iter()
            .partition(|ripple| ripple.entry_id == entry_id);
        if retracted.is_empty() && dropped.is_empty() {
            return Ok(0);
        }

        let mut affected: BTreeSet<NaiveDate> = BTreeSet::new();
        for entry in &retracted {
            affected.insert(entry.occur_date);
            // The ripple may have expired already; its days still carry it.
            let windows = self.calculator.ripple_windows(entry.rule_type);
            affected.extend(
                entry
                    .occur_date
                    .iter_days()
                    .skip(1)
                    .take(windows as usize)
                    .take_while(|date| *date <= today),
            );
        }
        for ripple in &dropped {
            affected.insert(ripple.occur_date);
            affected.extend(ripple.active_dates(today));
        }
        self.repo.delete_entries(pair, &retracted)?;
        self.ripples.remove(pair, &dropped)?;

        // Pending entries are folded in by the next pass.
        let scored: Vec<EntryAdapter> = kept.into_iter().filter(|entry| entry.scored).collect();
        let days = self.rebuild_days(pair, &scored, &live, &affected)?;
        info!(pair = %pair, entry = entry_id, days, "retracted entry");
        Ok(days)
    }

    /// Recompute and store the day records for `dates`.
    fn rebuild_days(
        &self,
        pair: &PairKey,
        entries: &[EntryAdapter],
        ripples: &[RippleEffect],
        dates: &BTreeSet<NaiveDate>,
    ) -> Result<usize, TetherError> {
        let mut by_date: HashMap<NaiveDate, Vec<&EntryAdapter>> = HashMap::new();
        for entry in entries {
            by_date.entry(entry.occur_date).or_default().push(entry);
        }

        let mut months: BTreeMap<String, MonthlyRawScores> = BTreeMap::new();
        for date in dates {
            let mut bucket = DayBucket::new();
            for entry in by_date.get(date).into_iter().flatten() {
                bucket.add(entry.rule_type.alloc_type(), self.score_entry(entry));
            }
            for ripple in ripples {
                if let Some(points) = ripple.contribution_on(*date, self.calculator.as_ref()) {
                    bucket.add(ripple.rule_type.alloc_type(), points);
                }
            }

            let month = match months.entry(month_key(*date)) {
                Entry::Occupied(slot) => slot.into_mut(),
                Entry::Vacant(slot) => {
                    let loaded = self
                        .repo
                        .month(pair, slot.key())?
                        .unwrap_or_else(|| MonthlyRawScores::new(slot.key().clone()));
                    slot.insert(loaded)
                }
            };
            if bucket.is_empty() {
                month.remove_day(*date);
            } else {
                let day = bucket.resolve(*date);
                debug!(pair = %pair, date = %date, bits = day.items_bit_code, app = day.app_user_score, "day scored");
                month.upsert_day(day);
            }
        }

        let months: Vec<MonthlyRawScores> = months.into_values().collect();
        self.repo.put_months(pair, &months)?;
        Ok(dates.len())
    }

    /// Delete scored entries beyond the newest `retain_scored_entries`.
    fn prune_scored(&self, pair: &PairKey, entries: &[EntryAdapter]) -> Result<usize, TetherError> {
        let scored: Vec<&EntryAdapter> = entries.iter().filter(|entry| entry.scored).collect();
        let excess = scored.len().saturating_sub(self.retain_scored_entries);
        if excess == 0 {
            return Ok(0);
        }
        // Entries arrive sorted oldest first.
        let pruned: Vec<EntryAdapter> = scored.into_iter().take(excess).cloned().collect();
        self.repo.delete_entries(pair, &pruned)?;
        Ok(pruned.len())
    }

    fn drop_expired(
        &self,
        pair: &PairKey,
        ripples: &mut Vec<RippleEffect>,
        today: NaiveDate,
    ) -> Result<usize, TetherError> {
        let (expired, live): (Vec<RippleEffect>, Vec<RippleEffect>) =
            ripples.drain(..).partition(|ripple| ripple.is_expired(today));
        *ripples = live;
        self.ripples.remove(pair, &expired)?;
        Ok(expired.len())
    }
}

/// Keep only the latest answer per (day, code) among value assessments.
///
/// Returns the surviving entries (order preserved) and the superseded ones.
fn supersede_same_day_assessments(
    entries: Vec<EntryAdapter>,
) -> (Vec<EntryAdapter>, Vec<EntryAdapter>) {
    let mut latest: HashMap<(NaiveDate, String), (chrono::DateTime<chrono::Utc>, u64)> =
        HashMap::new();
    for entry in &entries {
        if entry.rule_type.alloc_type() != AllocType::Assess {
            continue;
        }
        let Some(code) = entry.code.clone() else {
            continue;
        };
        let stamp = (entry.created_at, entry.id);
        latest
            .entry((entry.occur_date, code))
            .and_modify(|best| {
                if stamp > *best {
                    *best = stamp;
                }
            })
            .or_insert(stamp);
    }

    entries.into_iter().partition(|entry| {
        if entry.rule_type.alloc_type() != AllocType::Assess {
            return true;
        }
        match &entry.code {
            Some(code) => latest
                .get(&(entry.occur_date, code.clone()))
                .is_none_or(|best| *best == (entry.created_at, entry.id)),
            None => true,
        }
    })
}
