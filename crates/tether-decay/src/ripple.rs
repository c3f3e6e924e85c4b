//! Persisted ripple records.
//!
//! A [`RippleEffect`] is written when a rippling entry is first scored. It
//! carries the entry's day score so later rescoring passes can fold the
//! contribution into the days after the origin without rescoring the entry.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use tether_core::entry::EntryAdapter;
use tether_core::error::TetherError;
use tether_core::repo::{ScoreRepository, pair_prefix};
use tether_core::rule_type::{RippleKind, ScoreRuleType};
use tether_core::store::encode;
use tether_core::traits::{Collection, RippleCalculator};
use tether_core::types::{PairKey, ScorePair};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RippleEffect {
    /// Entry the ripple was scored from.
    pub entry_id: u64,
    pub rule_type: ScoreRuleType,
    pub code: Option<String>,
    pub occur_date: NaiveDate,
    pub weight_factor: f64,
    /// Larger magnitude of the two initial scores.
    pub impact_strength: f64,
    pub initial_points: ScorePair,
    /// Last day the ripple contributes, inclusive.
    pub expire_date: NaiveDate,
}

impl RippleEffect {
    /// Ripple for a freshly scored entry, or `None` if its rule type doesn't ripple.
    pub fn from_entry(
        entry: &EntryAdapter,
        initial_points: ScorePair,
        calculator: &dyn RippleCalculator,
    ) -> Option<Self> {
        let windows = calculator.ripple_windows(entry.rule_type);
        if windows == 0 {
            return None;
        }
        Some(Self {
            entry_id: entry.id,
            rule_type: entry.rule_type,
            code: entry.code.clone(),
            occur_date: entry.occur_date,
            weight_factor: 1.0,
            impact_strength: initial_points.strength(),
            initial_points,
            expire_date: entry.occur_date + Duration::days(i64::from(windows)),
        })
    }

    pub fn is_repeating(&self) -> bool {
        self.rule_type.ripple_kind() == RippleKind::Repeating
    }

    /// Windows elapsed at `date`, if the ripple covers it.
    pub fn periods_at(&self, date: NaiveDate) -> Option<u32> {
        if date <= self.occur_date || date > self.expire_date {
            return None;
        }
        u32::try_from((date - self.occur_date).num_days()).ok()
    }

    /// Contribution to `date`, if any.
    pub fn contribution_on(
        &self,
        date: NaiveDate,
        calculator: &dyn RippleCalculator,
    ) -> Option<ScorePair> {
        let periods = self.periods_at(date)?;
        Some(calculator.contribution(self.rule_type, self.initial_points, self.weight_factor, periods))
    }

    /// Days after the origin the ripple covers, up to `today`.
    pub fn active_dates(&self, today: NaiveDate) -> Vec<NaiveDate> {
        let last = self.expire_date.min(today);
        self.occur_date
            .iter_days()
            .skip(1)
            .take_while(|date| *date <= last)
            .collect()
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expire_date < today
    }

    /// Stop contributing from `date` onward.
    pub fn end_before(&mut self, date: NaiveDate) {
        if let Some(day_before) = date.pred_opt() {
            self.expire_date = self.expire_date.min(day_before);
        }
    }
}

/// Add `ripple` to `ripples`, applying repeat-answer rules.
///
/// A ripple replaces any earlier one from the same entry. A repeating ripple
/// also replaces one for the same code and day, and ends any earlier
/// repeating ripple of that code the day before it starts. Returns the
/// ripples that were replaced.
pub fn register(ripples: &mut Vec<RippleEffect>, ripple: RippleEffect) -> Vec<RippleEffect> {
    let mut replaced = Vec::new();
    let mut kept = Vec::with_capacity(ripples.len() + 1);
    for mut existing in ripples.drain(..) {
        if existing.entry_id == ripple.entry_id {
            replaced.push(existing);
            continue;
        }
        if ripple.is_repeating() && existing.is_repeating() && existing.code == ripple.code {
            if existing.occur_date == ripple.occur_date {
                replaced.push(existing);
                continue;
            }
            if existing.occur_date < ripple.occur_date {
                existing.end_before(ripple.occur_date);
            }
        }
        kept.push(existing);
    }
    kept.push(ripple);
    *ripples = kept;
    replaced
}

/// Storage key for a ripple: one per source entry.
pub fn ripple_key(pair: &PairKey, ripple: &RippleEffect) -> String {
    format!(
        "{}{}/{:016x}",
        pair_prefix(pair),
        ripple.occur_date.format("%Y%m%d"),
        ripple.entry_id
    )
}

/// Ripple persistence for one repository.
#[derive(Clone)]
pub struct RippleLedger {
    repo: ScoreRepository,
}

impl RippleLedger {
    pub fn new(repo: ScoreRepository) -> Self {
        Self { repo }
    }

    pub fn load(&self, pair: &PairKey) -> Result<Vec<RippleEffect>, TetherError> {
        Ok(self
            .repo
            .scan_docs(Collection::Ripples, &pair_prefix(pair))?
            .into_iter()
            .map(|(_, ripple)| ripple)
            .collect())
    }

    pub fn save(&self, pair: &PairKey, ripples: &[RippleEffect]) -> Result<(), TetherError> {
        let items = ripples
            .iter()
            .map(|ripple| Ok((ripple_key(pair, ripple), encode(ripple)?)))
            .collect::<Result<Vec<_>, TetherError>>()?;
        self.repo.store().batch_put(Collection::Ripples, items)
    }

    pub fn remove(&self, pair: &PairKey, ripples: &[RippleEffect]) -> Result<(), TetherError> {
        if ripples.is_empty() {
            return Ok(());
        }
        debug!(pair = %pair, count = ripples.len(), "removing ripples");
        let keys: Vec<String> = ripples.iter().map(|ripple| ripple_key(pair, ripple)).collect();
        self.repo.store().batch_delete(Collection::Ripples, &keys)
    }
}
