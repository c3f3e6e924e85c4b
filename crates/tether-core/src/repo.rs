//! Typed access to scoring documents over any [`DocumentStore`].
//!
//! Key layout:
//!
//! | Collection | Key |
//! |---|---|
//! | entries | `{user}/{prospect}/{yyyymmdd}/{id:016x}` |
//! | monthly scores | `{user}/{prospect}/{yymm01}` |
//! | intervals | `{prospect}/{user}` |
//! | incidents | `{user}/{prospect}/{reporting user}/{user start}/{reporting start}` |
//!
//! Identifiers must not contain `/`.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::entry::EntryAdapter;
use crate::error::TetherError;
use crate::incident::Incident;
use crate::interval::IntervalHistory;
use crate::rollup::{MonthlyRawScores, month_key};
use crate::store::{decode, encode};
use crate::traits::{Collection, DocumentStore};
use crate::types::PairKey;

// --- Keys ---

/// Prefix shared by every per-pair document.
pub fn pair_prefix(pair: &PairKey) -> String {
    format!("{}/{}/", pair.user_id, pair.prospect_id)
}

pub fn entry_key(pair: &PairKey, entry: &EntryAdapter) -> String {
    format!(
        "{}{}/{:016x}",
        pair_prefix(pair),
        entry.occur_date.format("%Y%m%d"),
        entry.id
    )
}

pub fn month_doc_key(pair: &PairKey, month: &str) -> String {
    format!("{}{}", pair_prefix(pair), month)
}

pub fn interval_key(pair: &PairKey) -> String {
    format!("{}/{}", pair.prospect_id, pair.user_id)
}

pub fn incident_key(incident: &Incident) -> String {
    let id = incident.id();
    format!(
        "{}/{}/{}/{}/{}",
        incident.user_id,
        incident.prospect_id,
        id.reporting_user_id,
        id.user_start.format("%Y%m%d"),
        id.reporting_start.format("%Y%m%d")
    )
}

/// Month bucket keys from the month of `from` through the month of `to`.
pub fn month_keys_between(from: NaiveDate, to: NaiveDate) -> Vec<String> {
    let (from, to) = if from <= to { (from, to) } else { (to, from) };
    let mut keys = Vec::new();
    let (mut year, mut month) = (from.year(), from.month());
    while (year, month) <= (to.year(), to.month()) {
        if let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) {
            keys.push(month_key(first));
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    keys
}

/// Typed repository for entries, month buckets, intervals and incidents.
#[derive(Clone)]
pub struct ScoreRepository {
    store: Arc<dyn DocumentStore>,
}

impl ScoreRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    // --- Generic documents ---

    pub fn get_doc<T: DeserializeOwned>(
        &self,
        collection: Collection,
        key: &str,
    ) -> Result<Option<T>, TetherError> {
        self.store
            .get(collection, key)?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    pub fn put_doc<T: Serialize>(
        &self,
        collection: Collection,
        key: &str,
        value: &T,
    ) -> Result<(), TetherError> {
        self.store.put(collection, key, encode(value)?)
    }

    /// Decoded documents under `prefix`, in key order.
    pub fn scan_docs<T: DeserializeOwned>(
        &self,
        collection: Collection,
        prefix: &str,
    ) -> Result<Vec<(String, T)>, TetherError> {
        self.store
            .scan_prefix(collection, prefix)?
            .into_iter()
            .map(|(key, bytes)| Ok((key, decode(&bytes)?)))
            .collect()
    }

    // --- Entries ---

    pub fn put_entry(&self, pair: &PairKey, entry: &EntryAdapter) -> Result<(), TetherError> {
        debug!(pair = %pair, rule_type = ?entry.rule_type, date = %entry.occur_date, "storing entry");
        self.put_doc(Collection::Entries, &entry_key(pair, entry), entry)
    }

    pub fn put_entries(&self, pair: &PairKey, entries: &[EntryAdapter]) -> Result<(), TetherError> {
        let items = entries
            .iter()
            .map(|entry| Ok((entry_key(pair, entry), encode(entry)?)))
            .collect::<Result<Vec<_>, TetherError>>()?;
        self.store.batch_put(Collection::Entries, items)
    }

    /// All retained entries for the pair, oldest occur date first.
    pub fn entries(&self, pair: &PairKey) -> Result<Vec<EntryAdapter>, TetherError> {
        let mut entries: Vec<EntryAdapter> = self
            .scan_docs(Collection::Entries, &pair_prefix(pair))?
            .into_iter()
            .map(|(_, entry)| entry)
            .collect();
        entries.sort_by(|a, b| {
            a.occur_date
                .cmp(&b.occur_date)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(entries)
    }

    pub fn delete_entries(&self, pair: &PairKey, entries: &[EntryAdapter]) -> Result<(), TetherError> {
        let keys: Vec<String> = entries.iter().map(|entry| entry_key(pair, entry)).collect();
        self.store.batch_delete(Collection::Entries, &keys)
    }

    // --- Month buckets ---

    pub fn month(&self, pair: &PairKey, month: &str) -> Result<Option<MonthlyRawScores>, TetherError> {
        self.get_doc(Collection::MonthlyScores, &month_doc_key(pair, month))
    }

    pub fn put_months(&self, pair: &PairKey, months: &[MonthlyRawScores]) -> Result<(), TetherError> {
        let items = months
            .iter()
            .map(|month| Ok((month_doc_key(pair, &month.month_key), encode(month)?)))
            .collect::<Result<Vec<_>, TetherError>>()?;
        self.store.batch_put(Collection::MonthlyScores, items)
    }

    /// Stored month buckets covering `from..=to`; missing months are skipped.
    pub fn months_between(
        &self,
        pair: &PairKey,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<MonthlyRawScores>, TetherError> {
        let keys: Vec<String> = month_keys_between(from, to)
            .iter()
            .map(|month| month_doc_key(pair, month))
            .collect();
        self.store
            .batch_get(Collection::MonthlyScores, &keys)?
            .into_iter()
            .flatten()
            .map(|bytes| decode(&bytes))
            .collect()
    }

    // --- Intervals ---

    pub fn interval_history(&self, pair: &PairKey) -> Result<Option<IntervalHistory>, TetherError> {
        let history: Option<IntervalHistory> =
            self.get_doc(Collection::Intervals, &interval_key(pair))?;
        if let Some(history) = &history {
            history.validate()?;
        }
        Ok(history)
    }

    pub fn put_interval_history(
        &self,
        pair: &PairKey,
        history: &IntervalHistory,
    ) -> Result<(), TetherError> {
        history.validate()?;
        self.put_doc(Collection::Intervals, &interval_key(pair), history)
    }

    /// Every user's interval history for one prospect.
    pub fn prospect_histories(
        &self,
        prospect_id: &str,
    ) -> Result<Vec<(String, IntervalHistory)>, TetherError> {
        let prefix = format!("{prospect_id}/");
        self.scan_docs::<IntervalHistory>(Collection::Intervals, &prefix)?
            .into_iter()
            .map(|(key, history)| {
                history.validate()?;
                Ok((key[prefix.len()..].to_string(), history))
            })
            .collect()
    }

    // --- Incidents ---

    pub fn incidents(&self, pair: &PairKey) -> Result<Vec<Incident>, TetherError> {
        Ok(self
            .scan_docs(Collection::Incidents, &pair_prefix(pair))?
            .into_iter()
            .map(|(_, incident)| incident)
            .collect())
    }

    /// Persist an incident, recomputing its overlap from its intervals first.
    pub fn save_incident(&self, incident: &mut Incident, today: NaiveDate) -> Result<(), TetherError> {
        incident.recompute(today);
        self.put_doc(Collection::Incidents, &incident_key(incident), incident)
    }

    pub fn delete_incident(&self, incident: &Incident) -> Result<(), TetherError> {
        self.store.delete(Collection::Incidents, &incident_key(incident))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit_level::CommitLevel;
    use crate::interval::Interval;
    use crate::rollup::RawDayScore;
    use crate::store::MemoryStore;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn repo() -> ScoreRepository {
        ScoreRepository::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn month_keys_span_year_boundary() {
        assert_eq!(
            month_keys_between(d(2023, 11, 20), d(2024, 2, 1)),
            vec!["231101", "231201", "240101", "240201"]
        );
        assert_eq!(month_keys_between(d(2024, 3, 9), d(2024, 3, 1)), vec!["240301"]);
    }

    #[test]
    fn entries_are_scoped_to_pair_and_sorted() {
        let repo = repo();
        let pair = PairKey::new("u1", "p1");
        let other = PairKey::new("u1", "p10");
        let late = EntryAdapter::pre_scored(0.1, d(2024, 5, 9));
        let early = EntryAdapter::pre_scored(0.2, d(2024, 5, 2));
        repo.put_entries(&pair, &[late.clone(), early.clone()]).unwrap();
        repo.put_entry(&other, &EntryAdapter::pre_scored(0.3, d(2024, 5, 1)))
            .unwrap();

        let got = repo.entries(&pair).unwrap();
        assert_eq!(got, vec![early.clone(), late]);

        repo.delete_entries(&pair, &[early]).unwrap();
        assert_eq!(repo.entries(&pair).unwrap().len(), 1);
        assert_eq!(repo.entries(&other).unwrap().len(), 1);
    }

    #[test]
    fn months_between_skips_missing() {
        let repo = repo();
        let pair = PairKey::new("u1", "p1");
        let mut march = MonthlyRawScores::new("240301");
        march.upsert_day(RawDayScore {
            date: d(2024, 3, 4),
            app_user_score: 0.5,
            community_hybrid_score: 0.4,
            items_bit_code: 2,
        });
        repo.put_months(&pair, &[march.clone()]).unwrap();
        let got = repo.months_between(&pair, d(2024, 1, 1), d(2024, 4, 30)).unwrap();
        assert_eq!(got, vec![march.clone()]);
        assert_eq!(repo.month(&pair, "240301").unwrap(), Some(march));
        assert_eq!(repo.month(&pair, "240401").unwrap(), None);
    }

    #[test]
    fn prospect_histories_cover_all_users() {
        let repo = repo();
        let a = IntervalHistory::begin(CommitLevel::Dating, d(2024, 1, 1));
        let b = IntervalHistory::begin(CommitLevel::Casual, d(2024, 2, 1));
        repo.put_interval_history(&PairKey::new("alice", "p1"), &a).unwrap();
        repo.put_interval_history(&PairKey::new("beth", "p1"), &b).unwrap();
        repo.put_interval_history(&PairKey::new("cara", "p2"), &b).unwrap();

        let got = repo.prospect_histories("p1").unwrap();
        let users: Vec<&str> = got.iter().map(|(u, _)| u.as_str()).collect();
        assert_eq!(users, vec!["alice", "beth"]);
        assert_eq!(
            repo.interval_history(&PairKey::new("alice", "p1")).unwrap(),
            Some(a)
        );
    }

    #[test]
    fn save_incident_recomputes_overlap() {
        let repo = repo();
        let mine = Interval::open(d(2024, 1, 1), CommitLevel::ExclusiveMa);
        let theirs = Interval::open(d(2024, 2, 1), CommitLevel::Casual);
        let mut incident =
            Incident::detect("alice", mine, "beth", theirs, "p1", d(2024, 2, 11)).unwrap();
        incident.overlap_days = 1_000;
        repo.save_incident(&mut incident, d(2024, 2, 21)).unwrap();

        let stored = repo.incidents(&PairKey::new("alice", "p1")).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].overlap_days, 20);

        repo.delete_incident(&stored[0]).unwrap();
        assert!(repo.incidents(&PairKey::new("alice", "p1")).unwrap().is_empty());
    }
}
