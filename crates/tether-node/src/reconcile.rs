//! Incident reconciliation across every user tracking a prospect.
//!
//! Runs after interval histories are written, never inside the same step:
//! the commitment change is persisted first, then incidents for the whole
//! prospect are re-derived from the stored histories. Each incident owns one
//! incident entry, which is rewritten whenever the incident's overlap or the
//! relationship length changes and retracted when the incident stops holding.
//! Re-running for the same `today` changes nothing.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use tether_core::entry::EntryAdapter;
use tether_core::error::TetherError;
use tether_core::incident::{Incident, IncidentId, detect_incidents};
use tether_core::repo::ScoreRepository;
use tether_core::types::PairKey;

use crate::locks::KeyedLocks;
use crate::scorer::Rescorer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
}

#[derive(Clone)]
pub struct IncidentReconciler {
    repo: ScoreRepository,
    rescorer: Arc<Rescorer>,
    pair_locks: Arc<KeyedLocks<PairKey>>,
}

impl IncidentReconciler {
    pub fn new(
        repo: ScoreRepository,
        rescorer: Arc<Rescorer>,
        pair_locks: Arc<KeyedLocks<PairKey>>,
    ) -> Self {
        Self {
            repo,
            rescorer,
            pair_locks,
        }
    }

    /// Bring stored incidents for `prospect_id` in line with the current histories.
    ///
    /// Callers must not run two reconciliations of one prospect at once.
    /// Each user's pair lock is held while that pair is brought up to date.
    pub fn reconcile_incidents(
        &self,
        prospect_id: &str,
        today: NaiveDate,
    ) -> Result<ReconcileSummary, TetherError> {
        let histories = self.repo.prospect_histories(prospect_id)?;
        let mut summary = ReconcileSummary::default();

        for (user_id, history) in &histories {
            let others: Vec<(String, _)> = histories
                .iter()
                .filter(|(other, _)| other != user_id)
                .cloned()
                .collect();
            let pair = PairKey::new(user_id.clone(), prospect_id);
            let relationship_days = history.relationship_length_days(today);

            let lock = self.pair_locks.get(&pair);
            let _guard = lock.lock();

            let mut stored: BTreeMap<IncidentId, Incident> = self
                .repo
                .incidents(&pair)?
                .into_iter()
                .map(|incident| (incident.id(), incident))
                .collect();
            let entries: HashMap<u64, EntryAdapter> = self
                .repo
                .entries(&pair)?
                .into_iter()
                .map(|entry| (entry.id, entry))
                .collect();

            for mut incident in detect_incidents(user_id, history, &others, prospect_id, today) {
                let mut entry = EntryAdapter::from_incident(&incident, relationship_days);
                match stored.remove(&incident.id()) {
                    None => {
                        incident.entry_id = entry.id;
                        self.repo.put_entry(&pair, &entry)?;
                        self.repo.save_incident(&mut incident, today)?;
                        info!(
                            pair = %pair,
                            reporting_user = %incident.reporting_user_id,
                            overlap_days = incident.overlap_days,
                            "incident detected"
                        );
                        summary.created += 1;
                    }
                    Some(existing) => {
                        incident.entry_id = existing.entry_id;
                        entry.id = existing.entry_id;
                        let incident_changed = existing != incident;
                        let entry_changed = entries.get(&entry.id).is_some_and(|current| {
                            current.args != entry.args || current.date_args != entry.date_args
                        });
                        if !incident_changed && !entry_changed {
                            continue;
                        }
                        // Pending again, so the next pass rescores it in place.
                        self.repo.put_entry(&pair, &entry)?;
                        if incident_changed {
                            self.repo.save_incident(&mut incident, today)?;
                        }
                        debug!(pair = %pair, overlap_days = incident.overlap_days, "incident updated");
                        summary.updated += 1;
                    }
                }
            }

            for stale in stored.into_values() {
                debug!(pair = %pair, reporting_user = %stale.reporting_user_id, "incident no longer holds");
                self.rescorer.retract(&pair, stale.entry_id, today)?;
                self.repo.delete_incident(&stale)?;
                summary.removed += 1;
            }
        }

        Ok(summary)
    }
}
