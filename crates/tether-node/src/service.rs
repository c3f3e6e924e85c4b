//! Service composition.
//!
//! [`ScoringService`] wires a document store, the behavior taxonomy, the
//! community consensus cache, the vote rollup, the rescorer and the incident
//! reconciler into the single object request handlers call into. Writes for
//! one pair that read and rewrite derived state (rescoring, commitment
//! changes) are serialised per pair, and incident reconciliation is
//! serialised per prospect; everything else proceeds in parallel.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};

use tether_consensus::{CommunityImpactConsensus, ShardedVoteRollup, VoteRollupShard, VoteUpdate};
use tether_core::commit_level::CommitLevel;
use tether_core::constants::COMMUNICATION_CATEGORY;
use tether_core::entry::{BehaviorEntry, EntryAdapter, FeelingEntry};
use tether_core::error::{IntervalError, TaxonomyError, TetherError};
use tether_core::interval::IntervalHistory;
use tether_core::repo::ScoreRepository;
use tether_core::rollup::{SmoothedPlotPoint, smooth_series};
use tether_core::taxonomy::BehaviorTaxonomy;
use tether_core::traits::{DocumentStore, ImpactSource};
use tether_core::types::{PairKey, Sex, VoteType, check_id};
use tether_decay::RippleEngine;

use crate::config::EngineConfig;
use crate::locks::KeyedLocks;
use crate::reconcile::{IncidentReconciler, ReconcileSummary};
use crate::scorer::{RescoreSummary, Rescorer};
use crate::storage::RocksStore;

pub struct ScoringService {
    config: EngineConfig,
    repo: ScoreRepository,
    taxonomy: Arc<dyn BehaviorTaxonomy>,
    consensus: Arc<CommunityImpactConsensus>,
    votes: ShardedVoteRollup,
    rescorer: Arc<Rescorer>,
    reconciler: IncidentReconciler,
    pair_locks: Arc<KeyedLocks<PairKey>>,
    prospect_locks: KeyedLocks<String>,
}

impl ScoringService {
    /// Build a service over an existing store.
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn DocumentStore>,
        taxonomy: Arc<dyn BehaviorTaxonomy>,
    ) -> Result<Self, TetherError> {
        config.validate()?;
        let repo = ScoreRepository::new(store);
        let consensus = Arc::new(CommunityImpactConsensus::new(
            Arc::clone(&taxonomy),
            config.consensus_settings(),
        ));
        let votes = ShardedVoteRollup::new(repo.clone(), config.shard_count)?;
        let impacts: Arc<dyn ImpactSource> = consensus.clone();
        let rescorer = Arc::new(Rescorer::new(
            repo.clone(),
            impacts,
            Arc::new(RippleEngine::new(config.repeat_windows)),
            config.incident_min_weight,
            config.retain_scored_entries,
        ));
        let pair_locks = Arc::new(KeyedLocks::new());
        let reconciler =
            IncidentReconciler::new(repo.clone(), Arc::clone(&rescorer), Arc::clone(&pair_locks));

        info!(
            shards = config.shard_count,
            repeat_windows = config.repeat_windows,
            "scoring service ready"
        );
        Ok(Self {
            config,
            repo,
            taxonomy,
            consensus,
            votes,
            rescorer,
            reconciler,
            pair_locks,
            prospect_locks: KeyedLocks::new(),
        })
    }

    /// Open the RocksDB store under the configured data directory.
    pub fn open(config: EngineConfig, taxonomy: Arc<dyn BehaviorTaxonomy>) -> Result<Self, TetherError> {
        std::fs::create_dir_all(&config.data_dir).map_err(|e| {
            TetherError::Storage(format!("create {}: {e}", config.data_dir.display()))
        })?;
        let store = RocksStore::open(config.db_path())?;
        Self::new(config, Arc::new(store), taxonomy)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn repo(&self) -> &ScoreRepository {
        &self.repo
    }

    pub fn consensus(&self) -> &CommunityImpactConsensus {
        &self.consensus
    }

    pub fn votes(&self) -> &ShardedVoteRollup {
        &self.votes
    }

    /// Behavior entry for a taxonomy code, with polarity and communication
    /// flag taken from the taxonomy.
    pub fn behavior_entry(
        &self,
        code: &str,
        feeling_strength: u8,
        occur_date: NaiveDate,
    ) -> Result<BehaviorEntry, TetherError> {
        let node = self
            .taxonomy
            .node(code)
            .ok_or_else(|| TaxonomyError::UnknownCode(code.to_string()))?;
        let communication = self
            .taxonomy
            .category_and_parent(code)
            .is_some_and(|(category, _)| category == COMMUNICATION_CATEGORY);
        Ok(BehaviorEntry {
            code: node.code.clone(),
            positive: node.positive,
            communication,
            feeling_strength,
            occur_date,
        })
    }

    pub fn record_behavior(
        &self,
        pair: &PairKey,
        behavior: &BehaviorEntry,
    ) -> Result<EntryAdapter, TetherError> {
        pair.validate()?;
        let entry = EntryAdapter::from_behavior(behavior)?;
        self.repo.put_entry(pair, &entry)?;
        Ok(entry)
    }

    pub fn record_feeling(
        &self,
        pair: &PairKey,
        feeling: &FeelingEntry,
    ) -> Result<EntryAdapter, TetherError> {
        pair.validate()?;
        let entry = EntryAdapter::from_feeling(feeling)?;
        self.repo.put_entry(pair, &entry)?;
        Ok(entry)
    }

    /// Record a value-assessment answer and count its concern and frequency
    /// votes toward the community rollup.
    pub fn record_value_assessment(
        &self,
        pair: &PairKey,
        code: &str,
        sex: Sex,
        concern_vote: u8,
        freq_vote: u8,
        date: NaiveDate,
    ) -> Result<EntryAdapter, TetherError> {
        pair.validate()?;
        check_id(code)?;
        let entry = EntryAdapter::from_value_assessment(code, concern_vote, freq_vote, date)?;
        self.votes.update_stats(
            code,
            sex,
            &[
                VoteUpdate::new(VoteType::Concern, concern_vote),
                VoteUpdate::new(VoteType::Frequency, freq_vote),
            ],
        )?;
        self.repo.put_entry(pair, &entry)?;
        Ok(entry)
    }

    /// Count one feeling vote for `code`.
    pub fn record_feeling_vote(
        &self,
        code: &str,
        sex: Sex,
        slot: u8,
    ) -> Result<VoteRollupShard, TetherError> {
        check_id(code)?;
        self.votes
            .update_stats(code, sex, &[VoteUpdate::new(VoteType::Feeling, slot)])
    }

    pub fn record_pre_scored(
        &self,
        pair: &PairKey,
        score: f64,
        date: NaiveDate,
    ) -> Result<EntryAdapter, TetherError> {
        pair.validate()?;
        let entry = EntryAdapter::pre_scored(score, date);
        self.repo.put_entry(pair, &entry)?;
        Ok(entry)
    }

    /// Start tracking a relationship at `level`.
    pub fn begin_relationship(
        &self,
        pair: &PairKey,
        level: CommitLevel,
        start: NaiveDate,
        today: NaiveDate,
    ) -> Result<ReconcileSummary, TetherError> {
        pair.validate()?;
        {
            let lock = self.pair_locks.get(pair);
            let _guard = lock.lock();
            if self.repo.interval_history(pair)?.is_some() {
                return Err(IntervalError::AlreadyBegun.into());
            }
            self.repo
                .put_interval_history(pair, &IntervalHistory::begin(level, start))?;
        }
        debug!(pair = %pair, level = %level, "relationship begun");
        self.reconcile_incidents(&pair.prospect_id, today)
    }

    /// Move a relationship to a new commitment level.
    ///
    /// The interval change and its entry are stored before incidents are
    /// reconciled for the prospect.
    pub fn change_commit_level(
        &self,
        pair: &PairKey,
        level: CommitLevel,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<(EntryAdapter, ReconcileSummary), TetherError> {
        pair.validate()?;
        let entry = {
            let lock = self.pair_locks.get(pair);
            let _guard = lock.lock();
            let mut history = self
                .repo
                .interval_history(pair)?
                .ok_or(IntervalError::Empty)?;
            let (prior, next) = history.change_commit_level(level, date)?;
            let entry = EntryAdapter::from_commit_level_change(&prior, &next)?;
            self.repo.put_interval_history(pair, &history)?;
            self.repo.put_entry(pair, &entry)?;
            info!(pair = %pair, from = %prior.commit_level, to = %next.commit_level, "commitment changed");
            entry
        };
        let summary = self.reconcile_incidents(&pair.prospect_id, today)?;
        Ok((entry, summary))
    }

    /// Re-derive incidents for every user tracking `prospect_id`.
    ///
    /// Runs with the prospect's lock held and no pair lock, so a commitment
    /// change releases its pair before calling in.
    pub fn reconcile_incidents(
        &self,
        prospect_id: &str,
        today: NaiveDate,
    ) -> Result<ReconcileSummary, TetherError> {
        check_id(prospect_id)?;
        let lock = self.prospect_locks.get(&prospect_id.to_string());
        let _guard = lock.lock();
        self.reconciler.reconcile_incidents(prospect_id, today)
    }

    pub fn rescore(&self, pair: &PairKey, today: NaiveDate) -> Result<RescoreSummary, TetherError> {
        pair.validate()?;
        let lock = self.pair_locks.get(pair);
        let _guard = lock.lock();
        self.rescorer.rescore(pair, today)
    }

    /// Smoothed plot points for day scores in `[from, to]`.
    pub fn plot_points(
        &self,
        pair: &PairKey,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SmoothedPlotPoint>, TetherError> {
        pair.validate()?;
        let days: Vec<_> = self
            .repo
            .months_between(pair, from, to)?
            .iter()
            .flat_map(|month| month.days().iter().copied())
            .filter(|day| day.date >= from && day.date <= to)
            .collect();
        Ok(smooth_series(
            &days,
            self.config.smoothing_window_days,
            self.config.smoothing_prior_weight,
        ))
    }

    /// Refresh community impact weights if the refresh interval has passed.
    pub fn refresh_consensus(&self, now: DateTime<Utc>) -> Result<bool, TetherError> {
        self.consensus.refresh_from(&self.votes, now)
    }
}
