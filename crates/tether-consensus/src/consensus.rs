//! Community impact consensus cache.
//!
//! Negative behavior codes carry a cached [`ImpactWeight`], seeded from the
//! taxonomy's static impact and rebuilt from vote totals at most once per
//! refresh interval. Positive codes are never cached across refreshes: they
//! are derived from their negative opposite on first read and memoised in
//! the current snapshot only.
//!
//! A refresh builds a complete new [`ConsensusSnapshot`] and swaps the shared
//! `Arc`, so readers holding the previous snapshot keep a consistent view.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info};

use tether_core::constants::{CONSENSUS_REFRESH_SECS, DEFAULT_MIN_VOTES};
use tether_core::error::TetherError;
use tether_core::impact::ImpactWeight;
use tether_core::taxonomy::{BehaviorNode, BehaviorTaxonomy};
use tether_core::traits::ImpactSource;
use tether_core::types::VoteType;

use crate::shard::{ShardedVoteRollup, VoteTotals};

/// Refresh policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsensusSettings {
    pub refresh_interval: Duration,
    /// Votes of a type needed before they override the current weight.
    pub min_votes: u64,
}

impl Default for ConsensusSettings {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::seconds(CONSENSUS_REFRESH_SECS),
            min_votes: DEFAULT_MIN_VOTES,
        }
    }
}

/// One immutable generation of negative-code weights.
#[derive(Debug, Default)]
pub struct ConsensusSnapshot {
    negatives: HashMap<String, ImpactWeight>,
    derived: DashMap<String, ImpactWeight>,
    built_at: Option<DateTime<Utc>>,
}

impl ConsensusSnapshot {
    pub fn negative(&self, code: &str) -> Option<ImpactWeight> {
        self.negatives.get(code).copied()
    }

    pub fn negative_count(&self) -> usize {
        self.negatives.len()
    }

    /// When the snapshot was built from votes; `None` for static defaults.
    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.built_at
    }
}

/// Process-wide impact weight cache, constructed once at startup.
pub struct CommunityImpactConsensus {
    taxonomy: Arc<dyn BehaviorTaxonomy>,
    settings: ConsensusSettings,
    snapshot: RwLock<Arc<ConsensusSnapshot>>,
    /// Held for the whole of a refresh.
    last_refresh: Mutex<Option<DateTime<Utc>>>,
}

impl CommunityImpactConsensus {
    /// Seed every negative behavior with its static impact.
    pub fn new(taxonomy: Arc<dyn BehaviorTaxonomy>, settings: ConsensusSettings) -> Self {
        let negatives: HashMap<String, ImpactWeight> = taxonomy
            .negative_codes()
            .into_iter()
            .filter_map(|code| {
                let impact = taxonomy.node(&code)?.static_app_impact;
                Some((code, ImpactWeight::from_static(impact)))
            })
            .collect();
        info!(negatives = negatives.len(), "seeded impact consensus from static defaults");
        Self {
            taxonomy,
            settings,
            snapshot: RwLock::new(Arc::new(ConsensusSnapshot {
                negatives,
                ..ConsensusSnapshot::default()
            })),
            last_refresh: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &ConsensusSettings {
        &self.settings
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<ConsensusSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    /// Weights for `code`. Unknown codes log an error and get near-zero weights.
    pub fn weights(&self, code: &str) -> ImpactWeight {
        let Some(node) = self.taxonomy.node(code) else {
            error!(code, "unknown behavior code");
            return ImpactWeight::near_zero();
        };
        let snapshot = self.snapshot();
        if !node.positive {
            return snapshot.negative(code).unwrap_or_else(|| {
                error!(code, "negative code missing from consensus cache");
                ImpactWeight::near_zero()
            });
        }
        if let Some(weight) = snapshot.derived.get(code) {
            return *weight;
        }
        let weight = self.derive_positive(node, &snapshot);
        snapshot.derived.insert(code.to_string(), weight);
        weight
    }

    fn derive_positive(&self, node: &BehaviorNode, snapshot: &ConsensusSnapshot) -> ImpactWeight {
        let opposite = node.opposite_code.as_deref().and_then(|opposite| {
            let negative = snapshot.negative(opposite)?;
            let static_impact = self.taxonomy.node(opposite)?.static_app_impact;
            Some((negative, static_impact))
        });
        match opposite {
            Some((negative, static_impact)) => derive_from_opposite(negative, static_impact),
            None => {
                debug!(code = %node.code, "no opposite weight, using static impact");
                ImpactWeight::from_static(node.static_app_impact)
            }
        }
    }

    pub fn is_refresh_due(&self, now: DateTime<Utc>) -> bool {
        refresh_due(*self.last_refresh.lock(), now, self.settings.refresh_interval)
    }

    /// Rebuild negative weights from vote totals and swap them in.
    ///
    /// Returns `false` without touching the cache if the last refresh was
    /// less than the refresh interval ago.
    pub fn refresh(&self, totals: &HashMap<String, VoteTotals>, now: DateTime<Utc>) -> bool {
        let mut last = self.last_refresh.lock();
        if !refresh_due(*last, now, self.settings.refresh_interval) {
            return false;
        }
        let current = self.snapshot();
        let mut updated = 0usize;
        let negatives: HashMap<String, ImpactWeight> = current
            .negatives
            .iter()
            .map(|(code, weight)| {
                let static_impact = self
                    .taxonomy
                    .node(code)
                    .map_or(weight.app, |node| node.static_app_impact);
                let next = match totals.get(code) {
                    Some(votes) => weight_from_votes(*weight, static_impact, votes, self.settings.min_votes),
                    None => *weight,
                };
                if next != *weight {
                    updated += 1;
                }
                (code.clone(), next)
            })
            .collect();
        *self.snapshot.write() = Arc::new(ConsensusSnapshot {
            negatives,
            derived: DashMap::new(),
            built_at: Some(now),
        });
        *last = Some(now);
        info!(updated, total = current.negatives.len(), "refreshed impact consensus");
        true
    }

    /// Refresh from the vote rollup if due. Skips the shard fan-out otherwise.
    pub fn refresh_from(
        &self,
        rollup: &ShardedVoteRollup,
        now: DateTime<Utc>,
    ) -> Result<bool, TetherError> {
        if !self.is_refresh_due(now) {
            return Ok(false);
        }
        let mut codes: Vec<String> = self.snapshot().negatives.keys().cloned().collect();
        codes.sort();
        let totals = rollup.totals(&codes)?;
        Ok(self.refresh(&totals, now))
    }
}

impl ImpactSource for CommunityImpactConsensus {
    fn impact_weight(&self, code: &str) -> ImpactWeight {
        self.weights(code)
    }
}

fn refresh_due(last: Option<DateTime<Utc>>, now: DateTime<Utc>, interval: Duration) -> bool {
    last.is_none_or(|last| now - last >= interval)
}

/// New weight for a negative code from its vote totals.
///
/// Concern votes set the community side: `-(mean slot)/4`. Feeling votes
/// scale the app side: `static · (0.5 + mean slot/8)`. A side with fewer than
/// `min_votes` votes keeps its current value.
pub fn weight_from_votes(
    current: ImpactWeight,
    static_impact: f64,
    votes: &VoteTotals,
    min_votes: u64,
) -> ImpactWeight {
    let concern = votes.get(VoteType::Concern);
    let community = match concern.mean_slot() {
        Some(mean) if concern.count >= min_votes => -mean / 4.0,
        _ => current.community,
    };
    let feeling = votes.get(VoteType::Feeling);
    let app = match feeling.mean_slot() {
        Some(mean) if feeling.count >= min_votes => static_impact * (0.5 + mean / 8.0),
        _ => current.app,
    };
    ImpactWeight::new(community, app)
}

/// Positive weight mirrored from a negative opposite.
///
/// `ratio = 1 + (1 - |negApp / negStatic|)`, 1 when the static impact is zero;
/// each side is `clamp(-neg · ratio, 0, 1)`.
pub fn derive_from_opposite(negative: ImpactWeight, negative_static: f64) -> ImpactWeight {
    let ratio = if negative_static == 0.0 {
        1.0
    } else {
        1.0 + (1.0 - (negative.app / negative_static).abs())
    };
    ImpactWeight::new(
        (-negative.community * ratio).clamp(0.0, 1.0),
        (-negative.app * ratio).clamp(0.0, 1.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    use chrono::TimeZone;
    use tether_core::repo::ScoreRepository;
    use tether_core::store::MemoryStore;
    use tether_core::taxonomy::StaticTaxonomy;
    use tether_core::types::Sex;

    use crate::shard::{FixedShardSelector, VoteUpdate};

    const EPS: f64 = 1e-9;

    fn node(code: &str, parent: Option<&str>, opposite: Option<&str>, impact: f64) -> BehaviorNode {
        BehaviorNode {
            code: code.into(),
            parent_code: parent.map(Into::into),
            opposite_code: opposite.map(Into::into),
            is_category: parent.is_none(),
            positive: impact > 0.0,
            static_app_impact: impact,
            text: code.to_lowercase(),
        }
    }

    fn taxonomy() -> Arc<dyn BehaviorTaxonomy> {
        Arc::new(
            StaticTaxonomy::new(vec![
                node("COMM", None, None, 0.0),
                node("TEXTS_BACK", Some("COMM"), Some("IGNORES_TEXTS"), 0.4),
                node("IGNORES_TEXTS", Some("COMM"), Some("TEXTS_BACK"), -0.5),
                node("LIES", Some("COMM"), None, -0.8),
                node("COMPLIMENTS", Some("COMM"), None, 0.3),
            ])
            .unwrap(),
        )
    }

    fn consensus() -> CommunityImpactConsensus {
        CommunityImpactConsensus::new(taxonomy(), ConsensusSettings::default())
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
    }

    fn totals_with(code: &str, vote_type: VoteType, slot: u8, n: usize) -> HashMap<String, VoteTotals> {
        let mut shard = crate::shard::VoteRollupShard::new(code, 0);
        for _ in 0..n {
            shard.record(Sex::Female, VoteUpdate::new(vote_type, slot)).unwrap();
        }
        let mut totals = VoteTotals::default();
        totals.add_shard(&shard);
        HashMap::from([(code.to_string(), totals)])
    }

    #[test]
    fn negatives_start_from_static_impact() {
        let c = consensus();
        let w = c.weights("LIES");
        assert_eq!(w.community, -0.8);
        assert_eq!(w.app, -0.8);
        assert_eq!(c.snapshot().negative_count(), 2);
        assert!(c.snapshot().built_at().is_none());
    }

    #[test]
    fn positive_mirrors_opposite() {
        let c = consensus();
        let w = c.weights("TEXTS_BACK");
        assert!((w.community - 0.5).abs() < EPS);
        assert!((w.app - 0.5).abs() < EPS);
        assert!(c.snapshot().derived.contains_key("TEXTS_BACK"));
    }

    #[test]
    fn positive_without_opposite_uses_static() {
        let w = consensus().weights("COMPLIMENTS");
        assert_eq!(w.app, 0.3);
        assert_eq!(w.community, 0.3);
    }

    #[test]
    fn unknown_code_gets_near_zero() {
        assert_eq!(consensus().weights("NOPE"), ImpactWeight::near_zero());
    }

    #[test]
    fn ratio_grows_when_app_weight_shrinks() {
        // negApp -0.25 against static -0.5: ratio 1.5
        let w = derive_from_opposite(ImpactWeight::new(-0.6, -0.25), -0.5);
        assert!((w.app - 0.375).abs() < EPS);
        assert!((w.community - 0.9).abs() < EPS);
        let capped = derive_from_opposite(ImpactWeight::new(-0.9, -0.1), -0.5);
        assert_eq!(capped.community, 1.0);
        let zero_static = derive_from_opposite(ImpactWeight::new(-0.4, -0.4), 0.0);
        assert!((zero_static.app - 0.4).abs() < EPS);
    }

    #[test]
    fn refresh_applies_concern_votes_and_rederives_positive() {
        let c = consensus();
        let before = c.weights("TEXTS_BACK");
        assert!(c.refresh(&totals_with("IGNORES_TEXTS", VoteType::Concern, 4, 10), at(1)));

        let neg = c.weights("IGNORES_TEXTS");
        assert!((neg.community + 1.0).abs() < EPS);
        assert_eq!(neg.app, -0.5);

        let pos = c.weights("TEXTS_BACK");
        assert_ne!(pos, before);
        assert!((pos.community - 1.0).abs() < EPS);
        assert_eq!(c.snapshot().built_at(), Some(at(1)));
    }

    #[test]
    fn refresh_applies_feeling_votes() {
        let c = consensus();
        c.refresh(&totals_with("LIES", VoteType::Feeling, 4, 12), at(1));
        // -0.8 * (0.5 + 4/8)
        assert!((c.weights("LIES").app + 0.8).abs() < EPS);
        let c = consensus();
        c.refresh(&totals_with("LIES", VoteType::Feeling, 1, 12), at(1));
        assert!((c.weights("LIES").app + 0.5).abs() < EPS);
    }

    #[test]
    fn too_few_votes_keep_previous_weight() {
        let c = consensus();
        c.refresh(&totals_with("LIES", VoteType::Concern, 1, 9), at(1));
        assert_eq!(c.weights("LIES").community, -0.8);
    }

    #[test]
    fn refresh_rate_limited() {
        let c = consensus();
        assert!(c.is_refresh_due(at(0)));
        assert!(c.refresh(&HashMap::new(), at(0)));
        assert!(!c.is_refresh_due(at(0) + Duration::minutes(59)));
        assert!(!c.refresh(&totals_with("LIES", VoteType::Concern, 1, 50), at(0) + Duration::minutes(59)));
        assert_eq!(c.weights("LIES").community, -0.8);
        assert!(c.refresh(&totals_with("LIES", VoteType::Concern, 1, 50), at(1)));
        assert!((c.weights("LIES").community + 0.25).abs() < EPS);
    }

    #[test]
    fn readers_keep_old_snapshot_across_swap() {
        let c = consensus();
        let old = c.snapshot();
        c.refresh(&totals_with("LIES", VoteType::Concern, 2, 10), at(1));
        assert_eq!(old.negative("LIES").unwrap().community, -0.8);
        assert!((c.snapshot().negative("LIES").unwrap().community + 0.5).abs() < EPS);
    }

    #[test]
    fn refresh_from_rollup() {
        let repo = ScoreRepository::new(Arc::new(MemoryStore::new()));
        let rollup =
            ShardedVoteRollup::with_selector(repo, 20, Box::new(FixedShardSelector(2))).unwrap();
        for _ in 0..10 {
            rollup
                .update_stats("LIES", Sex::Male, &[VoteUpdate::new(VoteType::Concern, 2)])
                .unwrap();
        }
        let c = consensus();
        assert!(c.refresh_from(&rollup, at(3)).unwrap());
        assert!((c.weights("LIES").community + 0.5).abs() < EPS);
        assert!(!c.refresh_from(&rollup, at(3)).unwrap());
    }

    #[test]
    fn concurrent_reads_during_refresh_see_whole_snapshots() {
        let c = Arc::new(consensus());
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let c = Arc::clone(&c);
                thread::spawn(move || {
                    for _ in 0..500 {
                        let snap = c.snapshot();
                        assert_eq!(snap.negative_count(), 2);
                        let w = c.weights("LIES");
                        assert!(w.community == -0.8 || (w.community + 0.75).abs() < EPS);
                    }
                })
            })
            .collect();
        c.refresh(&totals_with("LIES", VoteType::Concern, 3, 10), at(5));
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
