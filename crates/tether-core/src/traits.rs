//! Trait interfaces for the Tether scoring engine.
//!
//! These traits define the contracts between crates:
//! - [`DocumentStore`]: keyed document persistence (tether-node implements RocksDB, [`MemoryStore`](crate::store::MemoryStore) here)
//! - [`ImpactSource`]: per-code impact weights (tether-consensus implements)
//! - [`RippleCalculator`]: how far and how strongly events ripple (tether-decay implements)

use std::fmt;

use crate::error::TetherError;
use crate::impact::ImpactWeight;
use crate::rule_type::ScoreRuleType;
use crate::types::ScorePair;

/// Document collections. Each maps to one keyspace in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Entries,
    MonthlyScores,
    Intervals,
    Incidents,
    Ripples,
    VoteShards,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Entries,
        Collection::MonthlyScores,
        Collection::Intervals,
        Collection::Incidents,
        Collection::Ripples,
        Collection::VoteShards,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Entries => "entries",
            Self::MonthlyScores => "monthly_scores",
            Self::Intervals => "intervals",
            Self::Incidents => "incidents",
            Self::Ripples => "ripples",
            Self::VoteShards => "vote_shards",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Read-modify-write callback for [`DocumentStore::update`].
pub type UpdateFn<'a> = dyn FnMut(Option<Vec<u8>>) -> Result<Vec<u8>, TetherError> + 'a;

/// Keyed document persistence.
///
/// Keys are UTF-8 strings; composite keys use `/` separators so that every
/// record owned by one prefix is a single [`scan_prefix`](Self::scan_prefix)
/// away. Values are opaque encoded documents.
pub trait DocumentStore: Send + Sync {
    /// Fetch one document. Returns `None` if the key is absent.
    fn get(&self, collection: Collection, key: &str) -> Result<Option<Vec<u8>>, TetherError>;

    /// Insert or replace one document.
    fn put(&self, collection: Collection, key: &str, value: Vec<u8>) -> Result<(), TetherError>;

    /// Remove one document. Removing an absent key is not an error.
    fn delete(&self, collection: Collection, key: &str) -> Result<(), TetherError>;

    /// All documents whose key starts with `prefix`, in key order.
    fn scan_prefix(
        &self,
        collection: Collection,
        prefix: &str,
    ) -> Result<Vec<(String, Vec<u8>)>, TetherError>;

    /// Fetch several documents; the result is positionally aligned with `keys`.
    fn batch_get(
        &self,
        collection: Collection,
        keys: &[String],
    ) -> Result<Vec<Option<Vec<u8>>>, TetherError> {
        keys.iter().map(|key| self.get(collection, key)).collect()
    }

    /// Write several documents.
    ///
    /// Default implementation writes one at a time; stores with native
    /// batches should override it to write atomically.
    fn batch_put(
        &self,
        collection: Collection,
        items: Vec<(String, Vec<u8>)>,
    ) -> Result<(), TetherError> {
        for (key, value) in items {
            self.put(collection, &key, value)?;
        }
        Ok(())
    }

    fn batch_delete(&self, collection: Collection, keys: &[String]) -> Result<(), TetherError> {
        for key in keys {
            self.delete(collection, key)?;
        }
        Ok(())
    }

    /// Atomically replace a document with `f(current)` and return the new value.
    ///
    /// No other `update` on the same store interleaves between the read and the write.
    fn update(
        &self,
        collection: Collection,
        key: &str,
        f: &mut UpdateFn<'_>,
    ) -> Result<Vec<u8>, TetherError>;
}

/// Per-code impact weights used to score taxonomy-backed entries.
///
/// Unknown codes never fail: implementations log and return
/// [`ImpactWeight::near_zero`].
pub trait ImpactSource: Send + Sync {
    fn impact_weight(&self, code: &str) -> ImpactWeight;
}

/// Ripple horizon and time adjustment of past events.
pub trait RippleCalculator: Send + Sync {
    /// Windows after the origin day the rule type keeps contributing. Zero if it doesn't ripple.
    fn ripple_windows(&self, rule_type: ScoreRuleType) -> u32;

    /// Time-adjusted magnification `periods` windows after the origin day.
    ///
    /// Zero for rule types that don't ripple.
    fn adjust_weight(&self, rule_type: ScoreRuleType, magnification: f64, periods: u32) -> f64;

    /// Contribution of a ripple to a later window.
    ///
    /// Default implementation: `initial · adjust_weight(weight_factor, periods)`.
    fn contribution(
        &self,
        rule_type: ScoreRuleType,
        initial: ScorePair,
        weight_factor: f64,
        periods: u32,
    ) -> ScorePair {
        initial.scale(self.adjust_weight(rule_type, weight_factor, periods))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use parking_lot::Mutex;

    // ------------------------------------------------------------------
    // Mock: DocumentStore
    // ------------------------------------------------------------------

    #[derive(Default)]
    struct MockStore {
        docs: Mutex<HashMap<(Collection, String), Vec<u8>>>,
    }

    impl DocumentStore for MockStore {
        fn get(&self, collection: Collection, key: &str) -> Result<Option<Vec<u8>>, TetherError> {
            Ok(self.docs.lock().get(&(collection, key.to_string())).cloned())
        }

        fn put(&self, collection: Collection, key: &str, value: Vec<u8>) -> Result<(), TetherError> {
            self.docs.lock().insert((collection, key.to_string()), value);
            Ok(())
        }

        fn delete(&self, collection: Collection, key: &str) -> Result<(), TetherError> {
            self.docs.lock().remove(&(collection, key.to_string()));
            Ok(())
        }

        fn scan_prefix(
            &self,
            collection: Collection,
            prefix: &str,
        ) -> Result<Vec<(String, Vec<u8>)>, TetherError> {
            let mut found: Vec<_> = self
                .docs
                .lock()
                .iter()
                .filter(|((c, k), _)| *c == collection && k.starts_with(prefix))
                .map(|((_, k), v)| (k.clone(), v.clone()))
                .collect();
            found.sort();
            Ok(found)
        }

        fn update(
            &self,
            collection: Collection,
            key: &str,
            f: &mut UpdateFn<'_>,
        ) -> Result<Vec<u8>, TetherError> {
            let mut docs = self.docs.lock();
            let current = docs.get(&(collection, key.to_string())).cloned();
            let next = f(current)?;
            docs.insert((collection, key.to_string()), next.clone());
            Ok(next)
        }
    }

    #[test]
    fn batch_defaults_delegate() {
        let store = MockStore::default();
        store
            .batch_put(
                Collection::Entries,
                vec![("a/1".into(), vec![1]), ("a/2".into(), vec![2])],
            )
            .unwrap();
        let got = store
            .batch_get(Collection::Entries, &["a/2".to_string(), "zz".to_string(), "a/1".to_string()])
            .unwrap();
        assert_eq!(got, vec![Some(vec![2]), None, Some(vec![1])]);

        store.batch_delete(Collection::Entries, &["a/1".to_string()]).unwrap();
        assert_eq!(store.scan_prefix(Collection::Entries, "a/").unwrap().len(), 1);
    }

    #[test]
    fn collections_are_separate_keyspaces() {
        let store = MockStore::default();
        store.put(Collection::Ripples, "k", vec![7]).unwrap();
        assert!(store.get(Collection::Incidents, "k").unwrap().is_none());
    }

    #[test]
    fn collection_names_unique() {
        let mut names: Vec<_> = Collection::ALL.iter().map(|c| c.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Collection::ALL.len());
    }

    // ------------------------------------------------------------------
    // Mock: RippleCalculator
    // ------------------------------------------------------------------

    struct HalvingRipple;

    impl RippleCalculator for HalvingRipple {
        fn ripple_windows(&self, _rule_type: ScoreRuleType) -> u32 {
            3
        }

        fn adjust_weight(&self, _rule_type: ScoreRuleType, magnification: f64, periods: u32) -> f64 {
            magnification / f64::from(1u32 << periods.min(16))
        }
    }

    #[test]
    fn contribution_default_scales_initial_points() {
        let c = HalvingRipple.contribution(
            ScoreRuleType::Breakup,
            ScorePair::new(-0.8, -0.4),
            1.0,
            2,
        );
        assert_eq!(c, ScorePair::new(-0.2, -0.1));
    }
}
