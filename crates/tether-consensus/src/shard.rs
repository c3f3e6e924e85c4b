//! Sharded vote counters.
//!
//! Each behavior code's votes are split across a fixed number of shards, one
//! picked at random per write, so concurrent voters rarely touch the same
//! document. Every shard holds a `count` plus four slot counters per
//! (sex, vote type), with `count == Σ slots` checked after every update.
//! Reads fan out over all shards and merge totals, ignoring sex.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tether_core::error::{ConsensusError, TetherError};
use tether_core::repo::ScoreRepository;
use tether_core::store::{decode, encode};
use tether_core::traits::Collection;
use tether_core::types::{Sex, VoteType};

/// Number of slots on a vote slider.
pub const SLOT_COUNT: usize = 4;

/// Votes of one (sex, vote type) or one merged vote type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlotCounter {
    pub count: u64,
    pub slots: [u64; SLOT_COUNT],
}

impl SlotCounter {
    /// Record one vote for `slot` (1-based).
    pub fn record(&mut self, slot: u8) -> Result<(), ConsensusError> {
        let index = slot_index(slot)?;
        self.slots[index] += 1;
        self.count += 1;
        Ok(())
    }

    pub fn slot_sum(&self) -> u64 {
        self.slots.iter().sum()
    }

    pub fn is_consistent(&self) -> bool {
        self.count == self.slot_sum()
    }

    /// Reset `count` from the slot counters. Returns whether it changed.
    pub fn repair(&mut self) -> bool {
        let sum = self.slot_sum();
        let changed = self.count != sum;
        self.count = sum;
        changed
    }

    pub fn merge(&mut self, other: &SlotCounter) {
        self.count += other.count;
        for (mine, theirs) in self.slots.iter_mut().zip(other.slots.iter()) {
            *mine += theirs;
        }
    }

    /// Mean slot position (1–4), or `None` without votes.
    pub fn mean_slot(&self) -> Option<f64> {
        let total = self.slot_sum();
        if total == 0 {
            return None;
        }
        let weighted: u64 = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, n)| (i as u64 + 1) * n)
            .sum();
        Some(weighted as f64 / total as f64)
    }
}

fn slot_index(slot: u8) -> Result<usize, ConsensusError> {
    match slot {
        1..=4 => Ok(usize::from(slot) - 1),
        _ => Err(ConsensusError::SlotOutOfRange(slot)),
    }
}

/// One vote to apply to a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteUpdate {
    pub vote_type: VoteType,
    pub slot: u8,
}

impl VoteUpdate {
    pub fn new(vote_type: VoteType, slot: u8) -> Self {
        Self { vote_type, slot }
    }
}

/// One shard of one code's vote counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRollupShard {
    pub code: String,
    pub shard: u32,
    /// Indexed `[sex][vote type]`.
    counters: [[SlotCounter; 3]; 3],
}

impl VoteRollupShard {
    pub fn new(code: impl Into<String>, shard: u32) -> Self {
        Self {
            code: code.into(),
            shard,
            counters: Default::default(),
        }
    }

    pub fn counter(&self, sex: Sex, vote_type: VoteType) -> &SlotCounter {
        &self.counters[sex.index()][vote_type.index()]
    }

    pub fn record(&mut self, sex: Sex, update: VoteUpdate) -> Result<(), ConsensusError> {
        self.counters[sex.index()][update.vote_type.index()].record(update.slot)
    }

    pub fn check_invariant(&self) -> Result<(), ConsensusError> {
        for row in &self.counters {
            for counter in row {
                if !counter.is_consistent() {
                    return Err(ConsensusError::ShardInvariant {
                        code: self.code.clone(),
                        shard: self.shard,
                        count: counter.count,
                        slot_sum: counter.slot_sum(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Repair every counter whose count drifted. Returns whether any did.
    pub fn repair(&mut self) -> bool {
        let mut changed = false;
        for row in &mut self.counters {
            for counter in row {
                changed |= counter.repair();
            }
        }
        changed
    }

    /// Per vote type totals of this shard, ignoring sex.
    pub fn merged(&self) -> [SlotCounter; 3] {
        let mut merged = [SlotCounter::default(); 3];
        for row in &self.counters {
            for (total, counter) in merged.iter_mut().zip(row.iter()) {
                total.merge(counter);
            }
        }
        merged
    }
}

/// Merged vote totals for one code across all shards and sexes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VoteTotals {
    counters: [SlotCounter; 3],
}

impl VoteTotals {
    pub fn get(&self, vote_type: VoteType) -> &SlotCounter {
        &self.counters[vote_type.index()]
    }

    pub fn add_shard(&mut self, shard: &VoteRollupShard) {
        for (total, counter) in self.counters.iter_mut().zip(shard.merged().iter()) {
            total.merge(counter);
        }
    }
}

/// Picks the shard a write lands on.
pub trait ShardSelector: Send + Sync {
    /// A shard index in `0..shard_count`.
    fn select(&self, shard_count: u32) -> u32;
}

/// Uniformly random shard per write.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomShardSelector;

impl ShardSelector for RandomShardSelector {
    fn select(&self, shard_count: u32) -> u32 {
        rand::thread_rng().gen_range(0..shard_count.max(1))
    }
}

/// Always the same shard.
#[derive(Debug, Clone, Copy)]
pub struct FixedShardSelector(pub u32);

impl ShardSelector for FixedShardSelector {
    fn select(&self, _shard_count: u32) -> u32 {
        self.0
    }
}

pub fn shard_key(code: &str, shard: u32) -> String {
    format!("{code}/{shard:02}")
}

/// Vote rollup over a document store.
pub struct ShardedVoteRollup {
    repo: ScoreRepository,
    shard_count: u32,
    selector: Box<dyn ShardSelector>,
}

impl ShardedVoteRollup {
    pub fn new(repo: ScoreRepository, shard_count: u32) -> Result<Self, ConsensusError> {
        Self::with_selector(repo, shard_count, Box::new(RandomShardSelector))
    }

    pub fn with_selector(
        repo: ScoreRepository,
        shard_count: u32,
        selector: Box<dyn ShardSelector>,
    ) -> Result<Self, ConsensusError> {
        if shard_count == 0 {
            return Err(ConsensusError::ZeroShards);
        }
        Ok(Self {
            repo,
            shard_count,
            selector,
        })
    }

    pub fn shard_count(&self) -> u32 {
        self.shard_count
    }

    /// Apply `updates` to one shard of `code`, creating it if needed.
    ///
    /// All slots are validated before anything is written. Returns the shard
    /// as stored.
    pub fn update_stats(
        &self,
        code: &str,
        sex: Sex,
        updates: &[VoteUpdate],
    ) -> Result<VoteRollupShard, TetherError> {
        for update in updates {
            slot_index(update.slot)?;
        }
        let shard = self.selector.select(self.shard_count) % self.shard_count;
        let key = shard_key(code, shard);
        let bytes = self
            .repo
            .store()
            .update(Collection::VoteShards, &key, &mut |current| {
                let mut doc = match current {
                    Some(bytes) => decode::<VoteRollupShard>(&bytes)?,
                    None => VoteRollupShard::new(code, shard),
                };
                for update in updates {
                    doc.record(sex, *update)?;
                }
                doc.check_invariant()?;
                encode(&doc)
            })?;
        debug!(code, shard, votes = updates.len(), "updated vote shard");
        decode(&bytes)
    }

    /// Merged totals for each code; codes without any votes are absent.
    ///
    /// A shard whose counts drifted from its slot counters is repaired and
    /// written back.
    pub fn totals(&self, codes: &[String]) -> Result<HashMap<String, VoteTotals>, TetherError> {
        let keys: Vec<String> = codes
            .iter()
            .flat_map(|code| (0..self.shard_count).map(move |shard| shard_key(code, shard)))
            .collect();
        let docs = self.repo.store().batch_get(Collection::VoteShards, &keys)?;

        let mut totals: HashMap<String, VoteTotals> = HashMap::new();
        for (key, bytes) in keys.iter().zip(docs) {
            let Some(bytes) = bytes else {
                continue;
            };
            let mut shard: VoteRollupShard = decode(&bytes)?;
            if shard.check_invariant().is_err() {
                shard = self.repair_shard(key, &shard)?;
            }
            totals.entry(shard.code.clone()).or_default().add_shard(&shard);
        }
        Ok(totals)
    }

    /// Repair the stored shard under `key` in place.
    ///
    /// Runs as an atomic update on the current document, so votes recorded
    /// since `seen` was read are kept.
    fn repair_shard(
        &self,
        key: &str,
        seen: &VoteRollupShard,
    ) -> Result<VoteRollupShard, TetherError> {
        let bytes = self
            .repo
            .store()
            .update(Collection::VoteShards, key, &mut |current| {
                let mut doc = match current {
                    Some(bytes) => decode::<VoteRollupShard>(&bytes)?,
                    None => seen.clone(),
                };
                doc.repair();
                encode(&doc)
            })?;
        warn!(code = %seen.code, shard = seen.shard, "repaired drifted vote shard");
        decode(&bytes)
    }
}
