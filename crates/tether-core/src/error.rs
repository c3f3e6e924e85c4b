//! Error types for the Tether scoring engine.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    #[error("{field} out of range: {value} not in {min}..={max}")] SliderOutOfRange { field: &'static str, value: u8, min: u8, max: u8 },
    #[error("no commitment change: level {0} to itself")] NoPhaseChange(u8),
    #[error("invalid id {0:?}: must be non-empty and free of '/'")] InvalidId(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntervalError {
    #[error("interval sequence is empty")] Empty,
    #[error("no open interval at index 0")] NoOpenInterval,
    #[error("open interval at index {0}, expected only index 0")] OpenIntervalNotNewest(usize),
    #[error("commitment level unchanged: {0}")] SameLevel(u8),
    #[error("change date {date} precedes current start {start}")] ChangeBeforeStart { date: String, start: String },
    #[error("unknown commitment level: {0}")] UnknownLevel(u8),
    #[error("relationship already begun")] AlreadyBegun,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaxonomyError {
    #[error("duplicate behavior code: {0}")] DuplicateCode(String),
    #[error("impact out of range for {code}: {impact}")] ImpactOutOfRange { code: String, impact: String },
    #[error("impact sign disagrees with polarity for {0}")] PolarityMismatch(String),
    #[error("unknown parent {parent} for {code}")] UnknownParent { code: String, parent: String },
    #[error("unknown behavior code: {0}")] UnknownCode(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    #[error("vote slot out of range: {0}")] SlotOutOfRange(u8),
    #[error("shard invariant violated for {code} shard {shard}: count {count} != slot sum {slot_sum}")] ShardInvariant { code: String, shard: u32, count: u64, slot_sum: u64 },
    #[error("shard count must be positive")] ZeroShards,
}

#[derive(Error, Debug)]
pub enum TetherError {
    #[error(transparent)] Entry(#[from] EntryError),
    #[error(transparent)] Interval(#[from] IntervalError),
    #[error(transparent)] Taxonomy(#[from] TaxonomyError),
    #[error(transparent)] Consensus(#[from] ConsensusError),
    #[error("storage: {0}")] Storage(String),
    #[error("codec: {0}")] Codec(String),
    #[error("config: {0}")] Config(String),
}
