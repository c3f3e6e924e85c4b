//! # tether-consensus
//! Community consensus over behavior impact weights.
//!
//! Votes on how a behavior feels, how much it matters and how often it
//! happens are counted in sharded rollups ([`ShardedVoteRollup`]). The
//! [`CommunityImpactConsensus`] cache starts from static taxonomy impacts and
//! is periodically rebuilt from vote totals, then swapped in whole.

pub mod consensus;
pub mod shard;

pub use consensus::{CommunityImpactConsensus, ConsensusSettings, ConsensusSnapshot};
pub use shard::{ShardSelector, ShardedVoteRollup, VoteRollupShard, VoteTotals, VoteUpdate};
