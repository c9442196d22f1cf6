//! The legacy block/vote model.
//!
//! Retained for compatibility with ledgers written before consensus moved
//! out of the validation core: proposer-signed blocks, and the federation
//! voting rules that decided a block's fate.

pub mod block;
pub mod voting;

pub use block::{Block, BlockBody};
pub use voting::{
    block_election, count_votes, decide_votes, partition_eligible_votes, BlockDecision,
    BlockElection, Vote, VoteTally,
};
