//! The federation voting rules.
//!
//! A block is decided by the votes of its voter list: a majority of valid
//! votes that also agree on the previous block makes it valid, half or
//! more invalid votes make it invalid, anything else stays undecided.

use lattice_crypto::{sha3_256, sign_message, verify_signature};
use lattice_types::{PrivateKey, PublicKey, Signature, TransactionId, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// One node's vote on one block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub node_pubkey: PublicKey,
    pub block_id: TransactionId,
    pub previous_block: TransactionId,
    pub is_valid: bool,
    pub signature: Option<Signature>,
}

impl Vote {
    pub fn new(
        node_pubkey: PublicKey,
        block_id: TransactionId,
        previous_block: TransactionId,
        is_valid: bool,
    ) -> Self {
        Self {
            node_pubkey,
            block_id,
            previous_block,
            is_valid,
            signature: None,
        }
    }

    fn digest(&self) -> [u8; 32] {
        let unsigned = Self {
            signature: None,
            ..self.clone()
        };
        let value = serde_json::to_value(&unsigned).expect("vote serialization cannot fail");
        sha3_256(value.to_string().as_bytes())
    }

    pub fn sign(&mut self, private_key: &PrivateKey) -> &mut Self {
        self.signature = Some(sign_message(&self.digest(), private_key));
        self
    }

    pub fn is_signature_valid(&self) -> bool {
        match &self.signature {
            Some(signature) => verify_signature(&self.digest(), signature, &self.node_pubkey),
            None => false,
        }
    }
}

/// The outcome the federation reached on a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockDecision {
    Valid,
    Invalid,
    Undecided,
}

/// Tally of a block's eligible votes.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct VoteTally {
    pub n_valid: u64,
    pub n_invalid: u64,
    /// Among valid votes, how many agree on the most-agreed previous block.
    pub n_agree_prev_block: u64,
    /// Voters who cast more than one vote. Each counts once as invalid.
    pub cheats: Vec<PublicKey>,
}

/// A decided block election.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockElection {
    pub decision: BlockDecision,
    pub cheats: Vec<PublicKey>,
}

impl BlockElection {
    /// Duplicate votes are an invariant the consensus layer should have
    /// made impossible; surface them as an operator-alerting error.
    pub fn critical_error(&self) -> Option<ValidationError> {
        self.cheats.first().map(|pubkey| {
            ValidationError::CriticalDuplicateVote {
                pubkey: pubkey.to_base58(),
            }
        })
    }
}

/// Split votes into those cast by an entitled voter with a valid
/// signature, and the rest.
pub fn partition_eligible_votes(
    votes: Vec<Vote>,
    eligible_voters: &[PublicKey],
) -> (Vec<Vote>, Vec<Vote>) {
    let eligible_set: BTreeSet<&PublicKey> = eligible_voters.iter().collect();
    votes.into_iter().partition(|vote| {
        eligible_set.contains(&vote.node_pubkey) && vote.is_signature_valid()
    })
}

/// Tally eligible votes. A voter appearing more than once is a cheat:
/// all of their votes are discarded and they count once as invalid.
pub fn count_votes(eligible_votes: &[Vote]) -> VoteTally {
    let mut by_voter: HashMap<PublicKey, Vec<&Vote>> = HashMap::new();
    for vote in eligible_votes {
        by_voter.entry(vote.node_pubkey).or_default().push(vote);
    }

    let mut tally = VoteTally::default();
    let mut prev_block_counts: HashMap<TransactionId, u64> = HashMap::new();
    for (voter, votes) in by_voter {
        if votes.len() > 1 {
            warn!(voter = %voter, votes = votes.len(), "duplicate votes from one voter");
            tally.cheats.push(voter);
            tally.n_invalid += 1;
            continue;
        }
        let vote = votes[0];
        if vote.is_valid {
            tally.n_valid += 1;
            *prev_block_counts.entry(vote.previous_block).or_insert(0) += 1;
        } else {
            tally.n_invalid += 1;
        }
    }
    tally.n_agree_prev_block = prev_block_counts.into_values().max().unwrap_or(0);
    tally.cheats.sort_unstable_by_key(|key| *key.as_bytes());
    tally
}

/// Decide a block from its vote counts.
///
/// Half or more invalid votes condemn the block. A strict majority of
/// valid votes passes it only if a strict majority also agrees on the
/// previous block; a split federation condemns it. Otherwise the election
/// stays undecided.
pub fn decide_votes(
    n_voters: u64,
    n_valid: u64,
    n_invalid: u64,
    n_agree_prev_block: u64,
) -> Result<BlockDecision, ValidationError> {
    if n_valid + n_invalid > n_voters || n_agree_prev_block > n_valid {
        return Err(ValidationError::Schema {
            reason: "vote counts exceed the number of eligible voters".into(),
        });
    }
    if n_invalid * 2 >= n_voters {
        return Ok(BlockDecision::Invalid);
    }
    if n_valid * 2 > n_voters {
        if n_agree_prev_block * 2 > n_voters {
            return Ok(BlockDecision::Valid);
        }
        return Ok(BlockDecision::Invalid);
    }
    Ok(BlockDecision::Undecided)
}

/// Run the whole election for a block: filter, tally, decide.
pub fn block_election(
    block: &crate::Block,
    votes: Vec<Vote>,
) -> Result<BlockElection, ValidationError> {
    let (eligible, _ineligible) = partition_eligible_votes(votes, &block.body.voters);
    let tally = count_votes(&eligible);
    let decision = decide_votes(
        block.body.voters.len() as u64,
        tally.n_valid,
        tally.n_invalid,
        tally.n_agree_prev_block,
    )?;
    Ok(BlockElection {
        decision,
        cheats: tally.cheats,
    })
}
