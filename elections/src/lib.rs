//! Governance elections.
//!
//! An election is a CREATE-shaped transaction whose outputs hand each
//! current validator voting tokens equal to its power. Validators vote by
//! transferring their tokens to the election's public key; the election
//! concludes in the block where the transferred tokens first reach the
//! configured share (2/3 by default) of the total.

pub mod engine;
pub mod generate;
pub mod update;

pub use engine::{ElectionEngine, ElectionStatus};
pub use generate::{election_public_key, generate_election, generate_vote};
pub use update::ValidatorUpdate;
