//! Transaction data model for the Lattice ledger.
//!
//! Transaction kinds:
//! - **Create**: issues a new asset, locking amounts to conditions.
//! - **Transfer**: spends existing outputs, conserving amounts.
//! - **ValidatorElection / ChainMigrationElection**: CREATE-shaped election
//!   proposals (see `lattice-elections`).
//! - **ValidatorElectionVote**: TRANSFER-shaped vote reassigning voting
//!   power toward an election public key.
//!
//! Election kinds reuse the CREATE/TRANSFER mechanics through a closed
//! [`Operation`] enum rather than subtyping.

pub mod asset;
pub mod input;
pub mod link;
pub mod operation;
pub mod output;
pub mod transaction;

pub use asset::Asset;
pub use input::Input;
pub use link::TransactionLink;
pub use operation::Operation;
pub use output::{utxoset_merkle_root, Output, UnspentOutput};
pub use transaction::{Recipient, Transaction};
