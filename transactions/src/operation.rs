//! The closed set of transaction operations.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// What a transaction does. Election operations piggyback on the CREATE and
/// TRANSFER mechanics; `is_create_like`/`is_transfer_like` say which.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Transfer,
    ValidatorElection,
    ChainMigrationElection,
    ValidatorElectionVote,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "CREATE",
            Operation::Transfer => "TRANSFER",
            Operation::ValidatorElection => "VALIDATOR_ELECTION",
            Operation::ChainMigrationElection => "CHAIN_MIGRATION_ELECTION",
            Operation::ValidatorElectionVote => "VALIDATOR_ELECTION_VOTE",
        }
    }

    /// Operations that issue a fresh asset (the asset id is the tx id).
    pub fn is_create_like(&self) -> bool {
        matches!(
            self,
            Operation::Create | Operation::ValidatorElection | Operation::ChainMigrationElection
        )
    }

    /// Operations that spend existing outputs.
    pub fn is_transfer_like(&self) -> bool {
        matches!(self, Operation::Transfer | Operation::ValidatorElectionVote)
    }

    /// Operations that open an election.
    pub fn is_election(&self) -> bool {
        matches!(
            self,
            Operation::ValidatorElection | Operation::ChainMigrationElection
        )
    }

    /// Operations that cast a vote on an election.
    pub fn is_vote(&self) -> bool {
        matches!(self, Operation::ValidatorElectionVote)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = lattice_types::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(Operation::Create),
            "TRANSFER" => Ok(Operation::Transfer),
            "VALIDATOR_ELECTION" => Ok(Operation::ValidatorElection),
            "CHAIN_MIGRATION_ELECTION" => Ok(Operation::ChainMigrationElection),
            "VALIDATOR_ELECTION_VOTE" => Ok(Operation::ValidatorElectionVote),
            other => Err(lattice_types::ValidationError::Schema {
                reason: format!("`operation` must be one of the allowed operations, got `{other}`"),
            }),
        }
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
