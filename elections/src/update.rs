//! The payload of a validator election.

use lattice_transactions::Transaction;
use lattice_types::{PublicKey, ValidationError};
use serde::{Deserialize, Serialize};

/// The validator-set change a validator election proposes. `power == 0`
/// removes the validator from the set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorUpdate {
    pub public_key: PublicKey,
    pub power: u64,
    pub node_id: String,
}

impl ValidatorUpdate {
    /// Parse the update out of an election's asset data.
    pub fn from_election(election: &Transaction) -> Result<Self, ValidationError> {
        let data = election.asset.data().ok_or_else(|| ValidationError::Schema {
            reason: "validator election carries no asset data".into(),
        })?;
        serde_json::from_value(data.clone()).map_err(|err| ValidationError::Schema {
            reason: format!("malformed validator update: {err}"),
        })
    }
}
