//! Validator-set storage.

use crate::StoreError;
use lattice_types::{PublicKey, TransactionId};
use serde::{Deserialize, Serialize};

/// One member of the validator set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub public_key: PublicKey,
    pub voting_power: u64,
}

/// A validator-set change taking effect at `height`. `election_id` records
/// which concluded election caused the change, if any.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorChange {
    pub height: u64,
    pub validators: Vec<Validator>,
    pub election_id: Option<TransactionId>,
}

/// Height-versioned validator-set storage. Mutated only by the
/// block-processing path, one height at a time.
pub trait ValidatorStore {
    fn store_validator_set(&self, change: ValidatorChange) -> Result<(), StoreError>;

    /// Remove the change stored at exactly `height` (rollback path).
    fn delete_validator_set(&self, height: u64) -> Result<(), StoreError>;

    /// The latest change at or below `height`, or the latest overall when
    /// `height` is `None`.
    fn get_validator_change(
        &self,
        height: Option<u64>,
    ) -> Result<Option<ValidatorChange>, StoreError>;

    /// The validator set effective at `height`.
    fn get_validators(&self, height: Option<u64>) -> Result<Vec<Validator>, StoreError> {
        Ok(self
            .get_validator_change(height)?
            .map(|change| change.validators)
            .unwrap_or_default())
    }
}
