//! Election validation, tallying, and block processing.

use crate::{election_public_key, ValidatorUpdate};
use lattice_store::{
    ChainRecord, ChainStore, ElectionRecord, ElectionStore, TransactionStore, Validator,
    ValidatorChange, ValidatorStore,
};
use lattice_transactions::{Operation, Transaction};
use lattice_types::{ProtocolParams, PublicKey, TransactionId, ValidationError};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Where an election stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElectionStatus {
    /// Votes are still being collected.
    Ongoing,
    /// The threshold was reached and the election took effect. Monotonic.
    Concluded,
    /// The validator set changed after the election opened; the recorded
    /// tally can no longer conclude it.
    Inconclusive,
}

/// Runs the election lifecycle against a ledger.
pub struct ElectionEngine<'a, S> {
    store: &'a S,
    params: ProtocolParams,
}

impl<'a, S> ElectionEngine<'a, S>
where
    S: TransactionStore + ValidatorStore + ElectionStore + ChainStore,
{
    pub fn new(store: &'a S, params: ProtocolParams) -> Self {
        Self { store, params }
    }

    /// Election-specific validation, run on top of the ordinary
    /// transaction checks.
    pub fn validate_election(
        &self,
        tx: &Transaction,
        current_transactions: &[Transaction],
    ) -> Result<(), ValidationError> {
        if !tx.operation.is_election() {
            return Err(ValidationError::Schema {
                reason: format!("`{}` is not an election operation", tx.operation),
            });
        }
        let id = tx.id.ok_or_else(|| ValidationError::Schema {
            reason: "election has no id".into(),
        })?;
        if self.store.is_committed(&id)?
            || current_transactions.iter().any(|other| other.id == Some(id))
        {
            return Err(ValidationError::DuplicateTransaction { txid: id.to_hex() });
        }
        if tx.inputs.len() != 1 || tx.inputs[0].owners_before.len() != 1 {
            return Err(ValidationError::MultipleInputs);
        }
        let initiator = tx.inputs[0].owners_before[0];
        let validators = self.store.get_validators(None)?;
        if !validators
            .iter()
            .any(|validator| validator.public_key == initiator)
        {
            return Err(ValidationError::InvalidProposer);
        }
        if !same_topology(&validators, tx) {
            return Err(ValidationError::UnequalValidatorSet);
        }
        if tx.operation == Operation::ValidatorElection {
            let update = ValidatorUpdate::from_election(tx)?;
            let total: u64 = validators.iter().map(|v| v.voting_power).sum();
            // `power` comes straight from the asset data; a value large
            // enough to overflow the triple is far over the cap anyway.
            if update.power.checked_mul(3).map_or(true, |tripled| tripled >= total) {
                return Err(ValidationError::InvalidPowerChange);
            }
        }
        Ok(())
    }

    /// Sum of all voting tokens the election issued.
    fn total_votes(election: &Transaction) -> u64 {
        election
            .outputs
            .iter()
            .map(|output| output.amount.value())
            .sum()
    }

    /// Tokens already transferred to the election key in committed blocks.
    pub fn committed_votes(&self, election: &Transaction) -> Result<u64, ValidationError> {
        let election_id = election.id.ok_or_else(|| ValidationError::Schema {
            reason: "election has no id".into(),
        })?;
        let key = election_public_key(&election_id);
        let links = self.store.get_outputs_by_public_key(&key)?;
        let mut committed = 0u64;
        for link in links {
            let tx = self
                .store
                .get_transaction(&link.txid)?
                .ok_or_else(|| ValidationError::Store(format!("missing vote {}", link.txid)))?;
            if tx.asset.id() == Some(election_id) {
                committed += vote_amount(&tx, &key);
            }
        }
        Ok(committed)
    }

    /// Whether `current_votes` push the election across the threshold in
    /// this block, exactly once: concluded already-committed tallies never
    /// re-trigger, and a changed validator set voids the election.
    pub fn has_concluded(
        &self,
        election: &Transaction,
        current_votes: &[Transaction],
    ) -> Result<bool, ValidationError> {
        if election.operation == Operation::ChainMigrationElection
            && self.migration_in_progress()?
        {
            return Ok(false);
        }
        let election_id = election.id.ok_or_else(|| ValidationError::Schema {
            reason: "election has no id".into(),
        })?;
        if let Some(record) = self.store.get_election(&election_id)? {
            if let Some(change) = self.store.get_validator_change(None)? {
                if change.height >= record.height {
                    return Ok(false);
                }
            }
        }
        let key = election_public_key(&election_id);
        let total = Self::total_votes(election);
        let committed = self.committed_votes(election)?;
        let current: u64 = current_votes
            .iter()
            .filter(|tx| tx.operation.is_vote() && tx.asset.id() == Some(election_id))
            .map(|tx| vote_amount(tx, &key))
            .sum();

        let (num, den) = self.params.election_threshold;
        let required = (num * total).div_ceil(den);
        Ok(committed < required && committed + current >= required)
    }

    /// The current status of a committed election.
    pub fn get_status(&self, election: &Transaction) -> Result<ElectionStatus, ValidationError> {
        let election_id = election.id.ok_or_else(|| ValidationError::Schema {
            reason: "election has no id".into(),
        })?;
        let record = self.store.get_election(&election_id)?;
        if let Some(record) = record {
            if record.is_concluded {
                return Ok(ElectionStatus::Concluded);
            }
            if let Some(change) = self.store.get_validator_change(None)? {
                if change.height >= record.height {
                    return Ok(ElectionStatus::Inconclusive);
                }
            }
        }
        Ok(ElectionStatus::Ongoing)
    }

    /// Process the elections and votes of the block being committed at
    /// `new_height`. Must run before the block's transactions are durably
    /// stored, otherwise its votes would be tallied twice.
    ///
    /// Newly opened elections get an ongoing record at `new_height`; every
    /// election whose votes cross the threshold in this block concludes and
    /// takes effect, except that at most one validator-set update is
    /// applied per block.
    pub fn process_block(
        &self,
        new_height: u64,
        transactions: &[Transaction],
    ) -> Result<Vec<ElectionRecord>, ValidationError> {
        let mut records: Vec<ElectionRecord> = transactions
            .iter()
            .filter(|tx| tx.operation.is_election())
            .filter_map(|tx| tx.id)
            .map(|election_id| ElectionRecord {
                election_id,
                height: new_height,
                is_concluded: false,
            })
            .collect();

        let mut votes: BTreeMap<TransactionId, Vec<Transaction>> = BTreeMap::new();
        for tx in transactions {
            if tx.operation.is_vote() {
                if let Some(election_id) = tx.asset.id() {
                    votes.entry(election_id).or_default().push(tx.clone());
                }
            }
        }

        let mut validator_set_updated = false;
        for (election_id, election_votes) in votes {
            let election = match self.resolve_election(&election_id, transactions)? {
                Some(election) => election,
                None => {
                    warn!(%election_id, "votes for an unknown election, ignoring");
                    continue;
                }
            };
            if !self.has_concluded(&election, &election_votes)? {
                records.push(ElectionRecord {
                    election_id,
                    height: new_height,
                    is_concluded: false,
                });
                continue;
            }
            if election.operation == Operation::ValidatorElection {
                // One validator-set change per block; a second concluded
                // election in the same block stays open.
                if validator_set_updated {
                    debug!(%election_id, "validator set already updated in this block");
                    records.push(ElectionRecord {
                        election_id,
                        height: new_height,
                        is_concluded: false,
                    });
                    continue;
                }
                self.approve_validator_update(&election, new_height)?;
                validator_set_updated = true;
            } else {
                self.approve_migration(new_height)?;
            }
            info!(%election_id, height = new_height, "election concluded");
            records.push(ElectionRecord {
                election_id,
                height: new_height,
                is_concluded: true,
            });
        }

        self.store.store_elections(&records)?;
        Ok(records)
    }

    /// Undo the election effects of an uncommitted block at `new_height`.
    pub fn rollback(&self, new_height: u64) -> Result<(), ValidationError> {
        self.store.delete_elections(new_height)?;
        if let Some(change) = self.store.get_validator_change(None)? {
            if change.height == new_height + 1 && change.election_id.is_some() {
                self.store.delete_validator_set(new_height + 1)?;
            }
        }
        Ok(())
    }

    fn resolve_election(
        &self,
        election_id: &TransactionId,
        transactions: &[Transaction],
    ) -> Result<Option<Transaction>, ValidationError> {
        let from_block = transactions
            .iter()
            .find(|tx| tx.id == Some(*election_id) && tx.operation.is_election())
            .cloned();
        match from_block {
            Some(tx) => Ok(Some(tx)),
            None => {
                let tx = self.store.get_transaction(election_id)?;
                Ok(tx.filter(|tx| tx.operation.is_election()))
            }
        }
    }

    fn approve_validator_update(
        &self,
        election: &Transaction,
        new_height: u64,
    ) -> Result<(), ValidationError> {
        let election_id = election.id.ok_or_else(|| ValidationError::Schema {
            reason: "election has no id".into(),
        })?;
        let update = ValidatorUpdate::from_election(election)?;
        let mut validators: Vec<Validator> = self
            .store
            .get_validators(None)?
            .into_iter()
            .filter(|validator| validator.public_key != update.public_key)
            .collect();
        if update.power > 0 {
            validators.push(Validator {
                public_key: update.public_key,
                voting_power: update.power,
            });
        }
        self.store.store_validator_set(ValidatorChange {
            height: new_height + 1,
            validators,
            election_id: Some(election_id),
        })?;
        Ok(())
    }

    fn migration_in_progress(&self) -> Result<bool, ValidationError> {
        Ok(self
            .store
            .get_latest_chain()?
            .is_some_and(|chain| !chain.is_synced))
    }

    fn approve_migration(&self, new_height: u64) -> Result<(), ValidationError> {
        let chain = self.store.get_latest_chain()?.ok_or_else(|| {
            ValidationError::Store("no chain record to migrate".into())
        })?;
        let base = match chain.chain_id.find("-migrated-at-height-") {
            Some(pos) => &chain.chain_id[..pos],
            None => chain.chain_id.as_str(),
        };
        self.store.store_chain(ChainRecord {
            height: new_height + 1,
            chain_id: format!("{base}-migrated-at-height-{new_height}"),
            is_synced: false,
        })?;
        Ok(())
    }
}

/// Do the election outputs assign power exactly as the validator set holds
/// it? Order-insensitive comparison of `(public_key, power)` pairs.
fn same_topology(validators: &[Validator], election: &Transaction) -> bool {
    let expected: BTreeSet<(PublicKey, u64)> = validators
        .iter()
        .map(|validator| (validator.public_key, validator.voting_power))
        .collect();
    if election.outputs.len() != validators.len() {
        return false;
    }
    let actual: BTreeSet<(PublicKey, u64)> = election
        .outputs
        .iter()
        .filter_map(|output| match output.public_keys.as_slice() {
            [key] => Some((*key, output.amount.value())),
            _ => None,
        })
        .collect();
    expected == actual
}

fn vote_amount(tx: &Transaction, election_key: &PublicKey) -> u64 {
    tx.outputs
        .iter()
        .filter(|output| output.public_keys == [*election_key])
        .map(|output| output.amount.value())
        .sum()
}
