//! Thread-safe in-memory storage backend.
//!
//! Used by tests and tooling; also the reference implementation of the
//! index semantics a durable backend must provide.

use crate::{
    BlockRecord, BlockStore, ChainRecord, ChainStore, ElectionRecord, ElectionStore, StoreError,
    TransactionStore, ValidatorChange, ValidatorStore,
};
use lattice_transactions::{Transaction, TransactionLink};
use lattice_types::{PublicKey, TransactionId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// An in-memory ledger implementing every storage trait.
pub struct MemoryLedger {
    transactions: Mutex<HashMap<TransactionId, Transaction>>,
    /// Spend index: output link -> ids of committed spenders.
    spenders: Mutex<HashMap<TransactionLink, Vec<TransactionId>>>,
    /// Ownership index: public key -> outputs mentioning it.
    outputs: Mutex<HashMap<PublicKey, Vec<TransactionLink>>>,
    validator_changes: Mutex<BTreeMap<u64, ValidatorChange>>,
    elections: Mutex<Vec<ElectionRecord>>,
    chains: Mutex<Vec<ChainRecord>>,
    blocks: Mutex<BTreeMap<u64, BlockRecord>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            transactions: Mutex::new(HashMap::new()),
            spenders: Mutex::new(HashMap::new()),
            outputs: Mutex::new(HashMap::new()),
            validator_changes: Mutex::new(BTreeMap::new()),
            elections: Mutex::new(Vec::new()),
            chains: Mutex::new(Vec::new()),
            blocks: Mutex::new(BTreeMap::new()),
        }
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionStore for MemoryLedger {
    fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>, StoreError> {
        Ok(self.transactions.lock().unwrap().get(id).cloned())
    }

    fn store_transactions(&self, transactions: &[Transaction]) -> Result<(), StoreError> {
        let mut txs = self.transactions.lock().unwrap();
        let mut spenders = self.spenders.lock().unwrap();
        let mut outputs = self.outputs.lock().unwrap();
        for tx in transactions {
            let id = tx.id.ok_or_else(|| {
                StoreError::Serialization("cannot store an unsigned transaction".into())
            })?;
            for input in &tx.inputs {
                if let Some(link) = input.fulfills {
                    spenders.entry(link).or_default().push(id);
                }
            }
            for (index, output) in tx.outputs.iter().enumerate() {
                let link = TransactionLink::new(id, index);
                for key in &output.public_keys {
                    outputs.entry(*key).or_default().push(link);
                }
            }
            txs.insert(id, tx.clone());
        }
        Ok(())
    }

    fn get_spending_transactions(
        &self,
        txid: &TransactionId,
        output: usize,
    ) -> Result<Vec<Transaction>, StoreError> {
        let link = TransactionLink::new(*txid, output);
        let spender_ids = self
            .spenders
            .lock()
            .unwrap()
            .get(&link)
            .cloned()
            .unwrap_or_default();
        let txs = self.transactions.lock().unwrap();
        spender_ids
            .iter()
            .map(|id| {
                txs.get(id).cloned().ok_or_else(|| {
                    StoreError::Corruption(format!(
                        "spend index references unknown transaction {id}"
                    ))
                })
            })
            .collect()
    }

    fn get_asset(&self, asset_id: &TransactionId) -> Result<Option<Transaction>, StoreError> {
        let tx = self.transactions.lock().unwrap().get(asset_id).cloned();
        Ok(tx.filter(|tx| tx.operation.is_create_like()))
    }

    fn get_outputs_by_public_key(
        &self,
        public_key: &PublicKey,
    ) -> Result<Vec<TransactionLink>, StoreError> {
        Ok(self
            .outputs
            .lock()
            .unwrap()
            .get(public_key)
            .cloned()
            .unwrap_or_default())
    }
}

impl ValidatorStore for MemoryLedger {
    fn store_validator_set(&self, change: ValidatorChange) -> Result<(), StoreError> {
        self.validator_changes
            .lock()
            .unwrap()
            .insert(change.height, change);
        Ok(())
    }

    fn delete_validator_set(&self, height: u64) -> Result<(), StoreError> {
        self.validator_changes.lock().unwrap().remove(&height);
        Ok(())
    }

    fn get_validator_change(
        &self,
        height: Option<u64>,
    ) -> Result<Option<ValidatorChange>, StoreError> {
        let changes = self.validator_changes.lock().unwrap();
        let change = match height {
            Some(h) => changes.range(..=h).next_back(),
            None => changes.iter().next_back(),
        };
        Ok(change.map(|(_, change)| change.clone()))
    }
}

impl ElectionStore for MemoryLedger {
    fn store_elections(&self, records: &[ElectionRecord]) -> Result<(), StoreError> {
        self.elections.lock().unwrap().extend_from_slice(records);
        Ok(())
    }

    fn delete_elections(&self, height: u64) -> Result<(), StoreError> {
        self.elections
            .lock()
            .unwrap()
            .retain(|record| record.height != height);
        Ok(())
    }

    fn get_election(&self, id: &TransactionId) -> Result<Option<ElectionRecord>, StoreError> {
        Ok(self
            .elections
            .lock()
            .unwrap()
            .iter()
            .filter(|record| record.election_id == *id)
            .max_by_key(|record| record.height)
            .copied())
    }
}

impl ChainStore for MemoryLedger {
    fn store_chain(&self, chain: ChainRecord) -> Result<(), StoreError> {
        self.chains.lock().unwrap().push(chain);
        Ok(())
    }

    fn get_latest_chain(&self) -> Result<Option<ChainRecord>, StoreError> {
        let chains = self.chains.lock().unwrap();
        Ok(chains
            .iter()
            .max_by_key(|chain| chain.height)
            .cloned())
    }
}

impl BlockStore for MemoryLedger {
    fn store_block(&self, block: BlockRecord) -> Result<(), StoreError> {
        self.blocks.lock().unwrap().insert(block.height, block);
        Ok(())
    }

    fn get_block(&self, height: u64) -> Result<Option<BlockRecord>, StoreError> {
        Ok(self.blocks.lock().unwrap().get(&height).cloned())
    }

    fn get_latest_block(&self) -> Result<Option<BlockRecord>, StoreError> {
        let blocks = self.blocks.lock().unwrap();
        Ok(blocks.iter().next_back().map(|(_, block)| block.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Validator;
    use lattice_crypto::keypair_from_seed;
    use lattice_types::{Amount, KeyPair, ValidationError};

    fn pair(n: u8) -> KeyPair {
        keypair_from_seed(&[n; 32])
    }

    fn signed_create(seed: u8, value: u64) -> Transaction {
        let kp = pair(seed);
        let mut tx = Transaction::create(
            &[kp.public],
            &[(vec![kp.public.into()], Amount::new(value).unwrap())],
            None,
            None,
        )
        .unwrap();
        tx.sign(std::slice::from_ref(&kp.private)).unwrap();
        tx
    }

    fn signed_transfer(create: &Transaction, from: u8, to: u8) -> Transaction {
        let from = pair(from);
        let to = pair(to);
        let mut tx = Transaction::transfer(
            create.to_inputs().unwrap(),
            &[(vec![to.public.into()], create.outputs[0].amount)],
            create.id.unwrap(),
            None,
        )
        .unwrap();
        tx.sign(std::slice::from_ref(&from.private)).unwrap();
        tx
    }

    #[test]
    fn store_and_get_transaction() {
        let ledger = MemoryLedger::new();
        let tx = signed_create(1, 10);
        ledger.store_transactions(std::slice::from_ref(&tx)).unwrap();
        assert_eq!(ledger.get_transaction(&tx.id.unwrap()).unwrap(), Some(tx));
    }

    #[test]
    fn is_committed_reflects_storage() {
        let ledger = MemoryLedger::new();
        let tx = signed_create(1, 10);
        assert!(!ledger.is_committed(&tx.id.unwrap()).unwrap());
        ledger.store_transactions(std::slice::from_ref(&tx)).unwrap();
        assert!(ledger.is_committed(&tx.id.unwrap()).unwrap());
    }

    #[test]
    fn get_spent_finds_the_committed_spender() {
        let ledger = MemoryLedger::new();
        let create = signed_create(1, 10);
        let transfer = signed_transfer(&create, 1, 2);
        ledger
            .store_transactions(&[create.clone(), transfer.clone()])
            .unwrap();
        let spender = ledger.get_spent(&create.id.unwrap(), 0, &[]).unwrap();
        assert_eq!(spender, Some(transfer));
        assert_eq!(ledger.get_spent(&create.id.unwrap(), 1, &[]).unwrap(), None);
    }

    #[test]
    fn conflicting_current_transaction_is_a_double_spend() {
        let ledger = MemoryLedger::new();
        let create = signed_create(1, 10);
        let committed = signed_transfer(&create, 1, 2);
        ledger
            .store_transactions(&[create.clone(), committed])
            .unwrap();
        let competing = signed_transfer(&create, 1, 3);
        let err = ledger
            .get_spent(&create.id.unwrap(), 0, &[competing])
            .unwrap_err();
        assert!(matches!(err, ValidationError::DoubleSpend { .. }));
    }

    #[test]
    fn two_committed_spenders_is_critical() {
        let ledger = MemoryLedger::new();
        let create = signed_create(1, 10);
        let spend_a = signed_transfer(&create, 1, 2);
        let spend_b = signed_transfer(&create, 1, 3);
        ledger
            .store_transactions(&[create.clone(), spend_a, spend_b])
            .unwrap();
        let err = ledger.get_spent(&create.id.unwrap(), 0, &[]).unwrap_err();
        assert!(matches!(err, ValidationError::CriticalDoubleSpend { .. }));
    }

    #[test]
    fn outputs_filtered_by_spent_status() {
        let ledger = MemoryLedger::new();
        let owner = pair(1);
        let spent_create = signed_create(1, 10);
        let unspent_create = {
            let mut tx = Transaction::create(
                &[owner.public],
                &[(vec![owner.public.into()], Amount::new(5).unwrap())],
                Some(serde_json::json!({"n": 2})),
                None,
            )
            .unwrap();
            tx.sign(std::slice::from_ref(&owner.private)).unwrap();
            tx
        };
        let transfer = signed_transfer(&spent_create, 1, 2);
        ledger
            .store_transactions(&[spent_create.clone(), unspent_create.clone(), transfer])
            .unwrap();

        let unspent = ledger
            .get_outputs_filtered(&owner.public, Some(false))
            .unwrap();
        assert_eq!(
            unspent,
            vec![TransactionLink::new(unspent_create.id.unwrap(), 0)]
        );
        let spent = ledger
            .get_outputs_filtered(&owner.public, Some(true))
            .unwrap();
        assert_eq!(
            spent,
            vec![TransactionLink::new(spent_create.id.unwrap(), 0)]
        );
        assert_eq!(
            ledger.get_outputs_filtered(&owner.public, None).unwrap().len(),
            2
        );
    }

    #[test]
    fn get_asset_only_returns_creates() {
        let ledger = MemoryLedger::new();
        let create = signed_create(1, 10);
        let transfer = signed_transfer(&create, 1, 2);
        ledger
            .store_transactions(&[create.clone(), transfer.clone()])
            .unwrap();
        assert_eq!(ledger.get_asset(&create.id.unwrap()).unwrap(), Some(create));
        assert_eq!(ledger.get_asset(&transfer.id.unwrap()).unwrap(), None);
    }

    #[test]
    fn validator_set_versioned_by_height() {
        let ledger = MemoryLedger::new();
        let v1 = Validator {
            public_key: pair(1).public,
            voting_power: 10,
        };
        let v2 = Validator {
            public_key: pair(2).public,
            voting_power: 20,
        };
        ledger
            .store_validator_set(ValidatorChange {
                height: 1,
                validators: vec![v1],
                election_id: None,
            })
            .unwrap();
        ledger
            .store_validator_set(ValidatorChange {
                height: 5,
                validators: vec![v1, v2],
                election_id: None,
            })
            .unwrap();

        assert_eq!(ledger.get_validators(Some(3)).unwrap(), vec![v1]);
        assert_eq!(ledger.get_validators(Some(5)).unwrap(), vec![v1, v2]);
        assert_eq!(ledger.get_validators(None).unwrap(), vec![v1, v2]);
        assert!(ledger.get_validators(Some(0)).unwrap().is_empty());

        ledger.delete_validator_set(5).unwrap();
        assert_eq!(ledger.get_validators(None).unwrap(), vec![v1]);
    }

    #[test]
    fn election_records_latest_wins_and_rollback() {
        let ledger = MemoryLedger::new();
        let id = TransactionId::new([7u8; 32]);
        ledger
            .store_elections(&[ElectionRecord {
                election_id: id,
                height: 3,
                is_concluded: false,
            }])
            .unwrap();
        ledger
            .store_elections(&[ElectionRecord {
                election_id: id,
                height: 8,
                is_concluded: true,
            }])
            .unwrap();
        assert!(ledger.get_election(&id).unwrap().unwrap().is_concluded);

        ledger.delete_elections(8).unwrap();
        let record = ledger.get_election(&id).unwrap().unwrap();
        assert_eq!(record.height, 3);
        assert!(!record.is_concluded);
    }

    #[test]
    fn latest_block_and_chain() {
        let ledger = MemoryLedger::new();
        assert!(ledger.get_latest_block().unwrap().is_none());
        ledger
            .store_block(BlockRecord {
                height: 1,
                app_hash: "aa".into(),
                transaction_ids: vec![],
            })
            .unwrap();
        ledger
            .store_block(BlockRecord {
                height: 2,
                app_hash: "bb".into(),
                transaction_ids: vec![],
            })
            .unwrap();
        assert_eq!(ledger.get_latest_block().unwrap().unwrap().height, 2);
        assert_eq!(ledger.get_block(1).unwrap().unwrap().app_hash, "aa");

        ledger
            .store_chain(ChainRecord {
                height: 0,
                chain_id: "lattice-1".into(),
                is_synced: true,
            })
            .unwrap();
        assert_eq!(
            ledger.get_latest_chain().unwrap().unwrap().chain_id,
            "lattice-1"
        );
    }
}
