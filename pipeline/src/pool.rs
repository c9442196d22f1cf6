//! The validation worker pool.

use lattice_store::TransactionStore;
use lattice_transactions::Transaction;
use lattice_types::{ProtocolParams, TransactionId, ValidationError};
use lattice_utils::StatsCounter;
use lattice_validation::TransactionValidator;
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// What the pool sends to a worker.
pub enum WorkerMessage {
    /// Validate one transaction; `index` is its position in the batch.
    Validate {
        index: usize,
        tx: Box<Transaction>,
    },
    /// Forget everything accepted since the last reset.
    Reset,
    /// Stop the worker thread.
    Exit,
}

/// A pool of validation workers partitioned by asset lineage.
///
/// Each transaction is routed by its asset id, so all spends of one asset
/// land on the same worker in submission order. A worker keeps the
/// transactions it accepted since the last [`reset`](Self::reset) and
/// counts them as in-flight state for duplicate and double-spend checks,
/// which makes intra-batch double spends visible without any shared locks.
pub struct ParallelValidator<S> {
    store: Arc<S>,
    senders: Vec<Sender<WorkerMessage>>,
    results: Receiver<(usize, Result<Transaction, ValidationError>)>,
    handles: Vec<JoinHandle<()>>,
    stats: Arc<StatsCounter>,
}

impl<S> ParallelValidator<S>
where
    S: TransactionStore + Send + Sync + 'static,
{
    pub fn new(store: Arc<S>, params: ProtocolParams, workers: usize) -> Self {
        assert!(workers > 0, "worker pool needs at least one worker");
        let (result_tx, results) = mpsc::channel();
        let stats = Arc::new(StatsCounter::new(&["accepted", "rejected"]));
        let mut senders = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let (sender, receiver) = mpsc::channel();
            let worker_store = Arc::clone(&store);
            let worker_results = result_tx.clone();
            let worker_params = params.clone();
            let worker_stats = Arc::clone(&stats);
            handles.push(std::thread::spawn(move || {
                worker_loop(
                    worker_store,
                    worker_params,
                    receiver,
                    worker_results,
                    worker_stats,
                );
            }));
            senders.push(sender);
        }
        Self {
            store,
            senders,
            results,
            handles,
            stats,
        }
    }

    /// Which worker a transaction belongs to. Transactions without an
    /// asset id (unsigned create-likes) all go to worker zero; they will
    /// be rejected there for having no id.
    fn route(&self, tx: &Transaction) -> usize {
        match tx.routing_id() {
            Some(asset_id) => {
                let bytes = asset_id.as_bytes();
                let mut prefix = [0u8; 8];
                prefix.copy_from_slice(&bytes[..8]);
                (u64::from_be_bytes(prefix) % self.senders.len() as u64) as usize
            }
            None => 0,
        }
    }

    /// Validate a batch in parallel, returning one result per input in
    /// the input order. Accepted transactions stay counted as in-flight
    /// state until [`reset`](Self::reset).
    pub fn validate(
        &self,
        transactions: Vec<Transaction>,
    ) -> Result<Vec<Result<Transaction, ValidationError>>, ValidationError> {
        let total = transactions.len();
        for (index, tx) in transactions.into_iter().enumerate() {
            let worker = self.route(&tx);
            self.senders[worker]
                .send(WorkerMessage::Validate {
                    index,
                    tx: Box::new(tx),
                })
                .map_err(|_| worker_gone())?;
        }

        let mut ordered: Vec<Option<Result<Transaction, ValidationError>>> = Vec::new();
        ordered.resize_with(total, || None);
        for _ in 0..total {
            let (index, result) = self.results.recv().map_err(|_| worker_gone())?;
            ordered[index] = Some(result);
        }
        ordered
            .into_iter()
            .map(|slot| slot.ok_or_else(worker_gone))
            .collect()
    }

    /// Drop all in-flight state, e.g. after a block was committed or
    /// discarded.
    pub fn reset(&self) -> Result<(), ValidationError> {
        for sender in &self.senders {
            sender.send(WorkerMessage::Reset).map_err(|_| worker_gone())?;
        }
        Ok(())
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Lifetime accepted/rejected counts across all workers.
    pub fn stats(&self) -> &StatsCounter {
        &self.stats
    }
}

impl<S> Drop for ParallelValidator<S> {
    fn drop(&mut self) {
        for sender in &self.senders {
            // A worker that already panicked has hung up; nothing to do.
            let _ = sender.send(WorkerMessage::Exit);
        }
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                warn!("validation worker panicked");
            }
        }
    }
}

fn worker_gone() -> ValidationError {
    ValidationError::Store("validation worker disconnected".into())
}

fn worker_loop<S: TransactionStore>(
    store: Arc<S>,
    params: ProtocolParams,
    receiver: Receiver<WorkerMessage>,
    results: Sender<(usize, Result<Transaction, ValidationError>)>,
    stats: Arc<StatsCounter>,
) {
    let validator = TransactionValidator::new(params);
    // Accepted transactions since the last reset, grouped by asset.
    let mut accepted: HashMap<TransactionId, Vec<Transaction>> = HashMap::new();
    while let Ok(message) = receiver.recv() {
        match message {
            WorkerMessage::Validate { index, tx } => {
                let bucket = tx
                    .routing_id()
                    .and_then(|asset_id| accepted.get(&asset_id))
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                let result = validator
                    .validate_transaction(store.as_ref(), &tx, bucket)
                    .map(|()| *tx);
                match &result {
                    Ok(tx) => {
                        stats.increment("accepted");
                        if let Some(asset_id) = tx.routing_id() {
                            accepted.entry(asset_id).or_default().push(tx.clone());
                        }
                    }
                    Err(_) => stats.increment("rejected"),
                }
                if results.send((index, result)).is_err() {
                    break;
                }
            }
            WorkerMessage::Reset => {
                debug!(assets = accepted.len(), "clearing in-flight validation state");
                accepted.clear();
            }
            WorkerMessage::Exit => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_crypto::keypair_from_seed;
    use lattice_store::{MemoryLedger, TransactionStore as _};
    use lattice_types::{Amount, KeyPair};

    fn alice() -> KeyPair {
        keypair_from_seed(&[1u8; 32])
    }

    fn bob() -> KeyPair {
        keypair_from_seed(&[2u8; 32])
    }

    fn signed_create(seed: u8, value: u64) -> Transaction {
        let kp = keypair_from_seed(&[seed; 32]);
        let mut tx = Transaction::create(
            &[kp.public],
            &[(vec![kp.public.into()], Amount::new(value).unwrap())],
            Some(serde_json::json!({ "seed": seed })),
            None,
        )
        .unwrap();
        tx.sign(std::slice::from_ref(&kp.private)).unwrap();
        tx
    }

    fn transfer_to(signer: &KeyPair, create: &Transaction, to: &KeyPair, value: u64) -> Transaction {
        let mut tx = Transaction::transfer(
            create.to_inputs().unwrap(),
            &[(vec![to.public.into()], Amount::new(value).unwrap())],
            create.asset_id().unwrap(),
            None,
        )
        .unwrap();
        tx.sign(std::slice::from_ref(&signer.private)).unwrap();
        tx
    }

    fn pool(ledger: Arc<MemoryLedger>, workers: usize) -> ParallelValidator<MemoryLedger> {
        lattice_utils::init_tracing();
        ParallelValidator::new(ledger, ProtocolParams::default(), workers)
    }

    #[test]
    fn batch_results_come_back_in_input_order() {
        let ledger = Arc::new(MemoryLedger::new());
        let validator = pool(Arc::clone(&ledger), 4);

        let batch: Vec<Transaction> = (1..=8).map(|n| signed_create(n, 10)).collect();
        let ids: Vec<_> = batch.iter().map(|tx| tx.id.unwrap()).collect();
        let results = validator.validate(batch).unwrap();
        assert_eq!(results.len(), 8);
        for (result, id) in results.iter().zip(ids) {
            assert_eq!(result.as_ref().unwrap().id, Some(id));
        }
        assert_eq!(validator.stats().get("accepted"), 8);
        assert_eq!(validator.stats().get("rejected"), 0);
    }

    #[test]
    fn intra_batch_double_spend_is_caught() {
        let ledger = Arc::new(MemoryLedger::new());
        let create = signed_create(1, 10);
        ledger.store_transactions(&[create.clone()]).unwrap();

        let validator = pool(Arc::clone(&ledger), 4);
        let spend_a = transfer_to(&alice(), &create, &bob(), 10);
        let spend_b = {
            let mut tx = Transaction::transfer(
                create.to_inputs().unwrap(),
                &[(vec![alice().public.into()], Amount::new(10).unwrap())],
                create.asset_id().unwrap(),
                Some(serde_json::json!({ "note": "second spend" })),
            )
            .unwrap();
            tx.sign(std::slice::from_ref(&alice().private)).unwrap();
            tx
        };

        let results = validator.validate(vec![spend_a, spend_b]).unwrap();
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(ValidationError::DoubleSpend { .. })
        ));
    }

    #[test]
    fn reset_forgets_in_flight_spends() {
        let ledger = Arc::new(MemoryLedger::new());
        let create = signed_create(1, 10);
        ledger.store_transactions(&[create.clone()]).unwrap();

        let validator = pool(Arc::clone(&ledger), 2);
        let spend = transfer_to(&alice(), &create, &bob(), 10);

        let first = validator.validate(vec![spend.clone()]).unwrap();
        assert!(first[0].is_ok());
        // Still in flight: the same transaction is now a duplicate.
        let again = validator.validate(vec![spend.clone()]).unwrap();
        assert!(matches!(
            again[0],
            Err(ValidationError::DuplicateTransaction { .. })
        ));

        validator.reset().unwrap();
        let fresh = validator.validate(vec![spend]).unwrap();
        assert!(fresh[0].is_ok());
    }

    #[test]
    fn create_and_spend_in_one_batch() {
        let ledger = Arc::new(MemoryLedger::new());
        let validator = pool(Arc::clone(&ledger), 3);

        let create = signed_create(1, 10);
        let spend = transfer_to(&alice(), &create, &bob(), 10);
        // Same asset id, so both route to the same worker in order.
        let results = validator.validate(vec![create, spend]).unwrap();
        assert!(results[0].is_ok());
        assert!(results[1].is_ok(), "{:?}", results[1]);
    }

    #[test]
    fn single_worker_pool_behaves_like_validate_block() {
        let ledger = Arc::new(MemoryLedger::new());
        let validator = pool(Arc::clone(&ledger), 1);
        let batch: Vec<Transaction> = (1..=3).map(|n| signed_create(n, 5)).collect();
        let results = validator.validate(batch).unwrap();
        assert!(results.iter().all(Result::is_ok));
    }
}
