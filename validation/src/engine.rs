//! The validation engine proper.

use crate::{AssetPolicy, AssetType, StandardPolicy};
use lattice_store::TransactionStore;
use lattice_transactions::Transaction;
use lattice_types::{Amount, ProtocolParams, TransactionId, ValidationError};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Validates transactions against protocol parameters, an asset policy,
/// and a ledger view.
///
/// The check order is fixed: structural shape, id hash, and fulfillment
/// signatures run first and touch no storage; duplicate detection, spend
/// resolution, asset lineage, and amount conservation follow, each with
/// the most specific applicable error.
pub struct TransactionValidator<P = StandardPolicy> {
    params: ProtocolParams,
    policy: P,
}

impl TransactionValidator<StandardPolicy> {
    pub fn new(params: ProtocolParams) -> Self {
        Self {
            params,
            policy: StandardPolicy,
        }
    }
}

impl<P: AssetPolicy> TransactionValidator<P> {
    pub fn with_policy(params: ProtocolParams, policy: P) -> Self {
        Self { params, policy }
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    /// Validate one transaction.
    ///
    /// `current_transactions` are the transactions already accepted earlier
    /// in the same block, excluding `tx` itself; they count for duplicate
    /// and double-spend detection before anything is durably committed.
    pub fn validate_transaction<S: TransactionStore>(
        &self,
        store: &S,
        tx: &Transaction,
        current_transactions: &[Transaction],
    ) -> Result<(), ValidationError> {
        tx.validate_structure(&self.params)?;
        tx.validate_id()?;
        tx.fulfillments_valid()?;
        let id = tx.id.ok_or_else(|| ValidationError::Schema {
            reason: "transaction has no id".into(),
        })?;

        if store.is_committed(&id)?
            || current_transactions.iter().any(|other| other.id == Some(id))
        {
            debug!(txid = %id, "rejecting duplicate transaction");
            return Err(ValidationError::DuplicateTransaction { txid: id.to_hex() });
        }

        if tx.operation.is_create_like() {
            return Ok(());
        }
        self.validate_transfer(store, tx, id, current_transactions)
    }

    /// Validate a whole block left-to-right, each transaction seeing the
    /// previously accepted ones.
    pub fn validate_block<S: TransactionStore>(
        &self,
        store: &S,
        transactions: &[Transaction],
    ) -> Result<(), ValidationError> {
        let mut accepted: Vec<Transaction> = Vec::with_capacity(transactions.len());
        for tx in transactions {
            self.validate_transaction(store, tx, &accepted)?;
            accepted.push(tx.clone());
        }
        Ok(())
    }

    fn validate_transfer<S: TransactionStore>(
        &self,
        store: &S,
        tx: &Transaction,
        id: TransactionId,
        current_transactions: &[Transaction],
    ) -> Result<(), ValidationError> {
        let declared_asset = tx.asset.id().ok_or_else(|| ValidationError::Schema {
            reason: "transfer carries no asset link".into(),
        })?;

        let mut spent_amounts: Vec<Amount> = Vec::with_capacity(tx.inputs.len());
        let mut lineages: BTreeSet<TransactionId> = BTreeSet::new();
        let mut spent_links: BTreeSet<(TransactionId, usize)> = BTreeSet::new();

        for (index, input) in tx.inputs.iter().enumerate() {
            let link = input.fulfills.ok_or_else(|| ValidationError::Schema {
                reason: format!("input {index} of a transfer must fulfill an output"),
            })?;
            // The per-output spend check below only sees other transactions,
            // so spending the same output through two inputs of this one
            // has to be caught here.
            if !spent_links.insert((link.txid, link.output)) {
                warn!(txid = %id, input = index, "rejecting output spent twice by one transaction");
                return Err(ValidationError::DoubleSpend { txid: id.to_hex() });
            }
            let input_tx = resolve(store, current_transactions, &link.txid)?.ok_or_else(|| {
                ValidationError::InputDoesNotExist {
                    txid: link.txid.to_hex(),
                    output: link.output,
                }
            })?;
            let spent_output = input_tx.outputs.get(link.output).ok_or_else(|| {
                ValidationError::InputDoesNotExist {
                    txid: link.txid.to_hex(),
                    output: link.output,
                }
            })?;

            if store
                .get_spent(&link.txid, link.output, current_transactions)?
                .is_some()
            {
                warn!(txid = %id, input = index, "rejecting double spend");
                return Err(ValidationError::DoubleSpend { txid: id.to_hex() });
            }

            let fulfillment = input.fulfillment.as_ref().ok_or_else(|| {
                ValidationError::InvalidSignature {
                    reason: format!("input {index} is missing a fulfillment"),
                }
            })?;
            if fulfillment.condition_uri() != spent_output.condition_uri() {
                return Err(ValidationError::InvalidSignature {
                    reason: format!(
                        "input {index} does not fulfill the condition of the output it spends"
                    ),
                });
            }

            let lineage = input_tx
                .asset_id()
                .ok_or_else(|| ValidationError::AssetIdMismatch)?;
            lineages.insert(lineage);
            spent_amounts.push(spent_output.amount);
        }

        let governing_type = self.resolve_lineages(
            store,
            current_transactions,
            &lineages,
            declared_asset,
        )?;

        let spent =
            Amount::checked_sum(spent_amounts).ok_or_else(|| ValidationError::Amount {
                reason: "sum of input amounts overflows".into(),
            })?;
        let locked = Amount::checked_sum(tx.outputs.iter().map(|o| o.amount)).ok_or_else(|| {
            ValidationError::Amount {
                reason: "sum of output amounts overflows".into(),
            }
        })?;
        self.policy.validate(governing_type, spent, locked)?;

        debug!(txid = %id, spent, locked, "transfer accepted");
        Ok(())
    }

    /// Check the asset lineages a transfer combines and return the asset
    /// type governing its amount rules.
    ///
    /// A single lineage must match the declared asset link; multiple
    /// lineages are only allowed when every involved asset declared itself
    /// `mix` and the declared link names one of them.
    fn resolve_lineages<S: TransactionStore>(
        &self,
        store: &S,
        current_transactions: &[Transaction],
        lineages: &BTreeSet<TransactionId>,
        declared_asset: TransactionId,
    ) -> Result<AssetType, ValidationError> {
        if lineages.len() == 1 && lineages.contains(&declared_asset) {
            let create = self.resolve_create(store, current_transactions, &declared_asset)?;
            return AssetType::of(&create);
        }
        if !lineages.contains(&declared_asset) {
            return Err(ValidationError::AssetIdMismatch);
        }
        for lineage in lineages {
            let create = self.resolve_create(store, current_transactions, lineage)?;
            if AssetType::of(&create)? != AssetType::Mix {
                return Err(ValidationError::AssetIdMismatch);
            }
        }
        Ok(AssetType::Mix)
    }

    fn resolve_create<S: TransactionStore>(
        &self,
        store: &S,
        current_transactions: &[Transaction],
        asset_id: &TransactionId,
    ) -> Result<Transaction, ValidationError> {
        let from_current = current_transactions
            .iter()
            .find(|tx| tx.id == Some(*asset_id) && tx.operation.is_create_like())
            .cloned();
        let create = match from_current {
            Some(tx) => Some(tx),
            None => store.get_asset(asset_id)?,
        };
        create.ok_or_else(|| {
            // Outputs of this asset exist, so a missing CREATE is an index
            // inconsistency, not a user error.
            ValidationError::Store(format!("asset `{asset_id}` has no originating transaction"))
        })
    }
}

fn resolve<S: TransactionStore>(
    store: &S,
    current_transactions: &[Transaction],
    txid: &TransactionId,
) -> Result<Option<Transaction>, ValidationError> {
    let from_current = current_transactions
        .iter()
        .find(|tx| tx.id == Some(*txid))
        .cloned();
    match from_current {
        Some(tx) => Ok(Some(tx)),
        None => Ok(store.get_transaction(txid)?),
    }
}
