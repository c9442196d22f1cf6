//! Transaction and output storage.

use crate::StoreError;
use lattice_transactions::{Transaction, TransactionLink};
use lattice_types::{PublicKey, TransactionId, ValidationError};

/// Committed-transaction storage, plus the output indexes the validation
/// engine and output queries run on.
pub trait TransactionStore {
    /// Retrieve a committed transaction by id.
    fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>, StoreError>;

    /// Durably store a batch of validated transactions, updating the spend
    /// and ownership indexes.
    fn store_transactions(&self, transactions: &[Transaction]) -> Result<(), StoreError>;

    /// All committed transactions spending the given output. More than one
    /// entry means the ledger is already inconsistent.
    fn get_spending_transactions(
        &self,
        txid: &TransactionId,
        output: usize,
    ) -> Result<Vec<Transaction>, StoreError>;

    /// The CREATE-like transaction that issued an asset.
    fn get_asset(&self, asset_id: &TransactionId) -> Result<Option<Transaction>, StoreError>;

    /// Links to every output whose condition mentions `public_key`.
    fn get_outputs_by_public_key(
        &self,
        public_key: &PublicKey,
    ) -> Result<Vec<TransactionLink>, StoreError>;

    /// Whether a transaction with this id is already committed.
    fn is_committed(&self, id: &TransactionId) -> Result<bool, StoreError> {
        Ok(self.get_transaction(id)?.is_some())
    }

    /// Resolve who spends `txid:output`, considering both the durable
    /// ledger and the `current_transactions` of the block being validated.
    ///
    /// Two durable spenders mean the invariant is already broken
    /// (`CriticalDoubleSpend`); a durable spender plus a current one, or two
    /// current ones, is an ordinary rejectable `DoubleSpend`.
    fn get_spent(
        &self,
        txid: &TransactionId,
        output: usize,
        current_transactions: &[Transaction],
    ) -> Result<Option<Transaction>, ValidationError> {
        let durable = self.get_spending_transactions(txid, output)?;
        if durable.len() > 1 {
            return Err(ValidationError::CriticalDoubleSpend {
                txid: txid.to_hex(),
            });
        }
        let link = TransactionLink::new(*txid, output);
        let mut current: Vec<&Transaction> = current_transactions
            .iter()
            .filter(|tx| tx.inputs.iter().any(|input| input.fulfills == Some(link)))
            .collect();
        if durable.len() + current.len() > 1 {
            return Err(ValidationError::DoubleSpend {
                txid: txid.to_hex(),
            });
        }
        Ok(durable.into_iter().next().or_else(|| current.pop().cloned()))
    }

    /// Outputs owned by `public_key`, optionally filtered by spent status.
    fn get_outputs_filtered(
        &self,
        public_key: &PublicKey,
        spent: Option<bool>,
    ) -> Result<Vec<TransactionLink>, StoreError> {
        let links = self.get_outputs_by_public_key(public_key)?;
        let want_spent = match spent {
            None => return Ok(links),
            Some(want) => want,
        };
        let mut filtered = Vec::new();
        for link in links {
            let spenders = self.get_spending_transactions(&link.txid, link.output)?;
            if !spenders.is_empty() == want_spent {
                filtered.push(link);
            }
        }
        Ok(filtered)
    }
}
