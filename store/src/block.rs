//! Committed-block records.

use crate::StoreError;
use lattice_types::TransactionId;
use serde::{Deserialize, Serialize};

/// A committed block: height, resulting application hash, and the ids of
/// the transactions it contains.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub height: u64,
    pub app_hash: String,
    pub transaction_ids: Vec<TransactionId>,
}

pub trait BlockStore {
    fn store_block(&self, block: BlockRecord) -> Result<(), StoreError>;

    fn get_block(&self, height: u64) -> Result<Option<BlockRecord>, StoreError>;

    fn get_latest_block(&self) -> Result<Option<BlockRecord>, StoreError>;
}
