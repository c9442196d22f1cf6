//! Chain identity records, used by chain-migration elections.

use crate::StoreError;
use serde::{Deserialize, Serialize};

/// The identity of the chain the ledger is following. A migration closes
/// the current chain and opens a successor with `is_synced == false` until
/// the new chain catches up.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainRecord {
    pub height: u64,
    pub chain_id: String,
    pub is_synced: bool,
}

pub trait ChainStore {
    fn store_chain(&self, chain: ChainRecord) -> Result<(), StoreError>;

    fn get_latest_chain(&self) -> Result<Option<ChainRecord>, StoreError>;
}
