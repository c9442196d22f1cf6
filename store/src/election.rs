//! Election lifecycle records.

use crate::StoreError;
use lattice_types::TransactionId;
use serde::{Deserialize, Serialize};

/// The state of an election as of some block height. A new record is
/// written whenever votes for the election land in a block; `is_concluded`
/// latches once the threshold is crossed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionRecord {
    pub election_id: TransactionId,
    pub height: u64,
    pub is_concluded: bool,
}

pub trait ElectionStore {
    fn store_elections(&self, records: &[ElectionRecord]) -> Result<(), StoreError>;

    /// Remove every record written at exactly `height` (rollback path).
    fn delete_elections(&self, height: u64) -> Result<(), StoreError>;

    /// The most recent record for an election, if any votes were processed.
    fn get_election(&self, id: &TransactionId) -> Result<Option<ElectionRecord>, StoreError>;
}
