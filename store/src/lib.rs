//! Abstract storage traits for the Lattice ledger.
//!
//! The validation engine, elections, and consensus depend only on these
//! traits; any backend (a database, or the in-memory [`MemoryLedger`] used
//! in tests and tools) implements them.

pub mod block;
pub mod chain;
pub mod election;
pub mod error;
pub mod memory;
pub mod transaction;
pub mod validator;

pub use block::{BlockRecord, BlockStore};
pub use chain::{ChainRecord, ChainStore};
pub use election::{ElectionRecord, ElectionStore};
pub use error::StoreError;
pub use memory::MemoryLedger;
pub use transaction::TransactionStore;
pub use validator::{Validator, ValidatorChange, ValidatorStore};
