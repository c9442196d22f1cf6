//! Fundamental types for the Lattice ledger.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: transaction ids, keys, amounts, protocol parameters, and the
//! validation error taxonomy.

pub mod amount;
pub mod error;
pub mod id;
pub mod keys;
pub mod params;

pub use amount::Amount;
pub use error::ValidationError;
pub use id::TransactionId;
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use params::{ProtocolParams, MAX_CONDITION_DEPTH, TX_VERSION};
