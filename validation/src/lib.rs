//! The transaction validation engine.
//!
//! Validation is fully synchronous and ordered: structural and
//! cryptographic checks run first (no I/O), store-dependent checks last.
//! A transaction is only ever accepted after every gate has passed, and
//! every rejection carries the specific rule violated.

pub mod engine;
pub mod policy;

pub use engine::TransactionValidator;
pub use policy::{AssetPolicy, AssetType, StandardPolicy};
