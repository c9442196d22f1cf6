//! Crypto-condition model for the Lattice ledger.
//!
//! An output is locked by a *condition*: either a single Ed25519 public key
//! or a threshold tree of subconditions. A *fulfillment* is the same tree
//! with signatures attached at the leaves. Both views live in one
//! [`Fulfillment`] type; the condition-side operations (fingerprint, uri,
//! details) simply ignore signatures.

pub mod fulfillment;
pub mod uri;

pub use fulfillment::{Fulfillment, OwnerSpec, ED25519_TYPE_NAME, THRESHOLD_TYPE_NAME};
