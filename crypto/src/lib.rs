//! Cryptographic primitives for the Lattice ledger.
//!
//! All crypto code lives here so that the rest of the workspace never
//! touches `ed25519-dalek` or `sha3` directly.

pub mod hash;
pub mod keys;
pub mod sign;

pub use hash::{hash_data, merkle_root, sha3_256, transaction_id_from_body};
pub use keys::{generate_keypair, keypair_from_private, keypair_from_seed, public_from_private};
pub use sign::{sign_message, verify_signature};
