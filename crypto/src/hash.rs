//! SHA3-256 hashing for transaction ids and Merkle leaves.

use lattice_types::TransactionId;
use sha3::{Digest, Sha3_256};

/// Compute a raw SHA3-256 digest.
pub fn sha3_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Hash data and return the hex-encoded digest, as used for transaction ids.
pub fn hash_data(data: &[u8]) -> String {
    hex::encode(sha3_256(data))
}

/// Hash a canonical unsigned transaction body into its id.
pub fn transaction_id_from_body(body: &[u8]) -> TransactionId {
    TransactionId::new(sha3_256(body))
}

/// Fold a sorted list of leaf hashes into a Merkle root.
///
/// Leaves must already be sorted; an empty list hashes to the digest of the
/// empty string, a single leaf is its own root.
pub fn merkle_root(mut hashes: Vec<[u8; 32]>) -> [u8; 32] {
    if hashes.is_empty() {
        return sha3_256(b"");
    }
    while hashes.len() > 1 {
        hashes = hashes
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => {
                    let mut concat = [0u8; 64];
                    concat[..32].copy_from_slice(left);
                    concat[32..].copy_from_slice(right);
                    sha3_256(&concat)
                }
                [single] => *single,
                _ => unreachable!(),
            })
            .collect();
    }
    hashes[0]
}
