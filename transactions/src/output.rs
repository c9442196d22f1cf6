//! Transaction outputs.

use lattice_conditions::{Fulfillment, OwnerSpec};
use lattice_crypto::{merkle_root, sha3_256};
use lattice_types::{Amount, PublicKey, TransactionId, ValidationError, MAX_CONDITION_DEPTH};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An output of a transaction: an amount locked to a condition.
///
/// `public_keys` is the flattened list of every key appearing in the
/// condition tree; it exists for indexing and is re-derived from the tree
/// on deserialization mismatch checks.
#[derive(Clone, Debug, PartialEq)]
pub struct Output {
    pub amount: Amount,
    pub condition: Fulfillment,
    pub public_keys: Vec<PublicKey>,
}

impl Output {
    /// Build an output locking `amount` to the given owners.
    ///
    /// A single owner yields a plain Ed25519 condition, several owners an
    /// N-of-N threshold, and nested groups unanimous sub-thresholds.
    pub fn generate(owners: &[OwnerSpec], amount: Amount) -> Result<Self, ValidationError> {
        let condition = Fulfillment::generate(owners)?;
        let public_keys = condition.public_keys();
        Ok(Self {
            amount,
            condition,
            public_keys,
        })
    }

    /// The condition URI a spending input must fulfill.
    pub fn condition_uri(&self) -> String {
        self.condition.condition_uri()
    }
}

#[derive(Serialize, Deserialize)]
struct OutputWire {
    amount: Amount,
    condition: ConditionWire,
    public_keys: Vec<PublicKey>,
}

#[derive(Serialize, Deserialize)]
struct ConditionWire {
    details: Value,
    uri: String,
}

impl Serialize for Output {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        OutputWire {
            amount: self.amount,
            condition: ConditionWire {
                details: self.condition.to_details(),
                uri: self.condition.condition_uri(),
            },
            public_keys: self.public_keys.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Output {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = OutputWire::deserialize(deserializer)?;
        let condition = Fulfillment::from_details(&wire.condition.details, MAX_CONDITION_DEPTH)
            .map_err(serde::de::Error::custom)?;
        if condition.condition_uri() != wire.condition.uri {
            return Err(serde::de::Error::custom(
                "condition uri does not match condition details",
            ));
        }
        Ok(Output {
            amount: wire.amount,
            condition,
            public_keys: wire.public_keys,
        })
    }
}

/// A denormalized view of one still-spendable output, as returned by the
/// unspent-output queries and fed into wallet-style balance accounting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnspentOutput {
    pub transaction_id: TransactionId,
    pub output_index: usize,
    pub amount: Amount,
    /// Id of the asset this output belongs to (the CREATE's id).
    pub asset_id: TransactionId,
    pub condition_uri: String,
}

/// Merkle root over a UTXO set, as committed into application state.
///
/// Each output hashes as `sha3_256(txid_hex || output_index)`; leaves are
/// sorted so the root does not depend on query order.
pub fn utxoset_merkle_root(outputs: &[UnspentOutput]) -> String {
    let mut leaves: Vec<[u8; 32]> = outputs
        .iter()
        .map(|output| {
            let preimage = format!("{}{}", output.transaction_id.to_hex(), output.output_index);
            sha3_256(preimage.as_bytes())
        })
        .collect();
    leaves.sort_unstable();
    TransactionId::new(merkle_root(leaves)).to_hex()
}
