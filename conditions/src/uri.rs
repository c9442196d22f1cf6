//! Compact serializations of conditions and fulfillments.
//!
//! A *condition URI* is a content-derived identifier for the unlock policy:
//! `ni:///sha3-256;<fingerprint>?fpt=<type>&cost=<cost>`. Two outputs with
//! the same policy share the same URI regardless of signatures, which is
//! what lets a transfer input be checked against the output it spends.
//!
//! A *fulfillment URI* carries the whole (signed) tree: a version prefix
//! plus the hex-encoded bincode payload. `from_uri(to_uri(f)) == f` holds
//! exactly.

use crate::Fulfillment;
use lattice_crypto::sha3_256;
use lattice_types::ValidationError;

/// Cost of verifying a single Ed25519 signature (crypto-conditions figure).
const ED25519_COST: u64 = 131_072;

const FULFILLMENT_URI_PREFIX: &str = "lf1:";

impl Fulfillment {
    /// Fingerprint of the bare condition (signatures ignored).
    ///
    /// Threshold fingerprints hash the threshold plus the *sorted* child
    /// fingerprints, so sibling order does not change the identity.
    pub fn fingerprint(&self) -> [u8; 32] {
        match self {
            Fulfillment::Ed25519 { public_key, .. } => {
                let mut preimage = Vec::with_capacity(64);
                preimage.extend_from_slice(crate::ED25519_TYPE_NAME.as_bytes());
                preimage.push(b':');
                preimage.extend_from_slice(public_key.as_bytes());
                sha3_256(&preimage)
            }
            Fulfillment::Threshold {
                threshold,
                subfulfillments,
            } => {
                let mut sub_fps: Vec<[u8; 32]> =
                    subfulfillments.iter().map(|f| f.fingerprint()).collect();
                sub_fps.sort_unstable();
                let mut preimage = Vec::new();
                preimage.extend_from_slice(crate::THRESHOLD_TYPE_NAME.as_bytes());
                preimage.push(b':');
                preimage.extend_from_slice(&(*threshold as u64).to_be_bytes());
                for fp in &sub_fps {
                    preimage.extend_from_slice(fp);
                }
                sha3_256(&preimage)
            }
        }
    }

    /// Verification cost estimate, used in the condition URI.
    pub fn cost(&self) -> u64 {
        match self {
            Fulfillment::Ed25519 { .. } => ED25519_COST,
            Fulfillment::Threshold {
                threshold,
                subfulfillments,
            } => {
                let mut sub_costs: Vec<u64> =
                    subfulfillments.iter().map(|f| f.cost()).collect();
                sub_costs.sort_unstable_by(|a, b| b.cmp(a));
                let largest: u64 = sub_costs.iter().take(*threshold).sum();
                largest + 32 * subfulfillments.len() as u64
            }
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Fulfillment::Ed25519 { .. } => crate::ED25519_TYPE_NAME,
            Fulfillment::Threshold { .. } => crate::THRESHOLD_TYPE_NAME,
        }
    }

    /// The condition URI this (possibly signed) tree locks to.
    pub fn condition_uri(&self) -> String {
        format!(
            "ni:///sha3-256;{}?fpt={}&cost={}",
            hex::encode(self.fingerprint()),
            self.type_name(),
            self.cost()
        )
    }

    /// Serialize the full tree, signatures included.
    pub fn to_uri(&self) -> String {
        let bytes = bincode::serialize(self).expect("fulfillment serialization cannot fail");
        format!("{FULFILLMENT_URI_PREFIX}{}", hex::encode(bytes))
    }

    /// Parse a fulfillment URI. Trees nested past `max_depth` are rejected.
    pub fn from_uri(uri: &str, max_depth: usize) -> Result<Self, ValidationError> {
        let payload = uri.strip_prefix(FULFILLMENT_URI_PREFIX).ok_or_else(|| {
            ValidationError::InvalidSignature {
                reason: format!("fulfillment URI couldn't be parsed: `{uri}`"),
            }
        })?;
        let bytes = hex::decode(payload).map_err(|_| ValidationError::InvalidSignature {
            reason: "fulfillment URI payload is not valid hex".into(),
        })?;
        let fulfillment: Fulfillment =
            bincode::deserialize(&bytes).map_err(|_| ValidationError::InvalidSignature {
                reason: "fulfillment URI couldn't be parsed".into(),
            })?;
        if fulfillment.depth() > max_depth {
            return Err(ValidationError::ThresholdTooDeep);
        }
        Ok(fulfillment)
    }
}
