//! The fulfillment/condition tree.

use lattice_crypto::{sign_message, verify_signature};
use lattice_types::{PrivateKey, PublicKey, Signature, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

pub const ED25519_TYPE_NAME: &str = "ed25519-sha-256";
pub const THRESHOLD_TYPE_NAME: &str = "threshold-sha-256";

/// An ownership specification used to build a condition from a (possibly
/// nested) list of public keys. A `Group` becomes a unanimous sub-threshold
/// contributing a single vote to its parent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OwnerSpec {
    Key(PublicKey),
    Group(Vec<OwnerSpec>),
}

impl From<PublicKey> for OwnerSpec {
    fn from(key: PublicKey) -> Self {
        OwnerSpec::Key(key)
    }
}

/// A condition tree, with optional signatures at the Ed25519 leaves.
///
/// Unsigned, this is the unlock policy published in an output's
/// `condition.details`. Signed, it is the proof carried by an input's
/// `fulfillment` field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fulfillment {
    Ed25519 {
        public_key: PublicKey,
        signature: Option<Signature>,
    },
    Threshold {
        threshold: usize,
        subfulfillments: Vec<Fulfillment>,
    },
}

impl Fulfillment {
    pub fn ed25519(public_key: PublicKey) -> Self {
        Fulfillment::Ed25519 {
            public_key,
            signature: None,
        }
    }

    /// Build a condition from an ownership spec.
    ///
    /// A flat list of N keys becomes an N-of-N threshold; a single bare key
    /// degenerates to the Ed25519 variant. Nested groups become unanimous
    /// sub-thresholds. Empty lists and single-element groups are rejected.
    pub fn generate(owners: &[OwnerSpec]) -> Result<Self, ValidationError> {
        if owners.is_empty() {
            return Err(ValidationError::Schema {
                reason: "`public_keys` needs to contain at least one owner".into(),
            });
        }
        if owners.len() == 1 {
            if let OwnerSpec::Key(key) = &owners[0] {
                return Ok(Fulfillment::ed25519(*key));
            }
        }
        let subfulfillments = owners
            .iter()
            .map(Self::generate_node)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Fulfillment::Threshold {
            threshold: owners.len(),
            subfulfillments,
        })
    }

    fn generate_node(spec: &OwnerSpec) -> Result<Self, ValidationError> {
        match spec {
            OwnerSpec::Key(key) => Ok(Fulfillment::ed25519(*key)),
            OwnerSpec::Group(members) if members.len() > 1 => {
                let subfulfillments = members
                    .iter()
                    .map(Self::generate_node)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Fulfillment::Threshold {
                    threshold: members.len(),
                    subfulfillments,
                })
            }
            OwnerSpec::Group(_) => Err(ValidationError::Schema {
                reason: "sublist cannot contain a single owner".into(),
            }),
        }
    }

    /// All leaf public keys, preorder. This is the flattened `public_keys`
    /// list published alongside an output.
    pub fn public_keys(&self) -> Vec<PublicKey> {
        match self {
            Fulfillment::Ed25519 { public_key, .. } => vec![*public_key],
            Fulfillment::Threshold {
                subfulfillments, ..
            } => subfulfillments.iter().flat_map(|f| f.public_keys()).collect(),
        }
    }

    /// Whether `key` appears at any leaf of the tree.
    pub fn has_owner(&self, key: &PublicKey) -> bool {
        match self {
            Fulfillment::Ed25519 { public_key, .. } => public_key == key,
            Fulfillment::Threshold {
                subfulfillments, ..
            } => subfulfillments.iter().any(|f| f.has_owner(key)),
        }
    }

    /// Maximum nesting depth of the tree. A bare leaf has depth 1.
    pub fn depth(&self) -> usize {
        match self {
            Fulfillment::Ed25519 { .. } => 1,
            Fulfillment::Threshold {
                subfulfillments, ..
            } => {
                1 + subfulfillments
                    .iter()
                    .map(|f| f.depth())
                    .max()
                    .unwrap_or(0)
            }
        }
    }

    /// Strip all signatures, leaving the bare condition.
    pub fn without_signatures(&self) -> Self {
        match self {
            Fulfillment::Ed25519 { public_key, .. } => Fulfillment::ed25519(*public_key),
            Fulfillment::Threshold {
                threshold,
                subfulfillments,
            } => Fulfillment::Threshold {
                threshold: *threshold,
                subfulfillments: subfulfillments
                    .iter()
                    .map(|f| f.without_signatures())
                    .collect(),
            },
        }
    }

    /// Sign every leaf matching `public_key` with `private_key`.
    ///
    /// Returns the number of leaves signed.
    pub fn sign_leaves(
        &mut self,
        message: &[u8],
        public_key: &PublicKey,
        private_key: &PrivateKey,
    ) -> usize {
        match self {
            Fulfillment::Ed25519 {
                public_key: leaf_key,
                signature,
            } => {
                if leaf_key == public_key {
                    *signature = Some(sign_message(message, private_key));
                    1
                } else {
                    0
                }
            }
            Fulfillment::Threshold {
                subfulfillments, ..
            } => subfulfillments
                .iter_mut()
                .map(|f| f.sign_leaves(message, public_key, private_key))
                .sum(),
        }
    }

    /// Sign the tree for a set of owners.
    ///
    /// Each owner key must have a matching private key in `key_pairs` and
    /// must actually appear in the tree, else `KeypairMismatch`.
    pub fn sign(
        &mut self,
        message: &[u8],
        owners: &[PublicKey],
        key_pairs: &HashMap<PublicKey, &PrivateKey>,
    ) -> Result<(), ValidationError> {
        for owner in owners {
            if !self.has_owner(owner) {
                return Err(ValidationError::KeypairMismatch {
                    pubkey: format!("{owner} cannot be found in the fulfillment"),
                });
            }
            let private_key =
                key_pairs
                    .get(owner)
                    .ok_or_else(|| ValidationError::KeypairMismatch {
                        pubkey: owner.to_base58(),
                    })?;
            self.sign_leaves(message, owner, private_key);
        }
        Ok(())
    }

    /// Verify the tree against a message.
    ///
    /// An Ed25519 leaf verifies iff it carries a valid signature. A
    /// threshold node verifies iff at least `threshold` subfulfillments
    /// verify. Fails closed on structurally impossible thresholds.
    pub fn verify(&self, message: &[u8]) -> bool {
        match self {
            Fulfillment::Ed25519 {
                public_key,
                signature,
            } => match signature {
                Some(sig) => verify_signature(message, sig, public_key),
                None => false,
            },
            Fulfillment::Threshold {
                threshold,
                subfulfillments,
            } => {
                if *threshold == 0 || *threshold > subfulfillments.len() {
                    return false;
                }
                let satisfied = subfulfillments.iter().filter(|f| f.verify(message)).count();
                satisfied >= *threshold
            }
        }
    }

    /// The descriptive JSON published in an output's `condition.details`.
    pub fn to_details(&self) -> Value {
        match self {
            Fulfillment::Ed25519 { public_key, .. } => json!({
                "type": ED25519_TYPE_NAME,
                "public_key": public_key.to_base58(),
            }),
            Fulfillment::Threshold {
                threshold,
                subfulfillments,
            } => json!({
                "type": THRESHOLD_TYPE_NAME,
                "threshold": threshold,
                "subconditions": subfulfillments
                    .iter()
                    .map(|f| f.to_details())
                    .collect::<Vec<_>>(),
            }),
        }
    }

    /// Parse a `condition.details` object back into an (unsigned) tree.
    ///
    /// `max_depth` bounds recursion; deeper payloads are rejected with
    /// `ThresholdTooDeep` before any further work is done.
    pub fn from_details(details: &Value, max_depth: usize) -> Result<Self, ValidationError> {
        Self::from_details_at(details, 0, max_depth)
    }

    fn from_details_at(
        details: &Value,
        depth: usize,
        max_depth: usize,
    ) -> Result<Self, ValidationError> {
        if depth >= max_depth {
            return Err(ValidationError::ThresholdTooDeep);
        }
        let type_name = details
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ValidationError::Schema {
                reason: "condition details missing `type`".into(),
            })?;
        match type_name {
            ED25519_TYPE_NAME => {
                let key_str = details
                    .get("public_key")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ValidationError::Schema {
                        reason: "ed25519 condition missing `public_key`".into(),
                    })?;
                let public_key =
                    PublicKey::from_base58(key_str).ok_or_else(|| ValidationError::Schema {
                        reason: format!("invalid public key in condition: {key_str}"),
                    })?;
                Ok(Fulfillment::ed25519(public_key))
            }
            THRESHOLD_TYPE_NAME => {
                let threshold = details
                    .get("threshold")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| ValidationError::Schema {
                        reason: "threshold condition missing `threshold`".into(),
                    })? as usize;
                let subs = details
                    .get("subconditions")
                    .and_then(Value::as_array)
                    .ok_or_else(|| ValidationError::Schema {
                        reason: "threshold condition missing `subconditions`".into(),
                    })?;
                let subfulfillments = subs
                    .iter()
                    .map(|sub| Self::from_details_at(sub, depth + 1, max_depth))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Fulfillment::Threshold {
                    threshold,
                    subfulfillments,
                })
            }
            other => Err(ValidationError::Schema {
                reason: format!("unsupported condition type `{other}`"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_crypto::keypair_from_seed;
    use lattice_types::KeyPair;

    fn kp(seed: u8) -> KeyPair {
        keypair_from_seed(&[seed; 32])
    }

    fn key_map<'a>(pairs: &'a [&'a KeyPair]) -> HashMap<PublicKey, &'a PrivateKey> {
        pairs.iter().map(|kp| (kp.public, &kp.private)).collect()
    }

    #[test]
    fn single_key_degenerates_to_ed25519() {
        let alice = kp(1);
        let f = Fulfillment::generate(&[OwnerSpec::Key(alice.public)]).unwrap();
        assert!(matches!(f, Fulfillment::Ed25519 { .. }));
        assert_eq!(f.public_keys(), vec![alice.public]);
    }

    #[test]
    fn flat_list_is_unanimous_threshold() {
        let (a, b, c) = (kp(1), kp(2), kp(3));
        let f = Fulfillment::generate(&[
            OwnerSpec::Key(a.public),
            OwnerSpec::Key(b.public),
            OwnerSpec::Key(c.public),
        ])
        .unwrap();
        match &f {
            Fulfillment::Threshold {
                threshold,
                subfulfillments,
            } => {
                assert_eq!(*threshold, 3);
                assert_eq!(subfulfillments.len(), 3);
            }
            _ => panic!("expected threshold"),
        }
    }

    #[test]
    fn nested_group_becomes_subthreshold() {
        let (a, b, c) = (kp(1), kp(2), kp(3));
        let f = Fulfillment::generate(&[
            OwnerSpec::Group(vec![OwnerSpec::Key(a.public), OwnerSpec::Key(b.public)]),
            OwnerSpec::Key(c.public),
        ])
        .unwrap();
        match &f {
            Fulfillment::Threshold {
                threshold,
                subfulfillments,
            } => {
                assert_eq!(*threshold, 2);
                match &subfulfillments[0] {
                    Fulfillment::Threshold {
                        threshold,
                        subfulfillments,
                    } => {
                        assert_eq!(*threshold, 2);
                        assert_eq!(subfulfillments.len(), 2);
                    }
                    _ => panic!("expected nested threshold"),
                }
            }
            _ => panic!("expected threshold"),
        }
    }

    #[test]
    fn empty_owner_list_rejected() {
        assert!(matches!(
            Fulfillment::generate(&[]),
            Err(ValidationError::Schema { .. })
        ));
    }

    #[test]
    fn single_element_group_rejected() {
        let a = kp(1);
        let result = Fulfillment::generate(&[
            OwnerSpec::Group(vec![OwnerSpec::Key(a.public)]),
            OwnerSpec::Key(kp(2).public),
        ]);
        assert!(matches!(result, Err(ValidationError::Schema { .. })));
    }

    #[test]
    fn sign_and_verify_single() {
        let alice = kp(1);
        let mut f = Fulfillment::ed25519(alice.public);
        let msg = b"message";
        f.sign(msg, &[alice.public], &key_map(&[&alice])).unwrap();
        assert!(f.verify(msg));
        assert!(!f.verify(b"other message"));
    }

    #[test]
    fn unsigned_leaf_does_not_verify() {
        let alice = kp(1);
        let f = Fulfillment::ed25519(alice.public);
        assert!(!f.verify(b"message"));
    }

    #[test]
    fn sign_without_matching_key_is_mismatch() {
        let alice = kp(1);
        let mallory = kp(9);
        let mut f = Fulfillment::ed25519(alice.public);
        let result = f.sign(b"m", &[alice.public], &key_map(&[&mallory]));
        assert!(matches!(
            result,
            Err(ValidationError::KeypairMismatch { .. })
        ));
    }

    #[test]
    fn threshold_requires_enough_signatures() {
        let (a, b, c) = (kp(1), kp(2), kp(3));
        let owners = [
            OwnerSpec::Key(a.public),
            OwnerSpec::Key(b.public),
            OwnerSpec::Key(c.public),
        ];
        let msg = b"spend";

        let mut f = Fulfillment::generate(&owners).unwrap();
        f.sign_leaves(msg, &a.public, &a.private);
        f.sign_leaves(msg, &b.public, &b.private);
        // 2 of 3 signed, threshold is 3
        assert!(!f.verify(msg));

        f.sign_leaves(msg, &c.public, &c.private);
        assert!(f.verify(msg));
    }

    #[test]
    fn nested_subthreshold_needs_all_members() {
        // [[a, b], c]: top is 2-of-2, first branch is 2-of-2 over {a, b}.
        let (a, b, c) = (kp(1), kp(2), kp(3));
        let owners = [
            OwnerSpec::Group(vec![OwnerSpec::Key(a.public), OwnerSpec::Key(b.public)]),
            OwnerSpec::Key(c.public),
        ];
        let msg = b"spend";

        // Signing with only a and c leaves the {a, b} branch unsatisfied.
        let mut partial = Fulfillment::generate(&owners).unwrap();
        partial.sign_leaves(msg, &a.public, &a.private);
        partial.sign_leaves(msg, &c.public, &c.private);
        assert!(!partial.verify(msg));

        let mut full = Fulfillment::generate(&owners).unwrap();
        full.sign_leaves(msg, &a.public, &a.private);
        full.sign_leaves(msg, &b.public, &b.private);
        full.sign_leaves(msg, &c.public, &c.private);
        assert!(full.verify(msg));
    }

    #[test]
    fn details_roundtrip() {
        let (a, b, c) = (kp(1), kp(2), kp(3));
        let f = Fulfillment::generate(&[
            OwnerSpec::Group(vec![OwnerSpec::Key(a.public), OwnerSpec::Key(b.public)]),
            OwnerSpec::Key(c.public),
        ])
        .unwrap();
        let details = f.to_details();
        let back = Fulfillment::from_details(&details, 100).unwrap();
        assert_eq!(f, back);
    }

    #[test]
    fn details_depth_limit_enforced() {
        // Build a details payload nested past the limit.
        let leaf = json!({"type": ED25519_TYPE_NAME, "public_key": kp(1).public.to_base58()});
        let mut details = leaf;
        for _ in 0..10 {
            details = json!({
                "type": THRESHOLD_TYPE_NAME,
                "threshold": 1,
                "subconditions": [details],
            });
        }
        assert!(matches!(
            Fulfillment::from_details(&details, 5),
            Err(ValidationError::ThresholdTooDeep)
        ));
        assert!(Fulfillment::from_details(&details, 100).is_ok());
    }

    #[test]
    fn flipping_signature_byte_invalidates() {
        let alice = kp(1);
        let mut f = Fulfillment::ed25519(alice.public);
        let msg = b"message";
        f.sign_leaves(msg, &alice.public, &alice.private);
        if let Fulfillment::Ed25519 {
            signature: Some(sig),
            ..
        } = &mut f
        {
            sig.0[10] ^= 0x01;
        }
        assert!(!f.verify(msg));
    }

    #[test]
    fn without_signatures_strips_recursively() {
        let (a, b) = (kp(1), kp(2));
        let mut f =
            Fulfillment::generate(&[OwnerSpec::Key(a.public), OwnerSpec::Key(b.public)]).unwrap();
        f.sign_leaves(b"m", &a.public, &a.private);
        let stripped = f.without_signatures();
        assert_eq!(
            stripped,
            Fulfillment::generate(&[OwnerSpec::Key(a.public), OwnerSpec::Key(b.public)]).unwrap()
        );
    }
}
