//! Proposer-signed blocks.

use lattice_crypto::{sha3_256, sign_message, verify_signature};
use lattice_transactions::Transaction;
use lattice_types::{PrivateKey, PublicKey, Signature, TransactionId, ValidationError};
use serde::{Deserialize, Serialize};

/// The signed content of a block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockBody {
    pub node_pubkey: PublicKey,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    /// The federation members entitled to vote on this block.
    pub voters: Vec<PublicKey>,
}

/// A block proposed by one node and voted on by the federation.
///
/// Content-addressed like transactions: the id is the hash of the
/// canonical body serialization, and the proposer's signature covers the
/// same digest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: Option<TransactionId>,
    #[serde(rename = "block")]
    pub body: BlockBody,
    pub signature: Option<Signature>,
}

impl Block {
    pub fn new(
        node_pubkey: PublicKey,
        timestamp: u64,
        transactions: Vec<Transaction>,
        voters: Vec<PublicKey>,
    ) -> Self {
        Self {
            id: None,
            body: BlockBody {
                node_pubkey,
                timestamp,
                transactions,
                voters,
            },
            signature: None,
        }
    }

    /// Canonical digest of the body: compact JSON, sorted keys.
    fn digest(&self) -> [u8; 32] {
        let value =
            serde_json::to_value(&self.body).expect("block body serialization cannot fail");
        sha3_256(value.to_string().as_bytes())
    }

    pub fn compute_id(&self) -> TransactionId {
        TransactionId::new(self.digest())
    }

    /// Assign the id and sign the body as the proposer.
    pub fn sign(&mut self, private_key: &PrivateKey) -> &mut Self {
        let digest = self.digest();
        self.id = Some(TransactionId::new(digest));
        self.signature = Some(sign_message(&digest, private_key));
        self
    }

    pub fn validate_id(&self) -> Result<(), ValidationError> {
        let declared = self.id.ok_or_else(|| ValidationError::Schema {
            reason: "block has no id".into(),
        })?;
        if declared != self.compute_id() {
            return Err(ValidationError::InvalidHash {
                id: declared.to_hex(),
            });
        }
        Ok(())
    }

    /// Whether the proposer's signature is present and valid.
    pub fn is_signature_valid(&self) -> bool {
        match &self.signature {
            Some(signature) => {
                verify_signature(&self.digest(), signature, &self.body.node_pubkey)
            }
            None => false,
        }
    }
}
