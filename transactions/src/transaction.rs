//! The transaction itself: construction, signing, canonical serialization
//! and the store-independent validation checks.
//!
//! The id and every input signature commit to the *unsigned* canonical
//! body: JSON with sorted keys and no insignificant whitespace, `id` set to
//! null and every input's `fulfillment` set to null. Each input is signed
//! against a partial body containing only that input, so a signature covers
//! exactly the content relevant to it.

use crate::{Asset, Input, Operation, Output, TransactionLink, UnspentOutput};
use lattice_conditions::OwnerSpec;
use lattice_crypto::{public_from_private, sha3_256};
use lattice_types::{
    Amount, PrivateKey, ProtocolParams, PublicKey, TransactionId, ValidationError, TX_VERSION,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// A recipient of an output: who can spend it, and how much it locks.
pub type Recipient = (Vec<OwnerSpec>, Amount);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Hex SHA3-256 of the canonical unsigned body; `None` until signed.
    pub id: Option<TransactionId>,
    pub version: String,
    pub operation: Operation,
    pub asset: Asset,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub metadata: Option<Value>,
}

impl Transaction {
    /// Build an unsigned CREATE transaction issuing a new asset.
    ///
    /// `signers` become the `owners_before` of the single issuing input and
    /// must all sign; each recipient gets one output.
    pub fn create(
        signers: &[PublicKey],
        recipients: &[Recipient],
        asset_data: Option<Value>,
        metadata: Option<Value>,
    ) -> Result<Self, ValidationError> {
        Self::create_as(
            Operation::Create,
            signers,
            recipients,
            Asset::definition(asset_data),
            metadata,
        )
    }

    /// CREATE-shaped constructor shared with the election operations.
    pub fn create_as(
        operation: Operation,
        signers: &[PublicKey],
        recipients: &[Recipient],
        asset: Asset,
        metadata: Option<Value>,
    ) -> Result<Self, ValidationError> {
        if !operation.is_create_like() {
            return Err(ValidationError::Schema {
                reason: format!("`{operation}` is not a CREATE-shaped operation"),
            });
        }
        if signers.is_empty() {
            return Err(ValidationError::Schema {
                reason: "`signers` needs to contain at least one owner".into(),
            });
        }
        if matches!(asset, Asset::Link { .. }) {
            return Err(ValidationError::Schema {
                reason: "a CREATE-shaped transaction carries an asset definition, not a link"
                    .into(),
            });
        }
        let outputs = Self::generate_outputs(recipients)?;
        Ok(Self {
            id: None,
            version: TX_VERSION.to_string(),
            operation,
            asset,
            inputs: vec![Input::generate(signers.to_vec())],
            outputs,
            metadata,
        })
    }

    /// Build an unsigned TRANSFER spending `inputs` of the asset `asset_id`.
    pub fn transfer(
        inputs: Vec<Input>,
        recipients: &[Recipient],
        asset_id: TransactionId,
        metadata: Option<Value>,
    ) -> Result<Self, ValidationError> {
        Self::transfer_as(Operation::Transfer, inputs, recipients, asset_id, metadata)
    }

    /// TRANSFER-shaped constructor shared with election votes.
    pub fn transfer_as(
        operation: Operation,
        inputs: Vec<Input>,
        recipients: &[Recipient],
        asset_id: TransactionId,
        metadata: Option<Value>,
    ) -> Result<Self, ValidationError> {
        if !operation.is_transfer_like() {
            return Err(ValidationError::Schema {
                reason: format!("`{operation}` is not a TRANSFER-shaped operation"),
            });
        }
        if inputs.is_empty() {
            return Err(ValidationError::Schema {
                reason: "`inputs` must contain at least one item".into(),
            });
        }
        if inputs.iter().any(|input| input.fulfills.is_none()) {
            return Err(ValidationError::Schema {
                reason: "every TRANSFER input must fulfill an existing output".into(),
            });
        }
        let outputs = Self::generate_outputs(recipients)?;
        Ok(Self {
            id: None,
            version: TX_VERSION.to_string(),
            operation,
            asset: Asset::link(asset_id),
            inputs,
            outputs,
            metadata,
        })
    }

    fn generate_outputs(recipients: &[Recipient]) -> Result<Vec<Output>, ValidationError> {
        if recipients.is_empty() {
            return Err(ValidationError::Schema {
                reason: "`recipients` needs to contain at least one output".into(),
            });
        }
        recipients
            .iter()
            .map(|(owners, amount)| Output::generate(owners, *amount))
            .collect()
    }

    /// Canonical serialization of the transaction as-is: compact JSON with
    /// sorted keys.
    pub fn serialized(&self) -> String {
        let value = serde_json::to_value(self).expect("transaction serialization cannot fail");
        value.to_string()
    }

    /// Canonical serialization of the unsigned body: `id` nulled, every
    /// input's fulfillment nulled. Both the id and the signatures commit to
    /// this form.
    pub fn unsigned_serialized(&self) -> String {
        let unsigned = Self {
            id: None,
            version: self.version.clone(),
            operation: self.operation,
            asset: self.asset.clone(),
            inputs: self.inputs.iter().map(Input::without_signature).collect(),
            outputs: self.outputs.clone(),
            metadata: self.metadata.clone(),
        };
        unsigned.serialized()
    }

    /// Recompute the id from the unsigned body.
    pub fn compute_id(&self) -> TransactionId {
        lattice_crypto::transaction_id_from_body(self.unsigned_serialized().as_bytes())
    }

    /// Digest each signature of input `index` covers: the unsigned body of
    /// a partial transaction containing only that input.
    fn signing_digest(&self, index: usize) -> [u8; 32] {
        let partial = Self {
            id: None,
            version: self.version.clone(),
            operation: self.operation,
            asset: self.asset.clone(),
            inputs: vec![self.inputs[index].without_signature()],
            outputs: self.outputs.clone(),
            metadata: self.metadata.clone(),
        };
        sha3_256(partial.serialized().as_bytes())
    }

    /// Sign every input and assign the id.
    ///
    /// Each private key must correspond to an owner appearing in the input
    /// being signed, and every `owners_before` key of every input must be
    /// covered, else `KeypairMismatch`.
    pub fn sign(&mut self, private_keys: &[PrivateKey]) -> Result<&mut Self, ValidationError> {
        let pairs: Vec<(PublicKey, &PrivateKey)> = private_keys
            .iter()
            .map(|private| (public_from_private(private), private))
            .collect();
        let key_pairs: HashMap<PublicKey, &PrivateKey> = pairs.into_iter().collect();

        let digests: Vec<[u8; 32]> = (0..self.inputs.len())
            .map(|i| self.signing_digest(i))
            .collect();

        for (input, digest) in self.inputs.iter_mut().zip(digests) {
            if input.fulfillment.is_none() {
                // CREATE-like input: the condition tree is derived from the
                // issuing owners at signing time.
                let owners: Vec<OwnerSpec> = input
                    .owners_before
                    .iter()
                    .map(|key| OwnerSpec::Key(*key))
                    .collect();
                input.fulfillment = Some(lattice_conditions::Fulfillment::generate(&owners)?);
            }
            if let Some(fulfillment) = input.fulfillment.as_mut() {
                fulfillment.sign(&digest, &input.owners_before, &key_pairs)?;
            }
        }
        self.id = Some(self.compute_id());
        Ok(self)
    }

    /// Check the declared id against the unsigned body.
    pub fn validate_id(&self) -> Result<(), ValidationError> {
        let declared = self.id.ok_or_else(|| ValidationError::Schema {
            reason: "transaction has no id".into(),
        })?;
        let computed = self.compute_id();
        if declared != computed {
            return Err(ValidationError::InvalidHash {
                id: declared.to_hex(),
            });
        }
        Ok(())
    }

    /// Store-independent shape checks: version, operation/asset agreement,
    /// input linkage, output bounds.
    pub fn validate_structure(&self, params: &ProtocolParams) -> Result<(), ValidationError> {
        if !params.supports_version(&self.version) {
            return Err(ValidationError::Schema {
                reason: format!("transaction version `{}` is not supported", self.version),
            });
        }
        if self.inputs.is_empty() {
            return Err(ValidationError::Schema {
                reason: "`inputs` must contain at least one item".into(),
            });
        }
        if self.outputs.is_empty() {
            return Err(ValidationError::Schema {
                reason: "`outputs` must contain at least one item".into(),
            });
        }
        match (self.operation.is_create_like(), &self.asset) {
            (true, Asset::Link { .. }) => {
                return Err(ValidationError::Schema {
                    reason: format!("`{}` must carry an asset definition", self.operation),
                });
            }
            (false, Asset::Definition { .. }) => {
                return Err(ValidationError::Schema {
                    reason: format!("`{}` must link to an existing asset", self.operation),
                });
            }
            _ => {}
        }
        if self.operation.is_create_like() {
            if self.inputs.iter().any(|input| input.fulfills.is_some()) {
                return Err(ValidationError::Schema {
                    reason: "a CREATE-shaped input cannot fulfill an output".into(),
                });
            }
        } else if self.inputs.iter().any(|input| input.fulfills.is_none()) {
            return Err(ValidationError::Schema {
                reason: "every TRANSFER input must fulfill an existing output".into(),
            });
        }
        for output in &self.outputs {
            if output.amount.value() > params.max_amount {
                return Err(ValidationError::Amount {
                    reason: format!("`amount` must be <= {}", params.max_amount),
                });
            }
            if output.condition.depth() > params.max_condition_depth {
                return Err(ValidationError::ThresholdTooDeep);
            }
            if output.public_keys != output.condition.public_keys() {
                return Err(ValidationError::Schema {
                    reason: "`public_keys` does not match the condition".into(),
                });
            }
        }
        Ok(())
    }

    /// Verify every input's fulfillment cryptographically. Deterministic
    /// and store-independent.
    pub fn fulfillments_valid(&self) -> Result<(), ValidationError> {
        for (index, input) in self.inputs.iter().enumerate() {
            let fulfillment =
                input
                    .fulfillment
                    .as_ref()
                    .ok_or_else(|| ValidationError::InvalidSignature {
                        reason: format!("input {index} is missing a fulfillment"),
                    })?;
            let digest = self.signing_digest(index);
            if !fulfillment.verify(&digest) {
                return Err(ValidationError::InvalidSignature {
                    reason: format!("fulfillment of input {index} is invalid"),
                });
            }
        }
        Ok(())
    }

    /// Verify every input's fulfillment.
    ///
    /// For TRANSFER-like transactions `output_condition_uris` carries, per
    /// input, the condition URI of the output being spent; each fulfillment
    /// must lock to the same condition. CREATE-like transactions pass an
    /// empty slice.
    pub fn inputs_valid(&self, output_condition_uris: &[String]) -> Result<(), ValidationError> {
        if self.operation.is_transfer_like() && output_condition_uris.len() != self.inputs.len() {
            return Err(ValidationError::InvalidSignature {
                reason: format!(
                    "there must be one output condition per input ({} inputs, {} conditions)",
                    self.inputs.len(),
                    output_condition_uris.len()
                ),
            });
        }
        if self.operation.is_transfer_like() {
            for (index, input) in self.inputs.iter().enumerate() {
                let fulfillment = input.fulfillment.as_ref().ok_or_else(|| {
                    ValidationError::InvalidSignature {
                        reason: format!("input {index} is missing a fulfillment"),
                    }
                })?;
                if fulfillment.condition_uri() != output_condition_uris[index] {
                    return Err(ValidationError::InvalidSignature {
                        reason: format!(
                            "input {index} does not fulfill the condition of the output it spends"
                        ),
                    });
                }
            }
        }
        self.fulfillments_valid()
    }

    /// The id of the asset this transaction operates on: its own id for
    /// CREATE-like operations, the linked id otherwise.
    pub fn asset_id(&self) -> Option<TransactionId> {
        if self.operation.is_create_like() {
            self.id
        } else {
            self.asset.id()
        }
    }

    /// The single asset id a group of transactions belongs to, or
    /// `AssetIdMismatch` if they mix assets.
    pub fn shared_asset_id(
        transactions: &[&Transaction],
    ) -> Result<TransactionId, ValidationError> {
        let ids: HashSet<TransactionId> = transactions
            .iter()
            .filter_map(|tx| tx.asset_id())
            .collect();
        let mut ids = ids.into_iter();
        match (ids.next(), ids.next()) {
            (Some(id), None) => Ok(id),
            _ => Err(ValidationError::AssetIdMismatch),
        }
    }

    /// Build an unsigned spending input for output `index`.
    pub fn to_input(&self, index: usize) -> Result<Input, ValidationError> {
        let id = self.id.ok_or_else(|| ValidationError::Schema {
            reason: "cannot spend an unsigned transaction".into(),
        })?;
        let output = self
            .outputs
            .get(index)
            .ok_or_else(|| ValidationError::InputDoesNotExist {
                txid: id.to_hex(),
                output: index,
            })?;
        Ok(Input::spending(
            TransactionLink::new(id, index),
            output.condition.clone(),
            output.public_keys.clone(),
        ))
    }

    /// Build unsigned spending inputs for all outputs.
    pub fn to_inputs(&self) -> Result<Vec<Input>, ValidationError> {
        (0..self.outputs.len()).map(|i| self.to_input(i)).collect()
    }

    /// The outputs of this transaction as unspent-output records.
    pub fn unspent_outputs(&self) -> impl Iterator<Item = UnspentOutput> + '_ {
        let transaction_id = self.id;
        let asset_id = self.asset_id();
        self.outputs
            .iter()
            .enumerate()
            .filter_map(move |(index, output)| {
                Some(UnspentOutput {
                    transaction_id: transaction_id?,
                    output_index: index,
                    amount: output.amount,
                    asset_id: asset_id?,
                    condition_uri: output.condition_uri(),
                })
            })
    }

    /// Id used to route the transaction to a validation worker: the asset
    /// lineage for spends, the transaction itself for issuance.
    pub fn routing_id(&self) -> Option<TransactionId> {
        self.asset_id()
    }
}
