//! Transaction inputs.

use crate::TransactionLink;
use lattice_conditions::Fulfillment;
use lattice_types::PublicKey;
use serde::{Deserialize, Serialize};

/// An input of a transaction.
///
/// For CREATE-like transactions `fulfills` is absent and `owners_before`
/// names the issuers. For TRANSFER-like transactions `fulfills` points at
/// the output being spent and `owners_before` are that output's owners.
///
/// On the wire the fulfillment travels as a URI string once signed, or
/// `null` while the transaction is still a template awaiting signatures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Input {
    pub owners_before: Vec<PublicKey>,
    pub fulfills: Option<TransactionLink>,
    #[serde(with = "fulfillment_uri")]
    pub fulfillment: Option<Fulfillment>,
}

impl Input {
    /// An unsigned CREATE-like input for a set of issuers.
    pub fn generate(owners_before: Vec<PublicKey>) -> Self {
        Self {
            owners_before,
            fulfills: None,
            fulfillment: None,
        }
    }

    /// An unsigned TRANSFER-like input spending `fulfills`, carrying the
    /// spent output's condition tree as a template for signing.
    pub fn spending(
        fulfills: TransactionLink,
        condition: Fulfillment,
        owners_before: Vec<PublicKey>,
    ) -> Self {
        Self {
            owners_before,
            fulfills: Some(fulfills),
            fulfillment: Some(condition.without_signatures()),
        }
    }

    /// The input with its fulfillment nulled, as used in the canonical
    /// unsigned serialization that ids and signatures commit to.
    pub fn without_signature(&self) -> Self {
        Self {
            owners_before: self.owners_before.clone(),
            fulfills: self.fulfills,
            fulfillment: None,
        }
    }
}

/// Wire form of `Input::fulfillment`: a fulfillment URI or `null`.
mod fulfillment_uri {
    use lattice_conditions::Fulfillment;
    use lattice_types::MAX_CONDITION_DEPTH;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Fulfillment>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(fulfillment) => serializer.serialize_str(&fulfillment.to_uri()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Fulfillment>, D::Error> {
        let uri: Option<String> = Option::deserialize(deserializer)?;
        match uri {
            Some(uri) => Fulfillment::from_uri(&uri, MAX_CONDITION_DEPTH)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
