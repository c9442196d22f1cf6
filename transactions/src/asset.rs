//! Asset payloads.

use lattice_types::TransactionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The asset of a transaction.
///
/// A CREATE carries the full (opaque) payload; a TRANSFER references the
/// originating CREATE by id and never repeats the payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Asset {
    /// TRANSFER side: `{"id": <hex>}`.
    Link { id: TransactionId },
    /// CREATE side: `{"data": <object|null>}`.
    Definition { data: Option<Value> },
}

impl Asset {
    pub fn definition(data: Option<Value>) -> Self {
        Asset::Definition { data }
    }

    pub fn link(id: TransactionId) -> Self {
        Asset::Link { id }
    }

    /// The referenced asset id, if this is a link.
    pub fn id(&self) -> Option<TransactionId> {
        match self {
            Asset::Link { id } => Some(*id),
            Asset::Definition { .. } => None,
        }
    }

    /// The inline payload, if this is a definition.
    pub fn data(&self) -> Option<&Value> {
        match self {
            Asset::Definition { data } => data.as_ref(),
            Asset::Link { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn definition_serializes_with_data_key() {
        let asset = Asset::definition(Some(json!({"ticker": "XYZ"})));
        let value = serde_json::to_value(&asset).unwrap();
        assert_eq!(value, json!({"data": {"ticker": "XYZ"}}));
    }

    #[test]
    fn null_data_is_preserved() {
        let asset = Asset::definition(None);
        let value = serde_json::to_value(&asset).unwrap();
        assert_eq!(value, json!({"data": null}));
        let back: Asset = serde_json::from_value(value).unwrap();
        assert_eq!(back, asset);
    }

    #[test]
    fn link_serializes_with_id_key() {
        let id = TransactionId::new([3u8; 32]);
        let asset = Asset::link(id);
        let value = serde_json::to_value(&asset).unwrap();
        assert_eq!(value, json!({"id": id.to_hex()}));
        let back: Asset = serde_json::from_value(value).unwrap();
        assert_eq!(back.id(), Some(id));
    }
}
