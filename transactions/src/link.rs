//! Unidirectional links to a transaction's output.

use lattice_types::TransactionId;
use serde::{Deserialize, Serialize};

/// A pointer to one output of one transaction, as referenced by a spending
/// input's `fulfills` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionLink {
    #[serde(rename = "transaction_id")]
    pub txid: TransactionId,
    #[serde(rename = "output_index")]
    pub output: usize,
}

impl TransactionLink {
    pub fn new(txid: TransactionId, output: usize) -> Self {
        Self { txid, output }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_field_names() {
        let link = TransactionLink::new(TransactionId::new([1u8; 32]), 2);
        let value = serde_json::to_value(link).unwrap();
        assert_eq!(
            value,
            json!({
                "transaction_id": "01".repeat(32),
                "output_index": 2,
            })
        );
    }

    #[test]
    fn roundtrip() {
        let link = TransactionLink::new(TransactionId::new([9u8; 32]), 0);
        let json = serde_json::to_string(&link).unwrap();
        let back: TransactionLink = serde_json::from_str(&json).unwrap();
        assert_eq!(link, back);
    }
}
