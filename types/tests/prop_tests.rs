use proptest::prelude::*;

use lattice_types::{Amount, PublicKey, TransactionId};

proptest! {
    /// TransactionId hex roundtrip is the identity.
    #[test]
    fn transaction_id_hex_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let id = TransactionId::new(bytes);
        let parsed = TransactionId::from_hex(&id.to_hex()).unwrap();
        prop_assert_eq!(id, parsed);
    }

    /// TransactionId JSON representation is always a 64-character hex string.
    #[test]
    fn transaction_id_json_is_hex(bytes in prop::array::uniform32(0u8..)) {
        let id = TransactionId::new(bytes);
        let json = serde_json::to_string(&id).unwrap();
        prop_assert_eq!(json.len(), 66); // 64 hex chars + quotes
    }

    /// PublicKey base58 roundtrip is the identity.
    #[test]
    fn public_key_base58_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let pk = PublicKey(bytes);
        prop_assert_eq!(PublicKey::from_base58(&pk.to_base58()), Some(pk));
    }

    /// Amount accepts exactly the range 1..=MAX.
    #[test]
    fn amount_range(value in 0u64..) {
        let result = Amount::new(value);
        prop_assert_eq!(result.is_ok(), value >= 1 && value <= Amount::MAX);
    }

    /// Amount decimal-string serde roundtrip is the identity.
    #[test]
    fn amount_serde_roundtrip(value in 1u64..=Amount::MAX) {
        let amount = Amount::new(value).unwrap();
        let json = serde_json::to_string(&amount).unwrap();
        let back: Amount = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(amount, back);
    }
}
