//! The validation error taxonomy shared across crates.
//!
//! Every rejection carries the specific rule it violated; callers (HTTP
//! boundary, tests) depend on the kind and message, so errors are never
//! collapsed into a bare boolean.

use thiserror::Error;

/// Why a transaction, election, or vote was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Malformed shape: missing fields, bad types, unsupported version.
    #[error("invalid transaction schema: {reason}")]
    Schema { reason: String },

    /// The declared id does not match the hash of the canonical body.
    #[error("the transaction's id '{id}' isn't equal to the hash of its body")]
    InvalidHash { id: String },

    /// A fulfillment failed cryptographic verification.
    #[error("invalid signature: {reason}")]
    InvalidSignature { reason: String },

    /// Amount positivity or bound violated.
    #[error("invalid amount: {reason}")]
    Amount { reason: String },

    /// Divisible-asset conservation violated: inputs and outputs differ.
    #[error("amount mismatch: inputs spend {spent}, outputs lock {locked}")]
    AmountMismatch { spent: u64, locked: u64 },

    /// Inputs of one transaction resolve to different asset lineages.
    #[error("all inputs must have the same asset id")]
    AssetIdMismatch,

    /// A referenced output is already spent by another transaction.
    #[error("tx \"{txid}\" spends inputs twice")]
    DoubleSpend { txid: String },

    /// More than one durably committed transaction spends the same output.
    /// This is an unrecoverable consistency violation, not a user error.
    #[error("`{txid}` was spent more than once; there is a problem with the chain")]
    CriticalDoubleSpend { txid: String },

    /// A voter cast more than one block vote. Byzantine or badly
    /// misconfigured behavior the consensus layer should have prevented.
    #[error("node `{pubkey}` cast multiple votes on the same block")]
    CriticalDuplicateVote { pubkey: String },

    /// A transaction with this id already exists.
    #[error("transaction `{txid}` already exists")]
    DuplicateTransaction { txid: String },

    /// An input references a transaction the ledger does not know about.
    #[error("input transaction `{txid}`, output {output} does not exist")]
    InputDoesNotExist { txid: String, output: usize },

    /// Elections must be proposed through a single input with a single owner.
    #[error("`tx_signers` must be a list instance of length one")]
    MultipleInputs,

    /// The election initiator is not part of the current validator set.
    #[error("public key is not a part of the validator set")]
    InvalidProposer,

    /// Election outputs do not match the current validator set's topology.
    #[error("validator set must be exactly same to the outputs of election")]
    UnequalValidatorSet,

    /// A single election may not change a validator's power by >= 1/3 of
    /// the total power.
    #[error("`power` change must be less than 1/3 of total power")]
    InvalidPowerChange,

    /// A condition tree exceeds the configured nesting depth.
    #[error("threshold condition tree is nested too deeply")]
    ThresholdTooDeep,

    /// A private key required for signing was not supplied.
    #[error("public key {pubkey} is not a pair to any of the private keys")]
    KeypairMismatch { pubkey: String },

    /// A storage failure surfaced during a store-dependent check. Never
    /// swallowed as "invalid transaction".
    #[error("store error: {0}")]
    Store(String),
}

impl ValidationError {
    /// True for invariant violations that should halt/alert the operator
    /// rather than be reported back to a submitter.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            ValidationError::CriticalDoubleSpend { .. }
                | ValidationError::CriticalDuplicateVote { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_mismatch_message_names_both_sums() {
        let err = ValidationError::AmountMismatch {
            spent: 7,
            locked: 8,
        };
        let msg = err.to_string();
        assert!(msg.contains('7'));
        assert!(msg.contains('8'));
    }

    #[test]
    fn critical_errors_are_flagged() {
        assert!(ValidationError::CriticalDoubleSpend { txid: "ab".into() }.is_critical());
        assert!(ValidationError::CriticalDuplicateVote { pubkey: "pk".into() }.is_critical());
        assert!(!ValidationError::DoubleSpend { txid: "ab".into() }.is_critical());
    }
}
