//! Protocol parameters.
//!
//! There is no ambient global configuration: the validation engine takes a
//! `ProtocolParams` value in its constructor and threads it through.

use crate::Amount;

/// Transaction version accepted by this release.
pub const TX_VERSION: &str = "2.0";

/// Default bound on threshold condition nesting.
pub const MAX_CONDITION_DEPTH: usize = 100;

/// Tunable validation parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtocolParams {
    /// Upper bound on any single output amount.
    pub max_amount: u64,
    /// Maximum nesting depth of a threshold condition tree. Parsing or
    /// constructing past this depth fails with `ThresholdTooDeep`.
    pub max_condition_depth: usize,
    /// Transaction versions accepted by validation.
    pub supported_versions: Vec<String>,
    /// Vote ratio required to conclude an election.
    pub election_threshold: (u64, u64),
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            max_amount: Amount::MAX,
            max_condition_depth: MAX_CONDITION_DEPTH,
            supported_versions: vec![TX_VERSION.to_string()],
            election_threshold: (2, 3),
        }
    }
}

impl ProtocolParams {
    pub fn supports_version(&self, version: &str) -> bool {
        self.supported_versions.iter().any(|v| v == version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_supports_current_version() {
        let params = ProtocolParams::default();
        assert!(params.supports_version(TX_VERSION));
        assert!(!params.supports_version("1.0"));
    }
}
