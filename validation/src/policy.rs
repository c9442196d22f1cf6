//! Asset-composition policy.
//!
//! An asset declares its composition behavior in the CREATE payload under
//! `data.type`. The declared type governs how transfers of that asset may
//! combine and whether amounts must be conserved.

use lattice_transactions::Transaction;
use lattice_types::ValidationError;

/// How an asset behaves under transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AssetType {
    /// Single-lineage asset; amounts are strictly conserved.
    #[default]
    Pure,
    /// May be combined with other `Mix` assets in one transfer; amount
    /// conservation is waived for the combined lineages.
    Mix,
    /// Built from other assets; amounts are strictly conserved.
    Composition,
}

impl AssetType {
    /// The type an asset's CREATE declared, defaulting to `Pure`.
    pub fn of(create: &Transaction) -> Result<Self, ValidationError> {
        let declared = create
            .asset
            .data()
            .and_then(|data| data.get("type"))
            .and_then(|t| t.as_str());
        match declared {
            None => Ok(AssetType::Pure),
            Some("pure") => Ok(AssetType::Pure),
            Some("mix") => Ok(AssetType::Mix),
            Some("composition") => Ok(AssetType::Composition),
            Some(other) => Err(ValidationError::Schema {
                reason: format!("unknown asset type `{other}`"),
            }),
        }
    }
}

/// Strategy for the amount rules of each asset type. Pluggable so a
/// deployment can tighten the rules without forking the engine.
pub trait AssetPolicy {
    fn validate_pure(&self, spent: u64, locked: u64) -> Result<(), ValidationError>;
    fn validate_mix(&self, spent: u64, locked: u64) -> Result<(), ValidationError>;
    fn validate_composition(&self, spent: u64, locked: u64) -> Result<(), ValidationError>;

    fn validate(
        &self,
        asset_type: AssetType,
        spent: u64,
        locked: u64,
    ) -> Result<(), ValidationError> {
        match asset_type {
            AssetType::Pure => self.validate_pure(spent, locked),
            AssetType::Mix => self.validate_mix(spent, locked),
            AssetType::Composition => self.validate_composition(spent, locked),
        }
    }
}

/// The default composition rules: `pure` and `composition` conserve
/// amounts exactly, `mix` passes through.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardPolicy;

impl AssetPolicy for StandardPolicy {
    fn validate_pure(&self, spent: u64, locked: u64) -> Result<(), ValidationError> {
        if spent != locked {
            return Err(ValidationError::AmountMismatch { spent, locked });
        }
        Ok(())
    }

    fn validate_mix(&self, _spent: u64, _locked: u64) -> Result<(), ValidationError> {
        Ok(())
    }

    fn validate_composition(&self, spent: u64, locked: u64) -> Result<(), ValidationError> {
        if spent != locked {
            return Err(ValidationError::AmountMismatch { spent, locked });
        }
        Ok(())
    }
}
