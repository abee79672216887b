use serde::{Deserialize, Serialize};
use shared::{BondCategory, BondType};

/// Reference data: the fixed CNAM coverage for a (bond type, category) pair.
///
/// Edited only through the administrative catalog, never by transaction
/// flows. Dossiers snapshot the amount at creation, so catalog edits are
/// never retroactive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondNomenclatureEntry {
    pub bond_type: BondType,
    pub category: BondCategory,
    /// One-time coverage, used for purchases
    pub amount: f64,
    /// Monthly coverage, used for rentals
    pub monthly_rate: f64,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Violations of the nomenclature invariants
#[derive(Debug, thiserror::Error)]
pub enum NomenclatureValidationError {
    #[error("bond amount cannot be negative")]
    NegativeAmount,
    #[error("monthly rate cannot be negative")]
    NegativeMonthlyRate,
    #[error("a nomenclature entry already exists for {bond_type} {category}")]
    DuplicateEntry {
        bond_type: BondType,
        category: BondCategory,
    },
    #[error("no active nomenclature entry for {bond_type} {category}")]
    NotFound {
        bond_type: BondType,
        category: BondCategory,
    },
}

impl BondNomenclatureEntry {
    /// Build an entry, applying the category invariants: purchases carry no
    /// monthly rate (0), rentals default the rate to the one-time amount.
    pub fn new(
        bond_type: BondType,
        category: BondCategory,
        amount: f64,
        monthly_rate: Option<f64>,
        now: &str,
    ) -> Result<Self, NomenclatureValidationError> {
        if amount < 0.0 {
            return Err(NomenclatureValidationError::NegativeAmount);
        }
        if monthly_rate.is_some_and(|rate| rate < 0.0) {
            return Err(NomenclatureValidationError::NegativeMonthlyRate);
        }
        let monthly_rate = match category {
            BondCategory::Purchase => 0.0,
            BondCategory::Rental => monthly_rate.unwrap_or(amount),
        };
        Ok(Self {
            bond_type,
            category,
            amount,
            monthly_rate,
            is_active: true,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        })
    }

    /// The coverage a dossier snapshots: the one-time amount for purchases,
    /// the monthly rate for rentals.
    pub fn effective_amount(&self) -> f64 {
        match self.category {
            BondCategory::Purchase => self.amount,
            BondCategory::Rental => self.monthly_rate,
        }
    }
}
