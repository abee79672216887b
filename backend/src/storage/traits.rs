//! # Storage Traits
//!
//! Storage abstraction traits that let the domain layer work with different
//! backends without modification. Persistence of the production system is
//! the calling context's concern; this crate ships one CSV-file backend for
//! tests and small deployments.
//!
//! Concurrent settlement of the same transaction, and concurrent transitions
//! of the same dossier, must be serialized by the caller — the conditional
//! dossier write below supports a version-token discipline.

use anyhow::Result;
use async_trait::async_trait;
use shared::{BondCategory, BondType};

use crate::domain::models::dossier::CnamDossier;
use crate::domain::models::nomenclature::BondNomenclatureEntry;
use crate::domain::models::payment::Payment;

/// Keyed read/write access to payment aggregates
#[async_trait]
pub trait PaymentStorage: Send + Sync {
    /// Store a new payment
    async fn store_payment(&self, payment: &Payment) -> Result<()>;

    /// Retrieve a payment by ID
    async fn get_payment(&self, payment_id: &str) -> Result<Option<Payment>>;

    /// List every payment recorded against a transaction
    async fn list_payments_for_transaction(&self, transaction_id: &str) -> Result<Vec<Payment>>;

    /// Replace an existing payment
    async fn update_payment(&self, payment: &Payment) -> Result<()>;
}

/// Keyed read/write access to CNAM dossiers
#[async_trait]
pub trait DossierStorage: Send + Sync {
    /// Store a new dossier
    async fn store_dossier(&self, dossier: &CnamDossier) -> Result<()>;

    /// Retrieve a dossier by ID
    async fn get_dossier(&self, dossier_id: &str) -> Result<Option<CnamDossier>>;

    /// The non-terminal dossier attached to a transaction, if any.
    /// A transaction has at most one.
    async fn get_active_dossier_for_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<CnamDossier>>;

    /// Conditional write: replaces the dossier only if the stored version
    /// still matches `expected_version`. Returns false on a version
    /// mismatch so two concurrent transitions from the same source state
    /// cannot both succeed.
    async fn update_dossier(&self, dossier: &CnamDossier, expected_version: u32) -> Result<bool>;

    /// List all dossiers
    async fn list_dossiers(&self) -> Result<Vec<CnamDossier>>;
}

/// Read/write access to the bond nomenclature catalog, keyed by
/// (bond type, category)
#[async_trait]
pub trait NomenclatureStorage: Send + Sync {
    /// Store a new entry
    async fn store_entry(&self, entry: &BondNomenclatureEntry) -> Result<()>;

    /// Retrieve an entry by key
    async fn get_entry(
        &self,
        bond_type: BondType,
        category: BondCategory,
    ) -> Result<Option<BondNomenclatureEntry>>;

    /// List the whole catalog
    async fn list_entries(&self) -> Result<Vec<BondNomenclatureEntry>>;

    /// Replace an existing entry
    async fn update_entry(&self, entry: &BondNomenclatureEntry) -> Result<()>;

    /// Delete an entry by key. Returns true if one was removed.
    async fn delete_entry(&self, bond_type: BondType, category: BondCategory) -> Result<bool>;
}

/// Factory trait abstracting the connection type so the domain layer can be
/// constructed over any backend.
pub trait Connection: Send + Sync + Clone {
    type PaymentRepository: PaymentStorage;
    type DossierRepository: DossierStorage;
    type NomenclatureRepository: NomenclatureStorage;

    fn create_payment_repository(&self) -> Self::PaymentRepository;
    fn create_dossier_repository(&self) -> Self::DossierRepository;
    fn create_nomenclature_repository(&self) -> Self::NomenclatureRepository;
}
