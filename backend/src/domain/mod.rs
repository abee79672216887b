//! # Domain Module
//!
//! Business logic of the Medirent payment core.
//!
//! This module encapsulates settlement, extraction, and dossier rules
//! independently of any storage backend or UI framework.
//!
//! ## Module Organization
//!
//! - **payment_extraction**: normalized detail extraction across structured
//!   and legacy storage shapes
//! - **method_totals**: pure per-method aggregation of a settlement view
//! - **settlement_service**: the reconciliation façade called at checkout
//! - **dossier_service**: CNAM dossier lifecycle over the state machine in
//!   `models::dossier`
//! - **nomenclature_service**: administrative bond-coverage catalog
//! - **payment_service**: read side of the settlement view
//!
//! ## Key Business Rules
//!
//! - A settlement may under-pay (outstanding balance) but never over-pay
//!   beyond the rounding tolerance
//! - A transaction carries at most one insurance bond and one active dossier
//! - A dossier snapshots its bond amount; nomenclature edits are never
//!   retroactive
//! - Dossier history is append-only, one entry per committed transition

pub mod commands;
pub mod dossier_service;
pub mod method_totals;
pub mod models;
pub mod nomenclature_service;
pub mod payment_extraction;
pub mod payment_service;
pub mod settlement_service;

pub use dossier_service::DossierService;
pub use method_totals::{group_by_method, MethodGroupView};
pub use nomenclature_service::NomenclatureService;
pub use payment_extraction::PaymentExtraction;
pub use payment_service::PaymentService;
pub use settlement_service::{SettlementError, SettlementService};
