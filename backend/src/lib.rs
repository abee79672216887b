//! Medirent backend — payment reconciliation and CNAM dossier core.
//!
//! This crate is the settlement engine of the Medirent back office: it
//! normalizes payment details across the two historical storage shapes,
//! aggregates them per method, prices CNAM insurance bonds from the
//! nomenclature catalog, and tracks each bond dossier through its approval
//! lifecycle. Patient, appointment, and device management live elsewhere and
//! call into this crate when a sale or rental is settled.

pub mod domain;
pub mod mappers;
pub mod storage;
