//! CNAM insurance-bond dossier and its approval state machine.
//!
//! The transition graph, the per-state required fields, and the complement
//! computation all live on the model so they can be exercised without any
//! storage in place. Services load a dossier, call [`CnamDossier::apply_transition`],
//! and persist the result under a per-dossier serialization discipline.

use serde::{Deserialize, Serialize};
use shared::{BondCategory, BondType, DossierStatus};

use crate::domain::commands::dossier::TransitionFields;

/// One entry in the append-only transition log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DossierHistoryEntry {
    pub timestamp: String,
    pub status: DossierStatus,
    pub note: Option<String>,
    pub actor: Option<String>,
}

/// The insurance-bond case record attached to a transaction's
/// insurance_bond payment detail. One active dossier per transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CnamDossier {
    pub id: String,
    pub transaction_id: String,
    pub payment_detail_id: Option<String>,
    pub bond_type: BondType,
    pub bond_category: BondCategory,
    pub status: DossierStatus,
    /// Fixed coverage snapshotted from the nomenclature when the bond type
    /// was chosen. Later catalog edits never alter it.
    pub bond_amount: f64,
    /// The transaction's total due the bond is measured against
    pub device_price: f64,
    pub submission_date: Option<String>,
    pub reminder_date: Option<String>,
    pub acceptance_date: Option<String>,
    pub expiration_date: Option<String>,
    pub note: Option<String>,
    /// Bumped on every write; storage uses it for conditional updates
    pub version: u32,
    /// Append-only; never rewritten or truncated
    pub history: Vec<DossierHistoryEntry>,
    pub created_at: String,
    pub updated_at: String,
}

/// Violations of the dossier state-machine rules
#[derive(Debug, thiserror::Error)]
pub enum DossierValidationError {
    #[error("cannot move a dossier from {from} to {to}")]
    IllegalTransition {
        from: DossierStatus,
        to: DossierStatus,
    },
    #[error("submission date required before marking dossier in progress")]
    MissingSubmissionDate,
    #[error("reminder date required when requesting a supplement")]
    MissingReminderDate,
    #[error("a note listing the missing items is required when requesting a supplement")]
    MissingSupplementNote,
    #[error("acceptance date required before marking dossier accepted")]
    MissingAcceptanceDate,
    #[error("expiration date required before marking dossier accepted")]
    MissingExpirationDate,
    #[error("approved bond amount required before marking dossier accepted")]
    MissingBondAmount,
    #[error("a rejection motive is required")]
    MissingRejectionMotive,
    #[error("bond amount can only be changed while the dossier is pending, or for 'other' bond types")]
    BondAmountLocked,
}

/// Complement owed by the patient when the bond covers less than the price
pub fn complement_amount(device_price: f64, bond_amount: f64) -> f64 {
    (device_price - bond_amount).max(0.0)
}

pub fn needs_complement(device_price: f64, bond_amount: f64) -> bool {
    device_price > bond_amount
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}

impl CnamDossier {
    pub fn generate_id(transaction_id: &str, now_millis: u64) -> String {
        format!("dossier::{}::{}", transaction_id, now_millis)
    }

    /// Open a new dossier in pending status. The history starts with a
    /// pending entry so the log is a complete account of the case.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        transaction_id: String,
        payment_detail_id: Option<String>,
        bond_type: BondType,
        bond_category: BondCategory,
        bond_amount: f64,
        device_price: f64,
        actor: Option<String>,
        now: &str,
    ) -> Self {
        let opening = DossierHistoryEntry {
            timestamp: now.to_string(),
            status: DossierStatus::Pending,
            note: None,
            actor: actor.clone(),
        };
        Self {
            id,
            transaction_id,
            payment_detail_id,
            bond_type,
            bond_category,
            status: DossierStatus::Pending,
            bond_amount,
            device_price,
            submission_date: None,
            reminder_date: None,
            acceptance_date: None,
            expiration_date: None,
            note: None,
            version: 0,
            history: vec![opening],
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }

    pub fn complement_amount(&self) -> f64 {
        complement_amount(self.device_price, self.bond_amount)
    }

    pub fn needs_complement(&self) -> bool {
        needs_complement(self.device_price, self.bond_amount)
    }

    /// Whether the transition graph allows moving to `target` from the
    /// current status. Any non-terminal state may reject; accepted and
    /// rejected are terminal.
    pub fn can_transition_to(&self, target: DossierStatus) -> bool {
        use DossierStatus::*;
        match (self.status, target) {
            (Pending, InProgress) | (Pending, NeedsSupplement) => true,
            (InProgress, NeedsSupplement) | (InProgress, Accepted) => true,
            (NeedsSupplement, InProgress) => true,
            (from, Rejected) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Check the per-state required fields for `target`, taking fields
    /// already on the dossier into account. Blank strings count as missing.
    fn validate_fields(
        &self,
        target: DossierStatus,
        fields: &TransitionFields,
    ) -> Result<(), DossierValidationError> {
        if let Some(new_amount) = fields.bond_amount {
            let changed = (new_amount - self.bond_amount).abs() > f64::EPSILON;
            let editable =
                self.status == DossierStatus::Pending || self.bond_type == BondType::Other;
            if changed && !editable {
                return Err(DossierValidationError::BondAmountLocked);
            }
        }

        match target {
            DossierStatus::Pending => Ok(()),
            DossierStatus::InProgress => {
                if is_blank(&fields.submission_date) && is_blank(&self.submission_date) {
                    return Err(DossierValidationError::MissingSubmissionDate);
                }
                Ok(())
            }
            DossierStatus::NeedsSupplement => {
                if is_blank(&fields.reminder_date) && is_blank(&self.reminder_date) {
                    return Err(DossierValidationError::MissingReminderDate);
                }
                if is_blank(&fields.note) {
                    return Err(DossierValidationError::MissingSupplementNote);
                }
                Ok(())
            }
            DossierStatus::Accepted => {
                if is_blank(&fields.acceptance_date) && is_blank(&self.acceptance_date) {
                    return Err(DossierValidationError::MissingAcceptanceDate);
                }
                if is_blank(&fields.expiration_date) && is_blank(&self.expiration_date) {
                    return Err(DossierValidationError::MissingExpirationDate);
                }
                let approved = fields.bond_amount.unwrap_or(self.bond_amount);
                if approved <= 0.0 {
                    return Err(DossierValidationError::MissingBondAmount);
                }
                Ok(())
            }
            DossierStatus::Rejected => {
                if is_blank(&fields.note) {
                    return Err(DossierValidationError::MissingRejectionMotive);
                }
                Ok(())
            }
        }
    }

    /// Commit a transition: reachability check, required-field validation,
    /// field merge, history append, status update, version bump.
    ///
    /// On error the dossier is left untouched.
    pub fn apply_transition(
        &mut self,
        target: DossierStatus,
        fields: &TransitionFields,
        now: &str,
    ) -> Result<(), DossierValidationError> {
        if !self.can_transition_to(target) {
            return Err(DossierValidationError::IllegalTransition {
                from: self.status,
                to: target,
            });
        }
        self.validate_fields(target, fields)?;

        if let Some(submission_date) = &fields.submission_date {
            self.submission_date = Some(submission_date.clone());
        }
        if let Some(reminder_date) = &fields.reminder_date {
            self.reminder_date = Some(reminder_date.clone());
        }
        if let Some(acceptance_date) = &fields.acceptance_date {
            self.acceptance_date = Some(acceptance_date.clone());
        }
        if let Some(expiration_date) = &fields.expiration_date {
            self.expiration_date = Some(expiration_date.clone());
        }
        if let Some(note) = &fields.note {
            self.note = Some(note.clone());
        }
        if let Some(bond_amount) = fields.bond_amount {
            self.bond_amount = bond_amount;
        }

        self.history.push(DossierHistoryEntry {
            timestamp: now.to_string(),
            status: target,
            note: fields.note.clone(),
            actor: fields.actor.clone(),
        });
        self.status = target;
        self.version += 1;
        self.updated_at = now.to_string();
        Ok(())
    }

    /// Clerical correction of the reminder date or note. Allowed in any
    /// state, including terminal ones; not a status change, so the history
    /// is untouched.
    pub fn amend(&mut self, reminder_date: Option<String>, note: Option<String>, now: &str) {
        if let Some(reminder_date) = reminder_date {
            self.reminder_date = Some(reminder_date);
        }
        if let Some(note) = note {
            self.note = Some(note);
        }
        self.version += 1;
        self.updated_at = now.to_string();
    }
}
