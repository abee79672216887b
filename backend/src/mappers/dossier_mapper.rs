use crate::domain::commands::dossier::TransitionFields;
use crate::domain::models::dossier::{CnamDossier, DossierHistoryEntry};
use shared::{
    CnamDossier as CnamDossierDto, DossierHistoryEntry as DossierHistoryEntryDto,
    DossierTransitionRequest,
};

pub struct DossierMapper;

impl DossierMapper {
    /// The complement figures are derived on read, never taken from storage.
    pub fn to_dto(domain: CnamDossier) -> CnamDossierDto {
        let complement_amount = domain.complement_amount();
        let needs_complement = domain.needs_complement();
        CnamDossierDto {
            id: domain.id,
            transaction_id: domain.transaction_id,
            payment_detail_id: domain.payment_detail_id,
            bond_type: domain.bond_type,
            bond_category: domain.bond_category,
            status: domain.status,
            bond_amount: domain.bond_amount,
            device_price: domain.device_price,
            complement_amount,
            needs_complement,
            submission_date: domain.submission_date,
            reminder_date: domain.reminder_date,
            acceptance_date: domain.acceptance_date,
            expiration_date: domain.expiration_date,
            note: domain.note,
            version: domain.version,
            history: domain
                .history
                .into_iter()
                .map(Self::history_entry_to_dto)
                .collect(),
            created_at: domain.created_at,
            updated_at: domain.updated_at,
        }
    }

    pub fn history_entry_to_dto(domain: DossierHistoryEntry) -> DossierHistoryEntryDto {
        DossierHistoryEntryDto {
            timestamp: domain.timestamp,
            status: domain.status,
            note: domain.note,
            actor: domain.actor,
        }
    }

    pub fn transition_fields(request: &DossierTransitionRequest) -> TransitionFields {
        TransitionFields {
            note: request.note.clone(),
            actor: request.actor.clone(),
            submission_date: request.submission_date.clone(),
            reminder_date: request.reminder_date.clone(),
            acceptance_date: request.acceptance_date.clone(),
            expiration_date: request.expiration_date.clone(),
            bond_amount: request.bond_amount,
        }
    }
}
