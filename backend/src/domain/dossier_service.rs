//! CNAM dossier lifecycle service.
//!
//! Loads dossiers, applies the model's transition rules, and persists the
//! result through a conditional write so two concurrent transitions from the
//! same source state cannot both succeed.

use anyhow::{anyhow, Result};
use chrono::Utc;
use log::info;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use shared::{
    AmendDossierRequest, AmendDossierResponse, DossierHistoryEntry as DossierHistoryEntryDto,
    DossierTransitionRequest, DossierTransitionResponse, GetDossierResponse,
};

use crate::domain::commands::settlement::OpenDossierCommand;
use crate::domain::models::dossier::CnamDossier;
use crate::mappers::DossierMapper;
use crate::storage::{Connection, DossierStorage};

pub struct DossierService<C: Connection> {
    dossier_repository: C::DossierRepository,
}

impl<C: Connection> Clone for DossierService<C>
where
    C::DossierRepository: Clone,
{
    fn clone(&self) -> Self {
        Self {
            dossier_repository: self.dossier_repository.clone(),
        }
    }
}

impl<C: Connection> DossierService<C> {
    pub fn new(connection: Arc<C>) -> Self {
        let dossier_repository = connection.create_dossier_repository();
        Self { dossier_repository }
    }

    /// Open a pending dossier for a transaction. A transaction may have at
    /// most one active dossier.
    pub async fn open_dossier(&self, command: OpenDossierCommand) -> Result<CnamDossier> {
        if let Some(existing) = self
            .dossier_repository
            .get_active_dossier_for_transaction(&command.transaction_id)
            .await?
        {
            return Err(anyhow!(
                "transaction {} already has an active dossier ({})",
                command.transaction_id,
                existing.id
            ));
        }

        let now_millis = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis() as u64;
        let dossier = CnamDossier::new(
            CnamDossier::generate_id(&command.transaction_id, now_millis),
            command.transaction_id,
            command.payment_detail_id,
            command.bond_type,
            command.bond_category,
            command.bond_amount,
            command.device_price,
            command.actor,
            &Utc::now().to_rfc3339(),
        );
        self.dossier_repository.store_dossier(&dossier).await?;
        info!(
            "Opened dossier {} ({} {}, coverage {:.2} against {:.2})",
            dossier.id,
            dossier.bond_type,
            dossier.bond_category,
            dossier.bond_amount,
            dossier.device_price
        );
        Ok(dossier)
    }

    pub async fn get_dossier(&self, dossier_id: &str) -> Result<GetDossierResponse> {
        let dossier = self.dossier_repository.get_dossier(dossier_id).await?;
        Ok(GetDossierResponse {
            dossier: dossier.map(DossierMapper::to_dto),
        })
    }

    pub async fn get_active_dossier_for_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<GetDossierResponse> {
        let dossier = self
            .dossier_repository
            .get_active_dossier_for_transaction(transaction_id)
            .await?;
        Ok(GetDossierResponse {
            dossier: dossier.map(DossierMapper::to_dto),
        })
    }

    /// Apply a status transition. The model enforces reachability and the
    /// per-state required fields; on success exactly one history entry is
    /// appended and the dossier is persisted conditionally on its version.
    pub async fn transition(
        &self,
        request: DossierTransitionRequest,
    ) -> Result<DossierTransitionResponse> {
        let mut dossier = self
            .dossier_repository
            .get_dossier(&request.dossier_id)
            .await?
            .ok_or_else(|| anyhow!("dossier {} not found", request.dossier_id))?;

        let expected_version = dossier.version;
        let fields = DossierMapper::transition_fields(&request);
        dossier.apply_transition(request.target_status, &fields, &Utc::now().to_rfc3339())?;

        let written = self
            .dossier_repository
            .update_dossier(&dossier, expected_version)
            .await?;
        if !written {
            return Err(anyhow!(
                "dossier {} was modified concurrently, reload and retry",
                dossier.id
            ));
        }

        info!("Dossier {} marked {}", dossier.id, dossier.status);
        let success_message = format!("Dossier marked {}", dossier.status);
        Ok(DossierTransitionResponse {
            dossier: DossierMapper::to_dto(dossier),
            success_message,
        })
    }

    /// Clerical correction of the reminder date or note; not a status
    /// change, so it is allowed in terminal states and leaves the history
    /// untouched.
    pub async fn amend(&self, request: AmendDossierRequest) -> Result<AmendDossierResponse> {
        let mut dossier = self
            .dossier_repository
            .get_dossier(&request.dossier_id)
            .await?
            .ok_or_else(|| anyhow!("dossier {} not found", request.dossier_id))?;

        let expected_version = dossier.version;
        dossier.amend(
            request.reminder_date,
            request.note,
            &Utc::now().to_rfc3339(),
        );

        let written = self
            .dossier_repository
            .update_dossier(&dossier, expected_version)
            .await?;
        if !written {
            return Err(anyhow!(
                "dossier {} was modified concurrently, reload and retry",
                dossier.id
            ));
        }

        Ok(AmendDossierResponse {
            dossier: DossierMapper::to_dto(dossier),
            success_message: "Dossier updated".to_string(),
        })
    }

    pub async fn history(&self, dossier_id: &str) -> Result<Vec<DossierHistoryEntryDto>> {
        let dossier = self
            .dossier_repository
            .get_dossier(dossier_id)
            .await?
            .ok_or_else(|| anyhow!("dossier {} not found", dossier_id))?;
        Ok(dossier
            .history
            .into_iter()
            .map(DossierMapper::history_entry_to_dto)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::csv::CsvConnection;
    use shared::{BondCategory, BondType, DossierStatus};
    use tempfile::tempdir;

    fn create_test_service() -> (DossierService<CsvConnection>, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let connection = Arc::new(CsvConnection::new(temp_dir.path()).unwrap());
        (DossierService::new(connection), temp_dir)
    }

    fn open_command(transaction_id: &str) -> OpenDossierCommand {
        OpenDossierCommand {
            transaction_id: transaction_id.to_string(),
            payment_detail_id: Some("detail-1".to_string()),
            bond_type: BondType::Mask,
            bond_category: BondCategory::Purchase,
            bond_amount: 200.0,
            device_price: 350.0,
            actor: Some("clerk".to_string()),
        }
    }

    fn transition_request(dossier_id: &str, target: DossierStatus) -> DossierTransitionRequest {
        DossierTransitionRequest {
            dossier_id: dossier_id.to_string(),
            target_status: target,
            note: None,
            actor: None,
            submission_date: None,
            reminder_date: None,
            acceptance_date: None,
            expiration_date: None,
            bond_amount: None,
        }
    }

    #[tokio::test]
    async fn test_open_dossier_surfaces_complement() {
        let (service, _temp) = create_test_service();
        let dossier = service.open_dossier(open_command("tx-1")).await.unwrap();
        assert_eq!(dossier.status, DossierStatus::Pending);
        assert!(dossier.needs_complement());
        assert_eq!(dossier.complement_amount(), 150.0);

        let stored = service.get_dossier(&dossier.id).await.unwrap();
        let dto = stored.dossier.unwrap();
        assert_eq!(dto.complement_amount, 150.0);
        assert!(dto.needs_complement);
    }

    #[tokio::test]
    async fn test_one_active_dossier_per_transaction() {
        let (service, _temp) = create_test_service();
        service.open_dossier(open_command("tx-1")).await.unwrap();
        let err = service.open_dossier(open_command("tx-1")).await.unwrap_err();
        assert!(err.to_string().contains("already has an active dossier"));

        // A different transaction is unaffected.
        service.open_dossier(open_command("tx-2")).await.unwrap();
    }

    #[tokio::test]
    async fn test_transition_persists_and_appends_history() {
        let (service, _temp) = create_test_service();
        let dossier = service.open_dossier(open_command("tx-1")).await.unwrap();

        let mut request = transition_request(&dossier.id, DossierStatus::InProgress);
        request.submission_date = Some("2026-08-08".to_string());
        let response = service.transition(request).await.unwrap();
        assert_eq!(response.dossier.status, DossierStatus::InProgress);
        assert_eq!(response.success_message, "Dossier marked in_progress");

        let history = service.history(&dossier.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].status, DossierStatus::InProgress);
    }

    #[tokio::test]
    async fn test_invalid_transition_names_the_missing_field() {
        let (service, _temp) = create_test_service();
        let dossier = service.open_dossier(open_command("tx-1")).await.unwrap();

        let err = service
            .transition(transition_request(&dossier.id, DossierStatus::InProgress))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("submission date required"));

        // Nothing was persisted.
        let history = service.history(&dossier.id).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_illegal_transition_from_terminal_state() {
        let (service, _temp) = create_test_service();
        let dossier = service.open_dossier(open_command("tx-1")).await.unwrap();

        let mut reject = transition_request(&dossier.id, DossierStatus::Rejected);
        reject.note = Some("wrong device category".to_string());
        service.transition(reject).await.unwrap();

        let mut reopen = transition_request(&dossier.id, DossierStatus::InProgress);
        reopen.submission_date = Some("2026-08-08".to_string());
        let err = service.transition(reopen).await.unwrap_err();
        assert!(err
            .to_string()
            .contains("cannot move a dossier from rejected to in_progress"));
    }

    #[tokio::test]
    async fn test_amend_in_terminal_state_keeps_history() {
        let (service, _temp) = create_test_service();
        let dossier = service.open_dossier(open_command("tx-1")).await.unwrap();

        let mut reject = transition_request(&dossier.id, DossierStatus::Rejected);
        reject.note = Some("duplicate request".to_string());
        service.transition(reject).await.unwrap();

        let response = service
            .amend(AmendDossierRequest {
                dossier_id: dossier.id.clone(),
                reminder_date: Some("2026-09-15".to_string()),
                note: None,
            })
            .await
            .unwrap();
        assert_eq!(response.dossier.status, DossierStatus::Rejected);
        assert_eq!(response.dossier.reminder_date.as_deref(), Some("2026-09-15"));
        assert_eq!(response.dossier.history.len(), 2);
    }
}
