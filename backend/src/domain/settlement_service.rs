//! Reconciliation façade.
//!
//! The entry point a sale or rental checkout calls to settle its total due
//! across heterogeneous payment instruments. Validates the intents, rejects
//! over-payment beyond the configured tolerance, prices insurance bonds from
//! the nomenclature, opens the CNAM dossier when a bond is applied, and
//! returns the aggregated settlement view.
//!
//! Concurrent settlement of the same transaction must be serialized by the
//! caller: the over-payment check is only correct if no concurrent intent is
//! evaluated against a stale total.

use anyhow::Result;
use chrono::Utc;
use log::info;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use shared::{
    DisplayLabels, PaymentIntent, PaymentMethod, SettleRequest, SettleResponse, SettlementConfig,
};

use crate::domain::commands::settlement::OpenDossierCommand;
use crate::domain::dossier_service::DossierService;
use crate::domain::method_totals::group_by_method;
use crate::domain::models::payment::{InstrumentDetails, Payment, PaymentDetail, PaymentStatus};
use crate::domain::nomenclature_service::NomenclatureService;
use crate::domain::payment_extraction::PaymentExtraction;
use crate::mappers::{DossierMapper, PaymentMapper};
use crate::storage::{Connection, PaymentStorage};

/// Violations of the settlement rules
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("payments of {paid:.2} exceed the transaction total of {total:.2}")]
    Overpayment { paid: f64, total: f64 },
    #[error("at least one payment intent is required")]
    NoIntents,
    #[error("payment amounts must be non-negative numbers")]
    InvalidAmount,
    #[error("a transaction can carry at most one insurance bond")]
    MultipleBondIntents,
    #[error("an insurance bond intent must declare its bond type and category")]
    MissingBondNomenclatureKey,
    #[error("reference exceeds {max} characters")]
    ReferenceTooLong { max: usize },
}

pub struct SettlementService<C: Connection> {
    payment_repository: C::PaymentRepository,
    dossier_service: DossierService<C>,
    nomenclature_service: NomenclatureService<C>,
    extraction: PaymentExtraction,
    labels: DisplayLabels,
    config: SettlementConfig,
}

impl<C: Connection> Clone for SettlementService<C>
where
    C::PaymentRepository: Clone,
    C::DossierRepository: Clone,
    C::NomenclatureRepository: Clone,
{
    fn clone(&self) -> Self {
        Self {
            payment_repository: self.payment_repository.clone(),
            dossier_service: self.dossier_service.clone(),
            nomenclature_service: self.nomenclature_service.clone(),
            extraction: self.extraction.clone(),
            labels: self.labels.clone(),
            config: self.config.clone(),
        }
    }
}

impl<C: Connection> SettlementService<C> {
    pub fn new(connection: Arc<C>) -> Self {
        Self::with_config(connection, SettlementConfig::default(), DisplayLabels::default())
    }

    pub fn with_config(connection: Arc<C>, config: SettlementConfig, labels: DisplayLabels) -> Self {
        let payment_repository = connection.create_payment_repository();
        let dossier_service = DossierService::new(connection.clone());
        let nomenclature_service = NomenclatureService::new(connection);
        Self {
            payment_repository,
            dossier_service,
            nomenclature_service,
            extraction: PaymentExtraction::with_labels(labels.clone()),
            labels,
            config,
        }
    }

    /// Settle a transaction's total due against a list of payment intents.
    ///
    /// Under-payment is allowed and produces an outstanding balance;
    /// over-payment beyond the rounding tolerance is rejected. An
    /// insurance-bond intent is priced from the nomenclature (its declared
    /// amount is ignored) and initializes a pending dossier whose complement
    /// is surfaced for the caller to request as a follow-up instrument —
    /// never auto-settled.
    pub async fn settle(&self, request: SettleRequest) -> Result<SettleResponse> {
        self.validate_intents(&request.intents)?;

        // At most one insurance-bond intent; when present, price it from the
        // nomenclature before anything else. (bond index, type, category, amount)
        let bond = match self.single_bond_index(&request.intents)? {
            Some(index) => {
                let intent = &request.intents[index];
                let (bond_type, category) = match (intent.bond_type, intent.bond_category) {
                    (Some(bond_type), Some(category)) => (bond_type, category),
                    _ => return Err(SettlementError::MissingBondNomenclatureKey.into()),
                };
                let entry = self.nomenclature_service.lookup(bond_type, category).await?;
                Some((index, bond_type, category, entry.effective_amount()))
            }
            None => None,
        };
        let bond_amount = bond.map(|(_, _, _, amount)| amount);

        let covered = self.covered_sum(&request.intents, bond_amount, request.transaction_total);
        if covered > request.transaction_total + self.config.rounding_tolerance {
            return Err(SettlementError::Overpayment {
                paid: covered,
                total: request.transaction_total,
            }
            .into());
        }

        let now = Utc::now().to_rfc3339();
        let now_millis = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis() as u64;
        let mut details: Vec<PaymentDetail> = request
            .intents
            .iter()
            .map(|intent| self.mint_detail(intent, bond_amount))
            .collect();

        let dossier = match bond {
            Some((index, bond_type, category, amount)) => {
                let dossier = self
                    .dossier_service
                    .open_dossier(OpenDossierCommand {
                        transaction_id: request.transaction_id.clone(),
                        payment_detail_id: Some(details[index].id.clone()),
                        bond_type,
                        bond_category: category,
                        bond_amount: amount,
                        device_price: request.transaction_total,
                        actor: request.actor.clone(),
                    })
                    .await?;
                if let Some(InstrumentDetails::InsuranceBond { dossier_id, .. }) =
                    details[index].instrument.as_mut()
                {
                    *dossier_id = Some(dossier.id.clone());
                }
                Some(dossier)
            }
            None => None,
        };

        let payment = Payment {
            id: Payment::generate_id(&request.transaction_id, now_millis),
            transaction_id: request.transaction_id.clone(),
            status: PaymentStatus::Settled,
            amount: 0.0,
            method: None,
            details,
            legacy_payload: None,
            created_at: now,
        };
        self.payment_repository.store_payment(&payment).await?;

        let normalized = self.extraction.extract(&payment);
        let grouped = group_by_method(&normalized, &self.labels);
        let outstanding_balance = (request.transaction_total - covered).max(0.0);
        let (needs_complement, complement_amount) = dossier
            .as_ref()
            .map(|d| (d.needs_complement(), d.complement_amount()))
            .unwrap_or((false, 0.0));

        info!(
            "Settled transaction {}: {:.2} of {:.2} covered across {} instruments",
            request.transaction_id,
            covered,
            request.transaction_total,
            payment.details.len()
        );

        let success_message = if outstanding_balance > 0.0 {
            format!(
                "Payment recorded, {:.2} outstanding",
                outstanding_balance
            )
        } else {
            "Payment recorded in full".to_string()
        };
        Ok(SettleResponse {
            payment_id: payment.id,
            accepted: PaymentMapper::details_to_dto(normalized),
            grouped_by_method: PaymentMapper::groups_to_dto(grouped),
            outstanding_balance,
            needs_complement,
            complement_amount,
            dossier: dossier.map(DossierMapper::to_dto),
            success_message,
        })
    }

    fn validate_intents(&self, intents: &[PaymentIntent]) -> Result<()> {
        if intents.is_empty() {
            return Err(SettlementError::NoIntents.into());
        }
        for intent in intents {
            if !intent.amount.is_finite() || intent.amount < 0.0 {
                return Err(SettlementError::InvalidAmount.into());
            }
            if intent
                .reference
                .as_deref()
                .is_some_and(|r| r.len() > self.config.max_note_length)
            {
                return Err(SettlementError::ReferenceTooLong {
                    max: self.config.max_note_length,
                }
                .into());
            }
        }
        Ok(())
    }

    fn single_bond_index(&self, intents: &[PaymentIntent]) -> Result<Option<usize>> {
        let mut bonds = intents
            .iter()
            .enumerate()
            .filter(|(_, i)| i.method == PaymentMethod::InsuranceBond)
            .map(|(index, _)| index);
        let first = bonds.next();
        if bonds.next().is_some() {
            return Err(SettlementError::MultipleBondIntents.into());
        }
        Ok(first)
    }

    /// Sum the coverage the intents bring to the transaction. A bond
    /// contributes min(bond amount, total): coverage richer than the device
    /// price is not an over-payment.
    fn covered_sum(
        &self,
        intents: &[PaymentIntent],
        bond_amount: Option<f64>,
        transaction_total: f64,
    ) -> f64 {
        intents
            .iter()
            .map(|intent| {
                if intent.method == PaymentMethod::InsuranceBond {
                    bond_amount.unwrap_or(0.0).min(transaction_total)
                } else {
                    intent.amount
                }
            })
            .sum()
    }

    fn mint_detail(&self, intent: &PaymentIntent, bond_amount: Option<f64>) -> PaymentDetail {
        let amount = if intent.method == PaymentMethod::InsuranceBond {
            bond_amount.unwrap_or(0.0)
        } else {
            intent.amount
        };
        PaymentDetail {
            id: Uuid::new_v4().to_string(),
            method: intent.method,
            amount,
            classification: intent.classification,
            reference: intent.reference.clone(),
            instrument: self.build_instrument(intent),
        }
    }

    fn build_instrument(&self, intent: &PaymentIntent) -> Option<InstrumentDetails> {
        match intent.method {
            PaymentMethod::Cheque => match (&intent.reference, &intent.bank) {
                (Some(number), Some(bank)) => Some(InstrumentDetails::Cheque {
                    number: number.clone(),
                    bank: bank.clone(),
                }),
                _ => None,
            },
            PaymentMethod::Transfer => intent.reference.as_ref().map(|reference| {
                InstrumentDetails::Transfer {
                    reference: reference.clone(),
                    bank: intent.bank.clone(),
                }
            }),
            PaymentMethod::PromissoryNote => match (&intent.due_date, &intent.bank) {
                (Some(due_date), Some(bank)) => Some(InstrumentDetails::PromissoryNote {
                    due_date: due_date.clone(),
                    bank: bank.clone(),
                }),
                _ => None,
            },
            PaymentMethod::PostalOrder => intent.reference.as_ref().map(|number| {
                InstrumentDetails::PostalOrder {
                    number: number.clone(),
                }
            }),
            PaymentMethod::InsuranceBond => Some(InstrumentDetails::InsuranceBond {
                bond_type: intent.bond_type.unwrap_or(shared::BondType::Other),
                category: intent.bond_category.unwrap_or(shared::BondCategory::Purchase),
                dossier_id: None,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::csv::CsvConnection;
    use shared::{BondCategory, BondType, DossierStatus, PaymentClassification};
    use tempfile::tempdir;

    async fn create_test_service() -> (SettlementService<CsvConnection>, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let connection = Arc::new(CsvConnection::new(temp_dir.path()).unwrap());
        let service = SettlementService::new(connection.clone());
        service.nomenclature_service.seed_defaults().await.unwrap();
        (service, temp_dir)
    }

    fn cash_intent(amount: f64) -> PaymentIntent {
        PaymentIntent {
            method: PaymentMethod::Cash,
            amount,
            classification: PaymentClassification::Principal,
            reference: None,
            bank: None,
            due_date: None,
            bond_type: None,
            bond_category: None,
        }
    }

    fn cheque_intent(amount: f64, number: &str) -> PaymentIntent {
        PaymentIntent {
            method: PaymentMethod::Cheque,
            amount,
            classification: PaymentClassification::Principal,
            reference: Some(number.to_string()),
            bank: Some("BIAT".to_string()),
            due_date: None,
            bond_type: None,
            bond_category: None,
        }
    }

    fn bond_intent(bond_type: BondType, category: BondCategory) -> PaymentIntent {
        PaymentIntent {
            method: PaymentMethod::InsuranceBond,
            amount: 0.0,
            classification: PaymentClassification::Principal,
            reference: None,
            bank: None,
            due_date: None,
            bond_type: Some(bond_type),
            bond_category: Some(category),
        }
    }

    fn settle_request(transaction_id: &str, total: f64, intents: Vec<PaymentIntent>) -> SettleRequest {
        SettleRequest {
            transaction_id: transaction_id.to_string(),
            transaction_total: total,
            intents,
            actor: Some("clerk".to_string()),
        }
    }

    #[tokio::test]
    async fn test_settle_in_full_with_two_instruments() {
        let (service, _temp) = create_test_service().await;
        let response = service
            .settle(settle_request(
                "tx-1",
                300.0,
                vec![cash_intent(100.0), cheque_intent(200.0, "0031245")],
            ))
            .await
            .unwrap();

        assert_eq!(response.outstanding_balance, 0.0);
        assert!(response.dossier.is_none());
        assert_eq!(response.accepted.len(), 2);
        assert_eq!(response.grouped_by_method.len(), 2);
        assert_eq!(response.grouped_by_method[0].total_amount, 100.0);
        assert_eq!(response.grouped_by_method[1].total_amount, 200.0);
        assert_eq!(response.success_message, "Payment recorded in full");
    }

    #[tokio::test]
    async fn test_under_payment_produces_outstanding_balance() {
        let (service, _temp) = create_test_service().await;
        let response = service
            .settle(settle_request("tx-1", 500.0, vec![cash_intent(200.0)]))
            .await
            .unwrap();
        assert_eq!(response.outstanding_balance, 300.0);
        assert!(response.success_message.contains("300.00 outstanding"));
    }

    #[tokio::test]
    async fn test_over_payment_beyond_tolerance_rejected() {
        let (service, _temp) = create_test_service().await;
        let err = service
            .settle(settle_request("tx-1", 100.0, vec![cash_intent(100.02)]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exceed the transaction total"));
    }

    #[tokio::test]
    async fn test_over_payment_within_tolerance_accepted() {
        let (service, _temp) = create_test_service().await;
        let response = service
            .settle(settle_request("tx-1", 100.0, vec![cash_intent(100.005)]))
            .await
            .unwrap();
        assert_eq!(response.outstanding_balance, 0.0);
    }

    #[tokio::test]
    async fn test_bond_intent_opens_pending_dossier_with_complement() {
        let (service, _temp) = create_test_service().await;
        let response = service
            .settle(settle_request(
                "tx-1",
                350.0,
                vec![bond_intent(BondType::Mask, BondCategory::Purchase)],
            ))
            .await
            .unwrap();

        let dossier = response.dossier.unwrap();
        assert_eq!(dossier.status, DossierStatus::Pending);
        assert_eq!(dossier.bond_amount, 200.0);
        assert_eq!(dossier.device_price, 350.0);
        assert!(response.needs_complement);
        assert_eq!(response.complement_amount, 150.0);
        assert_eq!(response.outstanding_balance, 150.0);
        // The bond detail carries the resolved coverage, not the declared 0.
        assert_eq!(response.accepted[0].amount, Some(200.0));
    }

    #[tokio::test]
    async fn test_bond_covering_full_price_needs_no_complement() {
        let (service, _temp) = create_test_service().await;
        let response = service
            .settle(settle_request(
                "tx-1",
                1475.0,
                vec![bond_intent(BondType::Cpap, BondCategory::Purchase)],
            ))
            .await
            .unwrap();
        assert!(!response.needs_complement);
        assert_eq!(response.complement_amount, 0.0);
        assert_eq!(response.outstanding_balance, 0.0);
    }

    #[tokio::test]
    async fn test_bond_richer_than_price_is_not_an_over_payment() {
        let (service, _temp) = create_test_service().await;
        let response = service
            .settle(settle_request(
                "tx-1",
                1200.0,
                vec![bond_intent(BondType::Cpap, BondCategory::Purchase)],
            ))
            .await
            .unwrap();
        assert_eq!(response.outstanding_balance, 0.0);
        assert!(!response.needs_complement);
    }

    #[tokio::test]
    async fn test_multiple_bond_intents_rejected() {
        let (service, _temp) = create_test_service().await;
        let err = service
            .settle(settle_request(
                "tx-1",
                2000.0,
                vec![
                    bond_intent(BondType::Cpap, BondCategory::Purchase),
                    bond_intent(BondType::Mask, BondCategory::Purchase),
                ],
            ))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("at most one insurance bond"));
    }

    #[tokio::test]
    async fn test_bond_without_nomenclature_key_rejected() {
        let (service, _temp) = create_test_service().await;
        let mut intent = bond_intent(BondType::Cpap, BondCategory::Purchase);
        intent.bond_type = None;
        let err = service
            .settle(settle_request("tx-1", 1475.0, vec![intent]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("bond type and category"));
    }

    #[tokio::test]
    async fn test_unpriced_bond_type_propagates_not_found() {
        let (service, _temp) = create_test_service().await;
        let err = service
            .settle(settle_request(
                "tx-1",
                500.0,
                vec![bond_intent(BondType::Other, BondCategory::Purchase)],
            ))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no active nomenclature entry"));
    }

    #[tokio::test]
    async fn test_negative_intent_amount_rejected() {
        let (service, _temp) = create_test_service().await;
        let err = service
            .settle(settle_request("tx-1", 100.0, vec![cash_intent(-5.0)]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("non-negative"));
    }

    #[tokio::test]
    async fn test_nomenclature_edits_are_not_retroactive() {
        let (service, _temp) = create_test_service().await;
        let response = service
            .settle(settle_request(
                "tx-1",
                350.0,
                vec![bond_intent(BondType::Mask, BondCategory::Purchase)],
            ))
            .await
            .unwrap();
        let dossier_id = response.dossier.unwrap().id;

        service
            .nomenclature_service
            .update_entry(shared::UpdateNomenclatureRequest {
                bond_type: BondType::Mask,
                category: BondCategory::Purchase,
                amount: Some(500.0),
                monthly_rate: None,
                is_active: None,
            })
            .await
            .unwrap();

        let stored = service
            .dossier_service
            .get_dossier(&dossier_id)
            .await
            .unwrap()
            .dossier
            .unwrap();
        assert_eq!(stored.bond_amount, 200.0);
        assert_eq!(stored.complement_amount, 150.0);
    }

    #[tokio::test]
    async fn test_settled_payment_is_readable_through_extraction() {
        let (service, _temp) = create_test_service().await;
        let response = service
            .settle(settle_request(
                "tx-1",
                300.0,
                vec![cash_intent(100.0), cheque_intent(200.0, "0031245")],
            ))
            .await
            .unwrap();

        let payment = service
            .payment_repository
            .get_payment(&response.payment_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Settled);
        let normalized = service.extraction.extract(&payment);
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[1].bank.as_deref(), Some("BIAT"));
    }
}
