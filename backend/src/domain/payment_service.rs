//! Read side of the settlement view.
//!
//! Loads stored payments and returns their normalized details plus the
//! per-method grouping, transparently across structured and legacy records.

use anyhow::{anyhow, Result};
use std::sync::Arc;

use shared::{DisplayLabels, PaymentDetailsResponse, TransactionPaymentsResponse};

use crate::domain::method_totals::group_by_method;
use crate::domain::payment_extraction::PaymentExtraction;
use crate::mappers::PaymentMapper;
use crate::storage::{Connection, PaymentStorage};

pub struct PaymentService<C: Connection> {
    payment_repository: C::PaymentRepository,
    extraction: PaymentExtraction,
    labels: DisplayLabels,
}

impl<C: Connection> Clone for PaymentService<C>
where
    C::PaymentRepository: Clone,
{
    fn clone(&self) -> Self {
        Self {
            payment_repository: self.payment_repository.clone(),
            extraction: self.extraction.clone(),
            labels: self.labels.clone(),
        }
    }
}

impl<C: Connection> PaymentService<C> {
    pub fn new(connection: Arc<C>) -> Self {
        Self::with_labels(connection, DisplayLabels::default())
    }

    pub fn with_labels(connection: Arc<C>, labels: DisplayLabels) -> Self {
        let payment_repository = connection.create_payment_repository();
        Self {
            payment_repository,
            extraction: PaymentExtraction::with_labels(labels.clone()),
            labels,
        }
    }

    /// Normalized details of a single payment. A payment without detail
    /// yields empty lists, not an error.
    pub async fn get_payment_details(&self, payment_id: &str) -> Result<PaymentDetailsResponse> {
        let payment = self
            .payment_repository
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| anyhow!("payment {} not found", payment_id))?;

        let details = self.extraction.extract(&payment);
        let grouped = group_by_method(&details, &self.labels);
        Ok(PaymentDetailsResponse {
            payment_id: payment.id,
            details: PaymentMapper::details_to_dto(details),
            grouped_by_method: PaymentMapper::groups_to_dto(grouped),
        })
    }

    /// The settlement view across every payment recorded for a transaction.
    pub async fn get_transaction_payments(
        &self,
        transaction_id: &str,
    ) -> Result<TransactionPaymentsResponse> {
        let payments = self
            .payment_repository
            .list_payments_for_transaction(transaction_id)
            .await?;

        let mut details = Vec::new();
        for payment in &payments {
            details.extend(self.extraction.extract(payment));
        }
        let grouped = group_by_method(&details, &self.labels);
        Ok(TransactionPaymentsResponse {
            transaction_id: transaction_id.to_string(),
            details: PaymentMapper::details_to_dto(details),
            grouped_by_method: PaymentMapper::groups_to_dto(grouped),
        })
    }
}
