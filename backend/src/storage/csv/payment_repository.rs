use anyhow::Result;
use async_trait::async_trait;
use csv::{Reader, Writer};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};

use shared::PaymentMethod;

use crate::domain::models::payment::{Payment, PaymentStatus};
use crate::storage::csv::connection::CsvConnection;
use crate::storage::traits::PaymentStorage;

/// CSV-based payment repository.
///
/// Structured details are stored JSON-encoded in a single column; the legacy
/// payload column keeps old records' encoded text verbatim.
#[derive(Clone)]
pub struct CsvPaymentRepository {
    connection: CsvConnection,
}

impl CsvPaymentRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn read_payments(&self) -> Result<Vec<Payment>> {
        let file_path = self.connection.payments_file_path();
        if !file_path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&file_path)?;
        let reader = BufReader::new(file);
        let mut csv_reader = Reader::from_reader(reader);

        let mut payments = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            let method_raw = record.get(4).unwrap_or("");
            let legacy_raw = record.get(6).unwrap_or("");
            let payment = Payment {
                id: record.get(0).unwrap_or("").to_string(),
                transaction_id: record.get(1).unwrap_or("").to_string(),
                status: PaymentStatus::parse(record.get(2).unwrap_or(""))
                    .unwrap_or(PaymentStatus::Pending),
                amount: record.get(3).unwrap_or("0").parse::<f64>().unwrap_or(0.0),
                method: if method_raw.is_empty() {
                    None
                } else {
                    Some(PaymentMethod::parse(method_raw))
                },
                details: serde_json::from_str(record.get(5).unwrap_or("[]"))
                    .unwrap_or_default(),
                legacy_payload: if legacy_raw.is_empty() {
                    None
                } else {
                    Some(legacy_raw.to_string())
                },
                created_at: record.get(7).unwrap_or("").to_string(),
            };
            payments.push(payment);
        }
        Ok(payments)
    }

    fn write_payments(&self, payments: &[Payment]) -> Result<()> {
        let file_path = self.connection.payments_file_path();
        let temp_path = file_path.with_extension("tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)?;
            let writer = BufWriter::new(file);
            let mut csv_writer = Writer::from_writer(writer);

            csv_writer.write_record([
                "id",
                "transaction_id",
                "status",
                "amount",
                "method",
                "details",
                "legacy_payload",
                "created_at",
            ])?;

            for payment in payments {
                let amount = payment.amount.to_string();
                let details_json = serde_json::to_string(&payment.details)?;
                csv_writer.write_record([
                    payment.id.as_str(),
                    payment.transaction_id.as_str(),
                    payment.status.as_key(),
                    amount.as_str(),
                    payment.method.map(|m| m.as_key()).unwrap_or(""),
                    details_json.as_str(),
                    payment.legacy_payload.as_deref().unwrap_or(""),
                    payment.created_at.as_str(),
                ])?;
            }
            csv_writer.flush()?;
        }

        // Atomic move from temp to final file
        std::fs::rename(&temp_path, &file_path)?;
        Ok(())
    }
}

#[async_trait]
impl PaymentStorage for CsvPaymentRepository {
    async fn store_payment(&self, payment: &Payment) -> Result<()> {
        let mut payments = self.read_payments()?;
        payments.push(payment.clone());
        self.write_payments(&payments)
    }

    async fn get_payment(&self, payment_id: &str) -> Result<Option<Payment>> {
        let payments = self.read_payments()?;
        Ok(payments.into_iter().find(|p| p.id == payment_id))
    }

    async fn list_payments_for_transaction(&self, transaction_id: &str) -> Result<Vec<Payment>> {
        let mut payments = self.read_payments()?;
        payments.retain(|p| p.transaction_id == transaction_id);
        Ok(payments)
    }

    async fn update_payment(&self, payment: &Payment) -> Result<()> {
        let mut payments = self.read_payments()?;
        if let Some(index) = payments.iter().position(|p| p.id == payment.id) {
            payments[index] = payment.clone();
            self.write_payments(&payments)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::payment::PaymentDetail;
    use shared::PaymentClassification;
    use tempfile::tempdir;

    fn setup_test_repo() -> (CsvPaymentRepository, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let connection = CsvConnection::new(temp_dir.path()).unwrap();
        (CsvPaymentRepository::new(connection), temp_dir)
    }

    fn test_payment(id: &str, transaction_id: &str) -> Payment {
        Payment {
            id: id.to_string(),
            transaction_id: transaction_id.to_string(),
            status: PaymentStatus::Settled,
            amount: 0.0,
            method: None,
            details: vec![PaymentDetail {
                id: "d1".to_string(),
                method: PaymentMethod::Cash,
                amount: 120.0,
                classification: PaymentClassification::Principal,
                reference: None,
                instrument: None,
            }],
            legacy_payload: None,
            created_at: "2026-08-07T10:00:00+01:00".to_string(),
        }
    }

    #[tokio::test]
    async fn test_store_and_retrieve_payment() {
        let (repo, _temp) = setup_test_repo();
        let payment = test_payment("p1", "tx1");
        repo.store_payment(&payment).await.unwrap();

        let retrieved = repo.get_payment("p1").await.unwrap().unwrap();
        assert_eq!(retrieved, payment);
        assert_eq!(retrieved.details.len(), 1);
    }

    #[tokio::test]
    async fn test_legacy_payload_round_trip() {
        let (repo, _temp) = setup_test_repo();
        let mut payment = test_payment("p1", "tx1");
        payment.details = Vec::new();
        payment.legacy_payload =
            Some(r#"{"payments": [{"mode": "especes", "montant": 80}]}"#.to_string());
        repo.store_payment(&payment).await.unwrap();

        let retrieved = repo.get_payment("p1").await.unwrap().unwrap();
        assert_eq!(retrieved.legacy_payload, payment.legacy_payload);
    }

    #[tokio::test]
    async fn test_list_payments_for_transaction() {
        let (repo, _temp) = setup_test_repo();
        repo.store_payment(&test_payment("p1", "tx1")).await.unwrap();
        repo.store_payment(&test_payment("p2", "tx2")).await.unwrap();
        repo.store_payment(&test_payment("p3", "tx1")).await.unwrap();

        let for_tx1 = repo.list_payments_for_transaction("tx1").await.unwrap();
        assert_eq!(for_tx1.len(), 2);
    }

    #[tokio::test]
    async fn test_update_payment() {
        let (repo, _temp) = setup_test_repo();
        let mut payment = test_payment("p1", "tx1");
        repo.store_payment(&payment).await.unwrap();

        payment.status = PaymentStatus::Pending;
        repo.update_payment(&payment).await.unwrap();
        let retrieved = repo.get_payment("p1").await.unwrap().unwrap();
        assert_eq!(retrieved.status, PaymentStatus::Pending);
    }
}
