use anyhow::Result;
use async_trait::async_trait;
use csv::{Reader, Writer};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};

use shared::{BondCategory, BondType, DossierStatus};

use crate::domain::models::dossier::CnamDossier;
use crate::storage::csv::connection::CsvConnection;
use crate::storage::traits::DossierStorage;

/// CSV-based dossier repository. The history log is stored JSON-encoded in
/// a single column.
#[derive(Clone)]
pub struct CsvDossierRepository {
    connection: CsvConnection,
}

impl CsvDossierRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn read_dossiers(&self) -> Result<Vec<CnamDossier>> {
        let file_path = self.connection.dossiers_file_path();
        if !file_path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&file_path)?;
        let reader = BufReader::new(file);
        let mut csv_reader = Reader::from_reader(reader);

        let mut dossiers = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            let opt = |i: usize| {
                let value = record.get(i).unwrap_or("");
                if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                }
            };
            let dossier = CnamDossier {
                id: record.get(0).unwrap_or("").to_string(),
                transaction_id: record.get(1).unwrap_or("").to_string(),
                payment_detail_id: opt(2),
                bond_type: BondType::parse(record.get(3).unwrap_or(""))
                    .unwrap_or(BondType::Other),
                bond_category: BondCategory::parse(record.get(4).unwrap_or(""))
                    .unwrap_or(BondCategory::Purchase),
                status: DossierStatus::parse(record.get(5).unwrap_or(""))
                    .unwrap_or(DossierStatus::Pending),
                bond_amount: record.get(6).unwrap_or("0").parse::<f64>().unwrap_or(0.0),
                device_price: record.get(7).unwrap_or("0").parse::<f64>().unwrap_or(0.0),
                submission_date: opt(8),
                reminder_date: opt(9),
                acceptance_date: opt(10),
                expiration_date: opt(11),
                note: opt(12),
                version: record.get(13).unwrap_or("0").parse::<u32>().unwrap_or(0),
                history: serde_json::from_str(record.get(14).unwrap_or("[]"))
                    .unwrap_or_default(),
                created_at: record.get(15).unwrap_or("").to_string(),
                updated_at: record.get(16).unwrap_or("").to_string(),
            };
            dossiers.push(dossier);
        }
        Ok(dossiers)
    }

    fn write_dossiers(&self, dossiers: &[CnamDossier]) -> Result<()> {
        let file_path = self.connection.dossiers_file_path();
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
                "payment_detail_id",
                "bond_type",
                "bond_category",
                "status",
                "bond_amount",
                "device_price",
                "submission_date",
                "reminder_date",
                "acceptance_date",
                "expiration_date",
                "note",
                "version",
                "history",
                "created_at",
                "updated_at",
            ])?;

            for dossier in dossiers {
                let bond_amount = dossier.bond_amount.to_string();
                let device_price = dossier.device_price.to_string();
                let version = dossier.version.to_string();
                let history_json = serde_json::to_string(&dossier.history)?;
                csv_writer.write_record([
                    dossier.id.as_str(),
                    dossier.transaction_id.as_str(),
                    dossier.payment_detail_id.as_deref().unwrap_or(""),
                    dossier.bond_type.as_key(),
                    dossier.bond_category.as_key(),
                    dossier.status.as_key(),
                    bond_amount.as_str(),
                    device_price.as_str(),
                    dossier.submission_date.as_deref().unwrap_or(""),
                    dossier.reminder_date.as_deref().unwrap_or(""),
                    dossier.acceptance_date.as_deref().unwrap_or(""),
                    dossier.expiration_date.as_deref().unwrap_or(""),
                    dossier.note.as_deref().unwrap_or(""),
                    version.as_str(),
                    history_json.as_str(),
                    dossier.created_at.as_str(),
                    dossier.updated_at.as_str(),
                ])?;
            }
            csv_writer.flush()?;
        }

        std::fs::rename(&temp_path, &file_path)?;
        Ok(())
    }
}

#[async_trait]
impl DossierStorage for CsvDossierRepository {
    async fn store_dossier(&self, dossier: &CnamDossier) -> Result<()> {
        let mut dossiers = self.read_dossiers()?;
        dossiers.push(dossier.clone());
        self.write_dossiers(&dossiers)
    }

    async fn get_dossier(&self, dossier_id: &str) -> Result<Option<CnamDossier>> {
        let dossiers = self.read_dossiers()?;
        Ok(dossiers.into_iter().find(|d| d.id == dossier_id))
    }

    async fn get_active_dossier_for_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<CnamDossier>> {
        let dossiers = self.read_dossiers()?;
        Ok(dossiers
            .into_iter()
            .find(|d| d.transaction_id == transaction_id && !d.status.is_terminal()))
    }

    async fn update_dossier(&self, dossier: &CnamDossier, expected_version: u32) -> Result<bool> {
        let mut dossiers = self.read_dossiers()?;
        let Some(index) = dossiers.iter().position(|d| d.id == dossier.id) else {
            return Ok(false);
        };
        if dossiers[index].version != expected_version {
            return Ok(false);
        }
        dossiers[index] = dossier.clone();
        self.write_dossiers(&dossiers)?;
        Ok(true)
    }

    async fn list_dossiers(&self) -> Result<Vec<CnamDossier>> {
        self.read_dossiers()
    }
}
