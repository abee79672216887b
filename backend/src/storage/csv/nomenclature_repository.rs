use anyhow::Result;
use async_trait::async_trait;
use csv::{Reader, Writer};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};

use shared::{BondCategory, BondType};

use crate::domain::models::nomenclature::BondNomenclatureEntry;
use crate::storage::csv::connection::CsvConnection;
use crate::storage::traits::NomenclatureStorage;

/// CSV-based nomenclature catalog repository
#[derive(Clone)]
pub struct CsvNomenclatureRepository {
    connection: CsvConnection,
}

impl CsvNomenclatureRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn read_entries(&self) -> Result<Vec<BondNomenclatureEntry>> {
        let file_path = self.connection.nomenclature_file_path();
        if !file_path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&file_path)?;
        let reader = BufReader::new(file);
        let mut csv_reader = Reader::from_reader(reader);

        let mut entries = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            let entry = BondNomenclatureEntry {
                bond_type: BondType::parse(record.get(0).unwrap_or(""))
                    .unwrap_or(BondType::Other),
                category: BondCategory::parse(record.get(1).unwrap_or(""))
                    .unwrap_or(BondCategory::Purchase),
                amount: record.get(2).unwrap_or("0").parse::<f64>().unwrap_or(0.0),
                monthly_rate: record.get(3).unwrap_or("0").parse::<f64>().unwrap_or(0.0),
                is_active: record.get(4).unwrap_or("true") == "true",
                created_at: record.get(5).unwrap_or("").to_string(),
                updated_at: record.get(6).unwrap_or("").to_string(),
            };
            entries.push(entry);
        }
        Ok(entries)
    }

    fn write_entries(&self, entries: &[BondNomenclatureEntry]) -> Result<()> {
        let file_path = self.connection.nomenclature_file_path();
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
                "bond_type",
                "category",
                "amount",
                "monthly_rate",
                "is_active",
                "created_at",
                "updated_at",
            ])?;

            for entry in entries {
                let amount = entry.amount.to_string();
                let monthly_rate = entry.monthly_rate.to_string();
                csv_writer.write_record([
                    entry.bond_type.as_key(),
                    entry.category.as_key(),
                    amount.as_str(),
                    monthly_rate.as_str(),
                    if entry.is_active { "true" } else { "false" },
                    entry.created_at.as_str(),
                    entry.updated_at.as_str(),
                ])?;
            }
            csv_writer.flush()?;
        }

        std::fs::rename(&temp_path, &file_path)?;
        Ok(())
    }
}

#[async_trait]
impl NomenclatureStorage for CsvNomenclatureRepository {
    async fn store_entry(&self, entry: &BondNomenclatureEntry) -> Result<()> {
        let mut entries = self.read_entries()?;
        entries.push(entry.clone());
        self.write_entries(&entries)
    }

    async fn get_entry(
        &self,
        bond_type: BondType,
        category: BondCategory,
    ) -> Result<Option<BondNomenclatureEntry>> {
        let entries = self.read_entries()?;
        Ok(entries
            .into_iter()
            .find(|e| e.bond_type == bond_type && e.category == category))
    }

    async fn list_entries(&self) -> Result<Vec<BondNomenclatureEntry>> {
        self.read_entries()
    }

    async fn update_entry(&self, entry: &BondNomenclatureEntry) -> Result<()> {
        let mut entries = self.read_entries()?;
        if let Some(index) = entries
            .iter()
            .position(|e| e.bond_type == entry.bond_type && e.category == entry.category)
        {
            entries[index] = entry.clone();
            self.write_entries(&entries)?;
        }
        Ok(())
    }

    async fn delete_entry(&self, bond_type: BondType, category: BondCategory) -> Result<bool> {
        let mut entries = self.read_entries()?;
        let initial_len = entries.len();
        entries.retain(|e| !(e.bond_type == bond_type && e.category == category));
        let was_deleted = entries.len() < initial_len;
        if was_deleted {
            self.write_entries(&entries)?;
        }
        Ok(was_deleted)
    }
}
