use anyhow::Result;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::storage::csv::{
    CsvDossierRepository, CsvNomenclatureRepository, CsvPaymentRepository,
};
use crate::storage::traits::Connection;

/// CsvConnection manages the data directory holding the payment, dossier,
/// and nomenclature CSV files.
#[derive(Debug, Clone)]
pub struct CsvConnection {
    base_directory: PathBuf,
}

impl CsvConnection {
    /// Create a connection rooted at a base directory, creating it if needed
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();
        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
        }
        Ok(Self {
            base_directory: base_path,
        })
    }

    /// Create a connection in the default data directory
    /// (~/Documents/Medirent)
    pub fn new_default() -> Result<Self> {
        let home_dir = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| anyhow::anyhow!("Could not determine home directory"))?;
        let data_dir = PathBuf::from(home_dir).join("Documents").join("Medirent");
        info!("Using data directory: {}", data_dir.display());
        Self::new(data_dir)
    }

    pub fn payments_file_path(&self) -> PathBuf {
        self.base_directory.join("payments.csv")
    }

    pub fn dossiers_file_path(&self) -> PathBuf {
        self.base_directory.join("dossiers.csv")
    }

    pub fn nomenclature_file_path(&self) -> PathBuf {
        self.base_directory.join("nomenclature.csv")
    }
}

impl Connection for CsvConnection {
    type PaymentRepository = CsvPaymentRepository;
    type DossierRepository = CsvDossierRepository;
    type NomenclatureRepository = CsvNomenclatureRepository;

    fn create_payment_repository(&self) -> Self::PaymentRepository {
        CsvPaymentRepository::new(self.clone())
    }

    fn create_dossier_repository(&self) -> Self::DossierRepository {
        CsvDossierRepository::new(self.clone())
    }

    fn create_nomenclature_repository(&self) -> Self::NomenclatureRepository {
        CsvNomenclatureRepository::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_new_creates_base_directory() {
        let temp_dir = tempdir().unwrap();
        let nested = temp_dir.path().join("data").join("medirent");
        let connection = CsvConnection::new(&nested).unwrap();
        assert!(nested.exists());
        assert_eq!(
            connection.payments_file_path(),
            nested.join("payments.csv")
        );
    }
}
