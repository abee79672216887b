//! CSV-file storage backend.
//!
//! One file per aggregate under the connection's base directory, rewritten
//! atomically on every change. Suited to tests and small deployments; larger
//! installations plug their own [`Connection`](crate::storage::Connection)
//! implementation.

pub mod connection;
pub mod dossier_repository;
pub mod nomenclature_repository;
pub mod payment_repository;

pub use connection::CsvConnection;
pub use dossier_repository::CsvDossierRepository;
pub use nomenclature_repository::CsvNomenclatureRepository;
pub use payment_repository::CsvPaymentRepository;
