pub mod dossier_mapper;
pub mod nomenclature_mapper;
pub mod payment_mapper;

pub use dossier_mapper::DossierMapper;
pub use nomenclature_mapper::NomenclatureMapper;
pub use payment_mapper::PaymentMapper;
