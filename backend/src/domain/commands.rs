//! Domain-level command types.
//!
//! These structs are used by services and models inside the domain layer and
//! are **not** exposed over the public API; the calling layer maps the public
//! DTOs defined in the `shared` crate to these internal types.

pub mod dossier {
    /// Fields accompanying a dossier status transition.
    ///
    /// Which fields are required depends on the target status; the model
    /// validates them before the transition is committed.
    #[derive(Debug, Clone, Default)]
    pub struct TransitionFields {
        pub note: Option<String>,
        pub actor: Option<String>,
        pub submission_date: Option<String>,
        pub reminder_date: Option<String>,
        pub acceptance_date: Option<String>,
        pub expiration_date: Option<String>,
        pub bond_amount: Option<f64>,
    }
}

pub mod settlement {
    /// Input for opening a dossier when a bond intent is settled.
    #[derive(Debug, Clone)]
    pub struct OpenDossierCommand {
        pub transaction_id: String,
        pub payment_detail_id: Option<String>,
        pub bond_type: shared::BondType,
        pub bond_category: shared::BondCategory,
        pub bond_amount: f64,
        pub device_price: f64,
        pub actor: Option<String>,
    }
}
