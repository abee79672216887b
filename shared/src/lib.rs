use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Payment instrument used to cover (part of) a transaction's total due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Cheque,
    Transfer,
    PromissoryNote,
    PostalOrder,
    InsuranceBond,
    /// Sentinel for legacy records whose method cannot be recognized
    Unknown,
}

impl PaymentMethod {
    /// Parse a stored or legacy method string, case-insensitively.
    ///
    /// Historical records use French labels (espèces, virement, traite,
    /// mandat, cnam); anything unrecognizable maps to `Unknown` so a single
    /// bad record never breaks extraction.
    pub fn parse(raw: &str) -> PaymentMethod {
        match raw.trim().to_lowercase().as_str() {
            "cash" | "especes" | "espèces" => PaymentMethod::Cash,
            "cheque" | "chèque" | "check" => PaymentMethod::Cheque,
            "transfer" | "virement" => PaymentMethod::Transfer,
            "promissory_note" | "traite" => PaymentMethod::PromissoryNote,
            "postal_order" | "mandat" => PaymentMethod::PostalOrder,
            "insurance_bond" | "cnam" => PaymentMethod::InsuranceBond,
            _ => PaymentMethod::Unknown,
        }
    }

    /// Stable storage key for this method
    pub fn as_key(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Cheque => "cheque",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::PromissoryNote => "promissory_note",
            PaymentMethod::PostalOrder => "postal_order",
            PaymentMethod::InsuranceBond => "insurance_bond",
            PaymentMethod::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_key())
    }
}

/// Role a payment instrument plays in covering a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentClassification {
    /// Covers the price itself
    Principal,
    /// Deposit held against a rental
    Guarantee,
    /// The portion not covered by an insurance bond
    Complement,
}

impl PaymentClassification {
    pub fn parse(raw: &str) -> Option<PaymentClassification> {
        match raw.trim().to_lowercase().as_str() {
            "principal" => Some(PaymentClassification::Principal),
            "guarantee" | "garantie" => Some(PaymentClassification::Guarantee),
            "complement" | "complément" => Some(PaymentClassification::Complement),
            _ => None,
        }
    }

    pub fn as_key(&self) -> &'static str {
        match self {
            PaymentClassification::Principal => "principal",
            PaymentClassification::Guarantee => "guarantee",
            PaymentClassification::Complement => "complement",
        }
    }
}

impl fmt::Display for PaymentClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_key())
    }
}

/// Approval state of a CNAM insurance-bond dossier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DossierStatus {
    Pending,
    InProgress,
    NeedsSupplement,
    Accepted,
    Rejected,
}

impl DossierStatus {
    /// Accepted and rejected dossiers take no further status change
    pub fn is_terminal(&self) -> bool {
        matches!(self, DossierStatus::Accepted | DossierStatus::Rejected)
    }

    pub fn parse(raw: &str) -> Option<DossierStatus> {
        match raw.trim().to_lowercase().as_str() {
            "pending" => Some(DossierStatus::Pending),
            "in_progress" => Some(DossierStatus::InProgress),
            "needs_supplement" => Some(DossierStatus::NeedsSupplement),
            "accepted" => Some(DossierStatus::Accepted),
            "rejected" => Some(DossierStatus::Rejected),
            _ => None,
        }
    }

    pub fn as_key(&self) -> &'static str {
        match self {
            DossierStatus::Pending => "pending",
            DossierStatus::InProgress => "in_progress",
            DossierStatus::NeedsSupplement => "needs_supplement",
            DossierStatus::Accepted => "accepted",
            DossierStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for DossierStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_key())
    }
}

/// Device category a CNAM bond is issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BondType {
    OxygenConcentrator,
    Ventilator,
    Cpap,
    Mask,
    /// Manually priced equipment outside the standard catalog
    Other,
}

impl BondType {
    pub fn parse(raw: &str) -> Option<BondType> {
        match raw.trim().to_lowercase().as_str() {
            "oxygen_concentrator" => Some(BondType::OxygenConcentrator),
            "ventilator" => Some(BondType::Ventilator),
            "cpap" => Some(BondType::Cpap),
            "mask" => Some(BondType::Mask),
            "other" => Some(BondType::Other),
            _ => None,
        }
    }

    pub fn as_key(&self) -> &'static str {
        match self {
            BondType::OxygenConcentrator => "oxygen_concentrator",
            BondType::Ventilator => "ventilator",
            BondType::Cpap => "cpap",
            BondType::Mask => "mask",
            BondType::Other => "other",
        }
    }
}

impl fmt::Display for BondType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_key())
    }
}

/// Whether a bond covers a rental (monthly rate) or a purchase (one-time amount)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BondCategory {
    Rental,
    Purchase,
}

impl BondCategory {
    pub fn parse(raw: &str) -> Option<BondCategory> {
        match raw.trim().to_lowercase().as_str() {
            "rental" | "location" => Some(BondCategory::Rental),
            "purchase" | "vente" => Some(BondCategory::Purchase),
            _ => None,
        }
    }

    pub fn as_key(&self) -> &'static str {
        match self {
            BondCategory::Rental => "rental",
            BondCategory::Purchase => "purchase",
        }
    }
}

impl fmt::Display for BondCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_key())
    }
}

/// Immutable method→label and classification→label tables.
///
/// Built once at startup and injected into the services that render labels;
/// the UI layer may supply its own translations.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayLabels {
    methods: HashMap<PaymentMethod, String>,
    classifications: HashMap<PaymentClassification, String>,
}

impl DisplayLabels {
    pub fn new(
        methods: HashMap<PaymentMethod, String>,
        classifications: HashMap<PaymentClassification, String>,
    ) -> Self {
        Self {
            methods,
            classifications,
        }
    }

    pub fn method_label(&self, method: PaymentMethod) -> String {
        self.methods
            .get(&method)
            .cloned()
            .unwrap_or_else(|| method.as_key().to_string())
    }

    pub fn classification_label(&self, classification: PaymentClassification) -> String {
        self.classifications
            .get(&classification)
            .cloned()
            .unwrap_or_else(|| classification.as_key().to_string())
    }
}

impl Default for DisplayLabels {
    fn default() -> Self {
        let methods = [
            (PaymentMethod::Cash, "Cash"),
            (PaymentMethod::Cheque, "Cheque"),
            (PaymentMethod::Transfer, "Bank transfer"),
            (PaymentMethod::PromissoryNote, "Promissory note"),
            (PaymentMethod::PostalOrder, "Postal order"),
            (PaymentMethod::InsuranceBond, "CNAM bond"),
            (PaymentMethod::Unknown, "Unknown"),
        ]
        .into_iter()
        .map(|(m, l)| (m, l.to_string()))
        .collect();
        let classifications = [
            (PaymentClassification::Principal, "Principal"),
            (PaymentClassification::Guarantee, "Guarantee"),
            (PaymentClassification::Complement, "Complement"),
        ]
        .into_iter()
        .map(|(c, l)| (c, l.to_string()))
        .collect();
        Self {
            methods,
            classifications,
        }
    }
}

/// Configuration for settlement validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementConfig {
    /// Over-payment is rejected beyond this tolerance, in currency units
    pub rounding_tolerance: f64,
    /// Maximum length for notes and free-text references
    pub max_note_length: usize,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            rounding_tolerance: 0.01,
            max_note_length: 256,
        }
    }
}

/// One payment instrument applied to one transaction, normalized for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDetail {
    pub id: String,
    pub method: PaymentMethod,
    pub method_label: String,
    /// None when a legacy record carried a missing or non-numeric amount
    pub amount: Option<f64>,
    pub classification: PaymentClassification,
    pub classification_label: String,
    /// Cheque number, transfer reference, dossier number, ...
    pub reference: Option<String>,
    pub bank: Option<String>,
    /// Due date for promissory notes (RFC 3339 date)
    pub due_date: Option<String>,
}

/// Per-method aggregation of payment details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodGroup {
    pub method: PaymentMethod,
    pub display_label: String,
    /// Sum of the valid amounts in this group
    pub total_amount: f64,
    pub details: Vec<PaymentDetail>,
}

/// A payment instrument as declared at settlement time, pre-persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub method: PaymentMethod,
    pub amount: f64,
    pub classification: PaymentClassification,
    pub reference: Option<String>,
    pub bank: Option<String>,
    pub due_date: Option<String>,
    /// Required when method is insurance_bond
    pub bond_type: Option<BondType>,
    /// Required when method is insurance_bond
    pub bond_category: Option<BondCategory>,
}

/// Request to settle a transaction's total due
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettleRequest {
    pub transaction_id: String,
    pub transaction_total: f64,
    pub intents: Vec<PaymentIntent>,
    /// Back-office user recorded on the dossier history, if a bond is present
    pub actor: Option<String>,
}

/// Result of settling a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettleResponse {
    pub payment_id: String,
    pub accepted: Vec<PaymentDetail>,
    pub grouped_by_method: Vec<MethodGroup>,
    /// Remaining due when the intents under-pay the total
    pub outstanding_balance: f64,
    /// True when a bond was applied and its coverage falls short of the price
    pub needs_complement: bool,
    pub complement_amount: f64,
    /// Present when an insurance-bond intent initialized a dossier
    pub dossier: Option<CnamDossier>,
    pub success_message: String,
}

/// Normalized details of a single stored payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDetailsResponse {
    pub payment_id: String,
    pub details: Vec<PaymentDetail>,
    pub grouped_by_method: Vec<MethodGroup>,
}

/// Normalized details across every payment recorded for a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionPaymentsResponse {
    pub transaction_id: String,
    pub details: Vec<PaymentDetail>,
    pub grouped_by_method: Vec<MethodGroup>,
}

/// One entry in a dossier's append-only transition log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DossierHistoryEntry {
    /// RFC 3339 timestamp of the transition
    pub timestamp: String,
    pub status: DossierStatus,
    pub note: Option<String>,
    pub actor: Option<String>,
}

/// The insurance-bond case record attached to a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CnamDossier {
    pub id: String,
    pub transaction_id: String,
    /// The insurance_bond payment detail this dossier is attached to
    pub payment_detail_id: Option<String>,
    pub bond_type: BondType,
    pub bond_category: BondCategory,
    pub status: DossierStatus,
    /// Fixed coverage snapshotted when the bond type was chosen
    pub bond_amount: f64,
    /// The transaction's total due the bond is measured against
    pub device_price: f64,
    /// Derived on read: max(0, device_price - bond_amount)
    pub complement_amount: f64,
    pub needs_complement: bool,
    pub submission_date: Option<String>,
    pub reminder_date: Option<String>,
    pub acceptance_date: Option<String>,
    pub expiration_date: Option<String>,
    pub note: Option<String>,
    /// Bumped on every write, for caller-side conditional updates
    pub version: u32,
    pub history: Vec<DossierHistoryEntry>,
    pub created_at: String,
    pub updated_at: String,
}

/// Request to move a dossier to a new status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DossierTransitionRequest {
    pub dossier_id: String,
    pub target_status: DossierStatus,
    pub note: Option<String>,
    pub actor: Option<String>,
    pub submission_date: Option<String>,
    pub reminder_date: Option<String>,
    pub acceptance_date: Option<String>,
    pub expiration_date: Option<String>,
    /// Approved coverage; may only change the snapshot for "other" bond types
    pub bond_amount: Option<f64>,
}

/// Response after a dossier transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DossierTransitionResponse {
    pub dossier: CnamDossier,
    pub success_message: String,
}

/// Clerical correction of a dossier's reminder date or note.
/// Allowed in any state, including terminal ones; never a status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmendDossierRequest {
    pub dossier_id: String,
    pub reminder_date: Option<String>,
    pub note: Option<String>,
}

/// Response after a clerical dossier amendment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmendDossierResponse {
    pub dossier: CnamDossier,
    pub success_message: String,
}

/// Response containing a single dossier, if any
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetDossierResponse {
    pub dossier: Option<CnamDossier>,
}

/// Reference data: fixed bond coverage for a (bond type, category) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondNomenclatureEntry {
    pub bond_type: BondType,
    pub category: BondCategory,
    /// One-time coverage, used for purchases
    pub amount: f64,
    /// Monthly coverage, used for rentals
    pub monthly_rate: f64,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Request to add a nomenclature entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateNomenclatureRequest {
    pub bond_type: BondType,
    pub category: BondCategory,
    pub amount: f64,
    /// Defaults to `amount` for rentals; unused (0) for purchases
    pub monthly_rate: Option<f64>,
}

/// Request to update a nomenclature entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateNomenclatureRequest {
    pub bond_type: BondType,
    pub category: BondCategory,
    pub amount: Option<f64>,
    pub monthly_rate: Option<f64>,
    pub is_active: Option<bool>,
}

/// Response after creating or updating a nomenclature entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NomenclatureResponse {
    pub entry: BondNomenclatureEntry,
    pub success_message: String,
}

/// Response containing the nomenclature catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NomenclatureListResponse {
    pub entries: Vec<BondNomenclatureEntry>,
}

/// Response after deleting a nomenclature entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteNomenclatureResponse {
    pub deleted: bool,
    pub success_message: String,
}
