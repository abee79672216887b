use serde::{Deserialize, Serialize};
use shared::{BondCategory, BondType, PaymentClassification, PaymentMethod};

/// Overall status of a payment aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Settled,
}

impl PaymentStatus {
    pub fn parse(raw: &str) -> Option<PaymentStatus> {
        match raw.trim().to_lowercase().as_str() {
            "pending" => Some(PaymentStatus::Pending),
            "settled" => Some(PaymentStatus::Settled),
            _ => None,
        }
    }

    pub fn as_key(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Settled => "settled",
        }
    }
}

/// Payment aggregate owning zero-or-more structured details.
///
/// Records created before structured details existed carry their entries in
/// `legacy_payload` instead, and use the top-level `amount`/`method` pair for
/// single-method payments. Details are immutable once the payment is settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub transaction_id: String,
    pub status: PaymentStatus,
    /// Meaningful only for legacy single-method payments
    pub amount: f64,
    /// Meaningful only for legacy single-method payments
    pub method: Option<PaymentMethod>,
    pub details: Vec<PaymentDetail>,
    /// Encoded payload kept verbatim on records predating structured details
    pub legacy_payload: Option<String>,
    pub created_at: String,
}

impl Payment {
    pub fn generate_id(transaction_id: &str, now_millis: u64) -> String {
        format!("payment::{}::{}", transaction_id, now_millis)
    }
}

/// One structured payment instrument applied to one transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDetail {
    pub id: String,
    pub method: PaymentMethod,
    /// Non-negative amount in currency units
    pub amount: f64,
    pub classification: PaymentClassification,
    /// Cheque number, transfer reference, dossier number, ...
    pub reference: Option<String>,
    pub instrument: Option<InstrumentDetails>,
}

/// Method-specific attributes, a closed set keyed by method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InstrumentDetails {
    Cheque {
        number: String,
        bank: String,
    },
    Transfer {
        reference: String,
        bank: Option<String>,
    },
    PromissoryNote {
        due_date: String,
        bank: String,
    },
    PostalOrder {
        number: String,
    },
    InsuranceBond {
        bond_type: BondType,
        category: BondCategory,
        dossier_id: Option<String>,
    },
}

impl InstrumentDetails {
    pub fn bank(&self) -> Option<&str> {
        match self {
            InstrumentDetails::Cheque { bank, .. } => Some(bank),
            InstrumentDetails::Transfer { bank, .. } => bank.as_deref(),
            InstrumentDetails::PromissoryNote { bank, .. } => Some(bank),
            _ => None,
        }
    }

    pub fn due_date(&self) -> Option<&str> {
        match self {
            InstrumentDetails::PromissoryNote { due_date, .. } => Some(due_date),
            _ => None,
        }
    }
}

/// The single in-memory shape both storage origins resolve into.
///
/// After extraction nothing downstream branches on whether a detail came from
/// a structured record or a legacy payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPaymentDetail {
    pub id: String,
    pub method: PaymentMethod,
    pub method_label: String,
    pub classification: PaymentClassification,
    pub classification_label: String,
    /// None when a legacy entry carried a missing or non-numeric amount
    pub amount: Option<f64>,
    pub reference: Option<String>,
    pub bank: Option<String>,
    pub due_date: Option<String>,
}

/// Decoded shape of the legacy encoded payload
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyPaymentPayload {
    #[serde(default)]
    pub payments: Vec<LegacyPaymentEntry>,
}

/// One entry of a legacy payload. Field names follow the historical records,
/// which mixed English keys with the French ones the old front office wrote.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyPaymentEntry {
    #[serde(default, alias = "mode")]
    pub method: Option<String>,
    #[serde(default, alias = "montant")]
    pub amount: Option<serde_json::Value>,
    #[serde(default, alias = "numero")]
    pub reference: Option<String>,
    #[serde(default, alias = "banque")]
    pub bank: Option<String>,
    #[serde(default, alias = "echeance")]
    pub due_date: Option<String>,
    #[serde(default)]
    pub classification: Option<String>,
}

impl LegacyPaymentEntry {
    /// Coerce the raw amount, which old records stored either as a JSON
    /// number or as a numeric string. Anything else normalizes to None.
    pub fn numeric_amount(&self) -> Option<f64> {
        match &self.amount {
            Some(serde_json::Value::Number(n)) => n.as_f64(),
            Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_format() {
        let id = Payment::generate_id("tx-42", 1700000000000);
        assert_eq!(id, "payment::tx-42::1700000000000");
    }

    #[test]
    fn test_legacy_entry_numeric_amount_coercion() {
        let from_number: LegacyPaymentEntry =
            serde_json::from_str(r#"{"montant": 120.5}"#).unwrap();
        assert_eq!(from_number.numeric_amount(), Some(120.5));

        let from_string: LegacyPaymentEntry =
            serde_json::from_str(r#"{"montant": " 99.9 "}"#).unwrap();
        assert_eq!(from_string.numeric_amount(), Some(99.9));

        let garbage: LegacyPaymentEntry =
            serde_json::from_str(r#"{"montant": "abc"}"#).unwrap();
        assert_eq!(garbage.numeric_amount(), None);

        let missing: LegacyPaymentEntry = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(missing.numeric_amount(), None);
    }

    #[test]
    fn test_legacy_entry_accepts_french_field_names() {
        let entry: LegacyPaymentEntry = serde_json::from_str(
            r#"{"mode": "virement", "montant": 300, "numero": "REF-1", "banque": "STB"}"#,
        )
        .unwrap();
        assert_eq!(entry.method.as_deref(), Some("virement"));
        assert_eq!(entry.numeric_amount(), Some(300.0));
        assert_eq!(entry.reference.as_deref(), Some("REF-1"));
        assert_eq!(entry.bank.as_deref(), Some("STB"));
    }

    #[test]
    fn test_instrument_details_accessors() {
        let cheque = InstrumentDetails::Cheque {
            number: "0012".to_string(),
            bank: "BIAT".to_string(),
        };
        assert_eq!(cheque.bank(), Some("BIAT"));
        assert_eq!(cheque.due_date(), None);

        let note = InstrumentDetails::PromissoryNote {
            due_date: "2026-10-01".to_string(),
            bank: "Amen Bank".to_string(),
        };
        assert_eq!(note.due_date(), Some("2026-10-01"));
    }
}
