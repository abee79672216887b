//! Payment-detail extraction across the two historical storage shapes.
//!
//! Structured details and legacy encoded payloads both resolve into
//! [`NormalizedPaymentDetail`] here, once, at load time. Decoding failures
//! degrade to an empty result with a warning for operators; they are never
//! surfaced to the caller as errors.

use log::warn;
use shared::{DisplayLabels, PaymentClassification, PaymentMethod};

use crate::domain::models::payment::{
    LegacyPaymentEntry, LegacyPaymentPayload, NormalizedPaymentDetail, Payment, PaymentDetail,
};

/// Where a payment's details were found. Resolved once; nothing downstream
/// branches on it again.
enum PaymentSource<'a> {
    Structured(&'a [PaymentDetail]),
    Legacy(&'a str),
    None,
}

fn resolve_source(payment: &Payment) -> PaymentSource<'_> {
    if !payment.details.is_empty() {
        return PaymentSource::Structured(&payment.details);
    }
    match payment.legacy_payload.as_deref() {
        Some(blob) if !blob.trim().is_empty() => PaymentSource::Legacy(blob),
        _ => PaymentSource::None,
    }
}

/// Read-only, idempotent extraction of normalized payment details.
#[derive(Debug, Clone, Default)]
pub struct PaymentExtraction {
    labels: DisplayLabels,
}

impl PaymentExtraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_labels(labels: DisplayLabels) -> Self {
        Self { labels }
    }

    /// Produce the normalized detail list for a payment, regardless of which
    /// storage shape it uses. An absence of detail is an empty list, not an
    /// error.
    pub fn extract(&self, payment: &Payment) -> Vec<NormalizedPaymentDetail> {
        match resolve_source(payment) {
            PaymentSource::Structured(details) => details
                .iter()
                .map(|detail| self.normalize_structured(detail))
                .collect(),
            PaymentSource::Legacy(blob) => self.decode_legacy(payment, blob),
            PaymentSource::None => Vec::new(),
        }
    }

    fn normalize_structured(&self, detail: &PaymentDetail) -> NormalizedPaymentDetail {
        NormalizedPaymentDetail {
            id: detail.id.clone(),
            method: detail.method,
            method_label: self.labels.method_label(detail.method),
            classification: detail.classification,
            classification_label: self.labels.classification_label(detail.classification),
            amount: Some(detail.amount),
            reference: detail.reference.clone(),
            bank: detail
                .instrument
                .as_ref()
                .and_then(|i| i.bank())
                .map(str::to_string),
            due_date: detail
                .instrument
                .as_ref()
                .and_then(|i| i.due_date())
                .map(str::to_string),
        }
    }

    fn decode_legacy(&self, payment: &Payment, blob: &str) -> Vec<NormalizedPaymentDetail> {
        match serde_json::from_str::<LegacyPaymentPayload>(blob) {
            Ok(payload) => payload
                .payments
                .iter()
                .enumerate()
                .map(|(index, entry)| self.normalize_legacy(&payment.id, index, entry))
                .collect(),
            Err(e) => {
                warn!(
                    "payment {}: undecodable legacy payload, returning no details: {}",
                    payment.id, e
                );
                Vec::new()
            }
        }
    }

    fn normalize_legacy(
        &self,
        payment_id: &str,
        index: usize,
        entry: &LegacyPaymentEntry,
    ) -> NormalizedPaymentDetail {
        let method = entry
            .method
            .as_deref()
            .map(PaymentMethod::parse)
            .unwrap_or(PaymentMethod::Unknown);
        let classification = entry
            .classification
            .as_deref()
            .and_then(PaymentClassification::parse)
            .unwrap_or(PaymentClassification::Principal);
        NormalizedPaymentDetail {
            // Legacy entries have no native identifier; the synthesized one
            // is deterministic so repeated extraction stays stable.
            id: format!("{}::legacy::{}", payment_id, index),
            method,
            method_label: self.labels.method_label(method),
            classification,
            classification_label: self.labels.classification_label(classification),
            amount: entry.numeric_amount(),
            reference: entry.reference.clone(),
            bank: entry.bank.clone(),
            due_date: entry.due_date.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::payment::{InstrumentDetails, PaymentStatus};

    fn base_payment() -> Payment {
        Payment {
            id: "payment::tx-1::1".to_string(),
            transaction_id: "tx-1".to_string(),
            status: PaymentStatus::Settled,
            amount: 0.0,
            method: None,
            details: Vec::new(),
            legacy_payload: None,
            created_at: "2026-08-07T10:00:00+01:00".to_string(),
        }
    }

    fn structured_payment() -> Payment {
        let mut payment = base_payment();
        payment.details = vec![
            PaymentDetail {
                id: "d1".to_string(),
                method: PaymentMethod::Cash,
                amount: 100.0,
                classification: PaymentClassification::Principal,
                reference: None,
                instrument: None,
            },
            PaymentDetail {
                id: "d2".to_string(),
                method: PaymentMethod::Cheque,
                amount: 250.0,
                classification: PaymentClassification::Guarantee,
                reference: Some("0031245".to_string()),
                instrument: Some(InstrumentDetails::Cheque {
                    number: "0031245".to_string(),
                    bank: "BIAT".to_string(),
                }),
            },
        ];
        payment
    }

    #[test]
    fn test_structured_round_trip() {
        let extraction = PaymentExtraction::new();
        let details = extraction.extract(&structured_payment());
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].id, "d1");
        assert_eq!(details[0].method, PaymentMethod::Cash);
        assert_eq!(details[0].method_label, "Cash");
        assert_eq!(details[0].amount, Some(100.0));
        assert_eq!(details[1].bank.as_deref(), Some("BIAT"));
        assert_eq!(details[1].classification_label, "Guarantee");
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let extraction = PaymentExtraction::new();
        let payment = structured_payment();
        assert_eq!(extraction.extract(&payment), extraction.extract(&payment));

        let mut legacy = base_payment();
        legacy.legacy_payload = Some(
            r#"{"payments": [{"mode": "especes", "montant": 50}, {"montant": "30"}]}"#.to_string(),
        );
        assert_eq!(extraction.extract(&legacy), extraction.extract(&legacy));
    }

    #[test]
    fn test_legacy_fallback_defaults() {
        let extraction = PaymentExtraction::new();
        let mut payment = base_payment();
        payment.legacy_payload = Some(
            r#"{"payments": [{"mode": "Virement", "montant": 300, "numero": "REF-1"}, {"montant": 120.5}]}"#
                .to_string(),
        );

        let details = extraction.extract(&payment);
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].method, PaymentMethod::Transfer);
        assert_eq!(details[0].classification, PaymentClassification::Principal);
        assert_eq!(details[0].id, "payment::tx-1::1::legacy::0");
        assert_eq!(details[1].method, PaymentMethod::Unknown);
        assert_eq!(details[1].amount, Some(120.5));
        assert_eq!(details[1].id, "payment::tx-1::1::legacy::1");
    }

    #[test]
    fn test_structured_details_win_over_legacy_payload() {
        let extraction = PaymentExtraction::new();
        let mut payment = structured_payment();
        payment.legacy_payload =
            Some(r#"{"payments": [{"montant": 999}]}"#.to_string());
        let details = extraction.extract(&payment);
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].id, "d1");
    }

    #[test]
    fn test_undecodable_payload_degrades_to_empty() {
        let extraction = PaymentExtraction::new();
        let mut payment = base_payment();
        payment.legacy_payload = Some("cash 120 + cheque 80".to_string());
        assert!(extraction.extract(&payment).is_empty());
    }

    #[test]
    fn test_no_details_and_no_payload_is_empty_not_an_error() {
        let extraction = PaymentExtraction::new();
        assert!(extraction.extract(&base_payment()).is_empty());

        let mut blank = base_payment();
        blank.legacy_payload = Some("   ".to_string());
        assert!(extraction.extract(&blank).is_empty());
    }

    #[test]
    fn test_legacy_non_numeric_amount_normalizes_to_none() {
        let extraction = PaymentExtraction::new();
        let mut payment = base_payment();
        payment.legacy_payload = Some(
            r#"{"payments": [{"mode": "cheque", "montant": "n/a"}]}"#.to_string(),
        );
        let details = extraction.extract(&payment);
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].amount, None);
    }
}
