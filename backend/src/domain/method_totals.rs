//! Per-method aggregation of normalized payment details.

use shared::{DisplayLabels, PaymentMethod};

use crate::domain::models::payment::NormalizedPaymentDetail;

/// One method's share of a settlement view
#[derive(Debug, Clone, PartialEq)]
pub struct MethodGroupView {
    pub method: PaymentMethod,
    pub display_label: String,
    pub total_amount: f64,
    pub details: Vec<NormalizedPaymentDetail>,
}

/// Group details by method, with a per-group subtotal and display label.
///
/// Pure function: groups appear in insertion order of first occurrence, and
/// entries with a missing or non-numeric amount are skipped so one malformed
/// record never corrupts the rest of the settlement view.
pub fn group_by_method(
    details: &[NormalizedPaymentDetail],
    labels: &DisplayLabels,
) -> Vec<MethodGroupView> {
    let mut groups: Vec<MethodGroupView> = Vec::new();
    for detail in details {
        let amount = match detail.amount {
            Some(amount) if amount.is_finite() => amount,
            _ => continue,
        };
        match groups.iter_mut().find(|g| g.method == detail.method) {
            Some(group) => {
                group.total_amount += amount;
                group.details.push(detail.clone());
            }
            None => groups.push(MethodGroupView {
                method: detail.method,
                display_label: labels.method_label(detail.method),
                total_amount: amount,
                details: vec![detail.clone()],
            }),
        }
    }
    groups
}
