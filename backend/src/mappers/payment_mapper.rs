use crate::domain::method_totals::MethodGroupView;
use crate::domain::models::payment::NormalizedPaymentDetail;
use shared::{MethodGroup as MethodGroupDto, PaymentDetail as PaymentDetailDto};

pub struct PaymentMapper;

impl PaymentMapper {
    pub fn detail_to_dto(domain: NormalizedPaymentDetail) -> PaymentDetailDto {
        PaymentDetailDto {
            id: domain.id,
            method: domain.method,
            method_label: domain.method_label,
            amount: domain.amount,
            classification: domain.classification,
            classification_label: domain.classification_label,
            reference: domain.reference,
            bank: domain.bank,
            due_date: domain.due_date,
        }
    }

    pub fn details_to_dto(domain: Vec<NormalizedPaymentDetail>) -> Vec<PaymentDetailDto> {
        domain.into_iter().map(Self::detail_to_dto).collect()
    }

    pub fn group_to_dto(domain: MethodGroupView) -> MethodGroupDto {
        MethodGroupDto {
            method: domain.method,
            display_label: domain.display_label,
            total_amount: domain.total_amount,
            details: Self::details_to_dto(domain.details),
        }
    }

    pub fn groups_to_dto(domain: Vec<MethodGroupView>) -> Vec<MethodGroupDto> {
        domain.into_iter().map(Self::group_to_dto).collect()
    }
}
