use crate::domain::models::nomenclature::BondNomenclatureEntry;
use shared::BondNomenclatureEntry as BondNomenclatureEntryDto;

pub struct NomenclatureMapper;

impl NomenclatureMapper {
    pub fn to_dto(domain: BondNomenclatureEntry) -> BondNomenclatureEntryDto {
        BondNomenclatureEntryDto {
            bond_type: domain.bond_type,
            category: domain.category,
            amount: domain.amount,
            monthly_rate: domain.monthly_rate,
            is_active: domain.is_active,
            created_at: domain.created_at,
            updated_at: domain.updated_at,
        }
    }

    pub fn to_domain(dto: BondNomenclatureEntryDto) -> BondNomenclatureEntry {
        BondNomenclatureEntry {
            bond_type: dto.bond_type,
            category: dto.category,
            amount: dto.amount,
            monthly_rate: dto.monthly_rate,
            is_active: dto.is_active,
            created_at: dto.created_at,
            updated_at: dto.updated_at,
        }
    }
}
