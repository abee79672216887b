//! Administrative catalog of CNAM bond nomenclature entries.
//!
//! Transaction flows only read from it (`lookup`); edits go through the
//! create/update/delete operations exposed to administrative users. Edits
//! are never retroactive: dossiers snapshot their bond amount at creation.

use anyhow::Result;
use chrono::Utc;
use log::info;
use std::sync::Arc;

use shared::{
    BondCategory, BondType, CreateNomenclatureRequest, DeleteNomenclatureResponse,
    NomenclatureListResponse, NomenclatureResponse, UpdateNomenclatureRequest,
};

use crate::domain::models::nomenclature::{BondNomenclatureEntry, NomenclatureValidationError};
use crate::mappers::NomenclatureMapper;
use crate::storage::{Connection, NomenclatureStorage};

pub struct NomenclatureService<C: Connection> {
    nomenclature_repository: C::NomenclatureRepository,
}

impl<C: Connection> Clone for NomenclatureService<C>
where
    C::NomenclatureRepository: Clone,
{
    fn clone(&self) -> Self {
        Self {
            nomenclature_repository: self.nomenclature_repository.clone(),
        }
    }
}

impl<C: Connection> NomenclatureService<C> {
    pub fn new(connection: Arc<C>) -> Self {
        let nomenclature_repository = connection.create_nomenclature_repository();
        Self {
            nomenclature_repository,
        }
    }

    pub async fn create_entry(
        &self,
        request: CreateNomenclatureRequest,
    ) -> Result<NomenclatureResponse> {
        if self
            .nomenclature_repository
            .get_entry(request.bond_type, request.category)
            .await?
            .is_some()
        {
            return Err(NomenclatureValidationError::DuplicateEntry {
                bond_type: request.bond_type,
                category: request.category,
            }
            .into());
        }

        let entry = BondNomenclatureEntry::new(
            request.bond_type,
            request.category,
            request.amount,
            request.monthly_rate,
            &Utc::now().to_rfc3339(),
        )?;
        self.nomenclature_repository.store_entry(&entry).await?;
        info!(
            "Created nomenclature entry {} {} at {:.2}",
            entry.bond_type, entry.category, entry.amount
        );

        let success_message = format!(
            "Nomenclature entry for {} {} created",
            entry.bond_type, entry.category
        );
        Ok(NomenclatureResponse {
            entry: NomenclatureMapper::to_dto(entry),
            success_message,
        })
    }

    pub async fn update_entry(
        &self,
        request: UpdateNomenclatureRequest,
    ) -> Result<NomenclatureResponse> {
        let mut entry = self
            .nomenclature_repository
            .get_entry(request.bond_type, request.category)
            .await?
            .ok_or(NomenclatureValidationError::NotFound {
                bond_type: request.bond_type,
                category: request.category,
            })?;

        if let Some(amount) = request.amount {
            if amount < 0.0 {
                return Err(NomenclatureValidationError::NegativeAmount.into());
            }
            entry.amount = amount;
        }
        if let Some(monthly_rate) = request.monthly_rate {
            if monthly_rate < 0.0 {
                return Err(NomenclatureValidationError::NegativeMonthlyRate.into());
            }
            // Purchases carry no monthly rate; the field only moves for rentals.
            if entry.category == BondCategory::Rental {
                entry.monthly_rate = monthly_rate;
            }
        }
        if let Some(is_active) = request.is_active {
            entry.is_active = is_active;
        }
        entry.updated_at = Utc::now().to_rfc3339();

        self.nomenclature_repository.update_entry(&entry).await?;
        let success_message = format!(
            "Nomenclature entry for {} {} updated",
            entry.bond_type, entry.category
        );
        Ok(NomenclatureResponse {
            entry: NomenclatureMapper::to_dto(entry),
            success_message,
        })
    }

    pub async fn list_entries(&self) -> Result<NomenclatureListResponse> {
        let entries = self.nomenclature_repository.list_entries().await?;
        Ok(NomenclatureListResponse {
            entries: entries.into_iter().map(NomenclatureMapper::to_dto).collect(),
        })
    }

    pub async fn delete_entry(
        &self,
        bond_type: BondType,
        category: BondCategory,
    ) -> Result<DeleteNomenclatureResponse> {
        let deleted = self
            .nomenclature_repository
            .delete_entry(bond_type, category)
            .await?;
        let success_message = if deleted {
            format!("Nomenclature entry for {} {} deleted", bond_type, category)
        } else {
            format!("No nomenclature entry for {} {}", bond_type, category)
        };
        Ok(DeleteNomenclatureResponse {
            deleted,
            success_message,
        })
    }

    /// Resolve the active entry a bond must be priced from. A missing or
    /// deactivated entry is an error: a bond cannot be priced without it.
    pub async fn lookup(
        &self,
        bond_type: BondType,
        category: BondCategory,
    ) -> Result<BondNomenclatureEntry> {
        let entry = self
            .nomenclature_repository
            .get_entry(bond_type, category)
            .await?
            .filter(|e| e.is_active)
            .ok_or(NomenclatureValidationError::NotFound {
                bond_type,
                category,
            })?;
        Ok(entry)
    }

    /// Install the standard catalog for entries not already present.
    /// Returns how many were added.
    pub async fn seed_defaults(&self) -> Result<u32> {
        let defaults = [
            (BondType::OxygenConcentrator, BondCategory::Rental, 190.0),
            (BondType::Ventilator, BondCategory::Rental, 420.0),
            (BondType::Cpap, BondCategory::Purchase, 1475.0),
            (BondType::Mask, BondCategory::Purchase, 200.0),
        ];
        let mut seeded = 0;
        for (bond_type, category, amount) in defaults {
            if self
                .nomenclature_repository
                .get_entry(bond_type, category)
                .await?
                .is_none()
            {
                let entry = BondNomenclatureEntry::new(
                    bond_type,
                    category,
                    amount,
                    None,
                    &Utc::now().to_rfc3339(),
                )?;
                self.nomenclature_repository.store_entry(&entry).await?;
                seeded += 1;
            }
        }
        if seeded > 0 {
            info!("Seeded {} default nomenclature entries", seeded);
        }
        Ok(seeded)
    }
}
