//! Building Service - inventory of dormitory buildings

use sea_orm::*;
use serde::{Deserialize, Serialize};

use super::{in_transaction, now_rfc3339};
use crate::domain::{
    ActivityEntry, ActivitySink, ConflictKind, ContractStatus, DomainError, flush_activity,
};
use crate::models::building::{self, Entity as Building};
use crate::models::contract::{self, Entity as Contract};
use crate::models::room::{self, Entity as Room};

#[derive(Debug, Clone, Deserialize)]
pub struct BuildingInput {
    pub name: String,
    pub address: Option<String>,
    pub description: Option<String>,
}

impl BuildingInput {
    fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("building name is required"));
        }
        Ok(())
    }
}

/// Building with aggregated room figures
#[derive(Debug, Clone, Serialize)]
pub struct BuildingSummary {
    #[serde(flatten)]
    pub building: building::Model,
    pub room_count: usize,
    pub total_capacity: i32,
    pub current_occupancy: i32,
}

pub async fn create_building(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    actor: Option<i32>,
    input: BuildingInput,
) -> Result<building::Model, DomainError> {
    input.validate()?;
    let now = now_rfc3339();

    let saved = building::ActiveModel {
        name: Set(input.name.trim().to_owned()),
        address: Set(input.address),
        description: Set(input.description),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            DomainError::validation("a building with this name already exists")
        }
        _ => DomainError::from(e),
    })?;

    flush_activity(
        activity,
        vec![ActivityEntry::new(
            actor,
            "CREATE_BUILDING",
            "building",
            saved.id,
            format!("Building {} created", saved.name),
        )],
    )
    .await;
    Ok(saved)
}

pub async fn update_building(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    actor: Option<i32>,
    id: i32,
    input: BuildingInput,
) -> Result<building::Model, DomainError> {
    input.validate()?;

    let existing = Building::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound("building"))?;

    let mut active: building::ActiveModel = existing.into();
    active.name = Set(input.name.trim().to_owned());
    active.address = Set(input.address);
    active.description = Set(input.description);
    active.updated_at = Set(now_rfc3339());
    let updated = active.update(db).await?;

    flush_activity(
        activity,
        vec![ActivityEntry::new(
            actor,
            "UPDATE_BUILDING",
            "building",
            updated.id,
            format!("Building {} updated", updated.name),
        )],
    )
    .await;
    Ok(updated)
}

/// Delete a building and its rooms, refused while anyone still lives there.
pub async fn delete_building(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
    actor: Option<i32>,
    id: i32,
) -> Result<(), DomainError> {
    let name = in_transaction(db, move |txn| {
        Box::pin(async move {
            let building = Building::find_by_id(id)
                .one(txn)
                .await?
                .ok_or(DomainError::NotFound("building"))?;

            let room_ids: Vec<i32> = Room::find()
                .select_only()
                .column(room::Column::Id)
                .filter(room::Column::BuildingId.eq(id))
                .into_tuple()
                .all(txn)
                .await?;

            if !room_ids.is_empty() {
                let occupied = Contract::find()
                    .filter(contract::Column::RoomId.is_in(room_ids))
                    .filter(contract::Column::Status.eq(ContractStatus::Active))
                    .count(txn)
                    .await?;
                if occupied > 0 {
                    return Err(DomainError::Conflict(ConflictKind::HasActiveContracts));
                }
            }

            Building::delete_by_id(id).exec(txn).await?;
            Ok(building.name)
        })
    })
    .await?;

    flush_activity(
        activity,
        vec![ActivityEntry::new(
            actor,
            "DELETE_BUILDING",
            "building",
            id,
            format!("Building {} deleted", name),
        )],
    )
    .await;
    Ok(())
}

pub async fn get_building(db: &DatabaseConnection, id: i32) -> Result<BuildingSummary, DomainError> {
    let building = Building::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound("building"))?;
    let rooms = Room::find()
        .filter(room::Column::BuildingId.eq(id))
        .all(db)
        .await?;

    Ok(summarize(building, &rooms))
}

pub async fn list_buildings(db: &DatabaseConnection) -> Result<Vec<BuildingSummary>, DomainError> {
    let buildings = Building::find()
        .order_by_asc(building::Column::Name)
        .find_with_related(Room)
        .all(db)
        .await?;

    Ok(buildings
        .into_iter()
        .map(|(building, rooms)| summarize(building, &rooms))
        .collect())
}

fn summarize(building: building::Model, rooms: &[room::Model]) -> BuildingSummary {
    BuildingSummary {
        building,
        room_count: rooms.len(),
        total_capacity: rooms.iter().map(|r| r.capacity).sum(),
        current_occupancy: rooms.iter().map(|r| r.current_occupancy).sum(),
    }
}
